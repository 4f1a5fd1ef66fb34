//! Category model
//!
//! Categories classify income and expense transactions. Transfers never
//! carry a category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::document::Document;
use super::ids::CategoryId;
use super::record::{timestamp_now, Collection, Record};

/// Whether a category collects income or spending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "income"),
            Self::Expense => write!(f, "expense"),
        }
    }
}

/// A spending or income category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,

    pub name: String,

    #[serde(rename = "type")]
    pub kind: CategoryKind,

    /// Parent category; stored but not enforced as a hierarchy
    #[serde(default)]
    pub parent_id: Option<CategoryId>,

    /// Display color as `#RRGGBB`
    #[serde(default)]
    pub color: String,

    /// Icon name understood by the UI
    #[serde(default)]
    pub icon: String,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default = "timestamp_now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "timestamp_now")]
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Create a new top-level category
    pub fn new(
        name: impl Into<String>,
        kind: CategoryKind,
        color: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            name: name.into(),
            kind,
            parent_id: None,
            color: color.into(),
            icon: icon.into(),
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for Category {
    const COLLECTION: Collection = Collection::Categories;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Category name cannot be empty".into());
        }
        if self.name.len() > 30 {
            return Err(format!("Category name too long ({} chars, max 30)", self.name.len()));
        }
        if self.parent_id.as_ref() == Some(&self.id) {
            return Err("Category cannot be its own parent".into());
        }
        Ok(())
    }

    fn items(doc: &Document) -> &Vec<Self> {
        &doc.categories
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.categories
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Starter expense categories: name, color, icon
pub const DEFAULT_EXPENSE_CATEGORIES: [(&str, &str, &str); 10] = [
    ("Food & Dining", "#F97316", "restaurant-outline"),
    ("Groceries", "#10B981", "bag-outline"),
    ("Transportation", "#3B82F6", "car-outline"),
    ("Utilities", "#8B5CF6", "flash-outline"),
    ("Entertainment", "#EC4899", "game-controller-outline"),
    ("Healthcare", "#EF4444", "medical-outline"),
    ("Shopping", "#F59E0B", "bag-handle-outline"),
    ("Education", "#06B6D4", "school-outline"),
    ("Personal Care", "#84CC16", "person-outline"),
    ("Other", "#6B7280", "ellipsis-horizontal-outline"),
];

/// Starter income categories: name, color, icon
pub const DEFAULT_INCOME_CATEGORIES: [(&str, &str, &str); 6] = [
    ("Salary", "#10B981", "card-outline"),
    ("Business", "#3B82F6", "business-outline"),
    ("Investment", "#8B5CF6", "trending-up-outline"),
    ("Freelance", "#F59E0B", "laptop-outline"),
    ("Gift", "#EC4899", "gift-outline"),
    ("Other Income", "#6B7280", "add-circle-outline"),
];

/// Build the starter category set, expenses first
pub fn default_categories() -> Vec<Category> {
    let expense = DEFAULT_EXPENSE_CATEGORIES
        .iter()
        .map(|(name, color, icon)| Category::new(*name, CategoryKind::Expense, *color, *icon));
    let income = DEFAULT_INCOME_CATEGORIES
        .iter()
        .map(|(name, color, icon)| Category::new(*name, CategoryKind::Income, *color, *icon));
    expense.chain(income).collect()
}
