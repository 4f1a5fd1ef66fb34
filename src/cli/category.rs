//! Category CLI commands

use clap::Subcommand;

use crate::error::{InoutError, InoutResult};
use crate::models::{Category, CategoryKind};
use crate::query::{ListQuery, SortOrder};

use super::Context;

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        /// Only income or expense categories
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },

    /// Create a new category
    Add {
        /// Category name
        name: String,
        /// income or expense
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,
        /// Display color as #RRGGBB
        #[arg(long, default_value = "#607D8B")]
        color: String,
        /// Icon name
        #[arg(long, default_value = "tag")]
        icon: String,
    },

    /// Delete a category
    Delete {
        /// Category name or ID
        category: String,
    },
}

fn parse_kind(kind: &str) -> InoutResult<CategoryKind> {
    CategoryKind::parse(kind).ok_or_else(|| {
        InoutError::Validation(format!(
            "Invalid category type: '{}'. Use income or expense",
            kind
        ))
    })
}

/// Handle a category command
pub async fn handle_category_command(ctx: &Context, cmd: CategoryCommands) -> InoutResult<()> {
    let ledger = ctx.ledger();

    match cmd {
        CategoryCommands::List { kind } => {
            let mut query = ListQuery::default().sorted_by("name", SortOrder::Asc);
            if let Some(kind) = kind {
                query = query.with_type(parse_kind(&kind)?.to_string());
            }
            let categories: Vec<Category> = ledger.list(query).await?;

            if categories.is_empty() {
                println!("No categories found.");
                return Ok(());
            }
            for kind in [CategoryKind::Income, CategoryKind::Expense] {
                let group: Vec<&Category> = categories.iter().filter(|c| c.kind == kind).collect();
                if group.is_empty() {
                    continue;
                }
                println!("{}", if kind == CategoryKind::Income { "Income" } else { "Expenses" });
                for category in group {
                    println!("  {:<28} {}", category.name, category.id);
                }
            }
        }

        CategoryCommands::Add {
            name,
            kind,
            color,
            icon,
        } => {
            let category = Category::new(name.trim(), parse_kind(&kind)?, color, icon);
            let created = ledger.create(&category).await?;
            println!("Created {} category: {}", created.kind, created.name);
            println!("  ID: {}", created.id);
        }

        CategoryCommands::Delete { category } => {
            let found = ledger
                .find_category(&category, None)
                .await?
                .ok_or_else(|| InoutError::not_found("categories", &category))?;
            ledger.delete::<Category>(found.id.as_str()).await?;
            println!("Deleted category: {}", found.name);
        }
    }

    Ok(())
}
