//! Collection naming and the common record contract
//!
//! Every entity stored in the document belongs to exactly one named
//! collection. `Record` ties a Rust type to its collection so the query
//! layer can work over any of them generically.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use super::document::Document;

/// Named collections inside the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Accounts,
    Categories,
    Transactions,
    Budgets,
    Attachments,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Accounts,
        Collection::Categories,
        Collection::Transactions,
        Collection::Budgets,
        Collection::Attachments,
    ];

    /// The key used for this collection in the persisted document
    pub fn name(&self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Categories => "categories",
            Self::Transactions => "transactions",
            Self::Budgets => "budgets",
            Self::Attachments => "attachments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_matches('/');
        Collection::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown collection '{}'", s))
    }
}

/// A typed entity living in one document collection
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The collection this record type is stored in
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Bring the record into canonical shape before it is stored
    fn normalize(&mut self) {}

    /// Check the record's own invariants
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn items(doc: &Document) -> &Vec<Self>;

    fn items_mut(doc: &mut Document) -> &mut Vec<Self>;
}

/// Default for timestamps missing from older records
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_parse() {
        assert_eq!("transactions".parse::<Collection>(), Ok(Collection::Transactions));
        assert_eq!("/budgets".parse::<Collection>(), Ok(Collection::Budgets));
        assert!("payees".parse::<Collection>().is_err());
    }

    #[test]
    fn test_collection_names_round_trip() {
        for c in Collection::ALL {
            assert_eq!(c.name().parse::<Collection>(), Ok(c));
        }
    }
}
