//! Ledger service
//!
//! Typed access to the query layer: records go in and come out as model
//! structs instead of JSON, and query misses become ordinary errors.

use serde_json::Value;

use crate::error::{InoutError, InoutResult};
use crate::models::{Account, AccountType, Category, CategoryKind, Record, Transaction};
use crate::query::{ListQuery, LocalQuery, QueryError, QueryResponse, Request, SortOrder};

fn decode<R: Record>(value: Value) -> InoutResult<R> {
    Ok(serde_json::from_value(value)?)
}

fn into_records<R: Record>(response: QueryResponse) -> InoutResult<Vec<R>> {
    match response {
        QueryResponse::Records(values) => values.into_iter().map(decode).collect(),
        other => Err(InoutError::Storage(format!(
            "expected a record list, got {:?}",
            other
        ))),
    }
}

fn into_record<R: Record>(response: QueryResponse) -> InoutResult<R> {
    match response {
        QueryResponse::Record(value) => decode(value),
        other => Err(InoutError::Storage(format!(
            "expected a single record, got {:?}",
            other
        ))),
    }
}

/// Service for typed record access
#[derive(Clone)]
pub struct Ledger {
    query: LocalQuery,
}

impl Ledger {
    pub fn new(query: LocalQuery) -> Self {
        Self { query }
    }

    pub fn query(&self) -> &LocalQuery {
        &self.query
    }

    /// List records matching `query`
    pub async fn list<R: Record>(&self, query: ListQuery) -> InoutResult<Vec<R>> {
        let response = self.query.execute(Request::list(R::COLLECTION, query)).await?;
        into_records(response)
    }

    /// Get a record by id, `None` if it doesn't exist
    pub async fn get<R: Record>(&self, id: &str) -> InoutResult<Option<R>> {
        match self.query.execute(Request::get(R::COLLECTION, id)).await {
            Ok(response) => into_record(response).map(Some),
            Err(QueryError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a new record; id and timestamps are assigned on the way in
    pub async fn create<R: Record>(&self, record: &R) -> InoutResult<R> {
        let body = serde_json::to_value(record)?;
        let response = self.query.execute(Request::create(R::COLLECTION, body)).await?;
        into_record(response)
    }

    /// Merge `patch` over an existing record
    pub async fn update<R: Record>(&self, id: &str, patch: Value) -> InoutResult<R> {
        let response = self
            .query
            .execute(Request::update(R::COLLECTION, id, patch))
            .await?;
        into_record(response)
    }

    pub async fn delete<R: Record>(&self, id: &str) -> InoutResult<()> {
        self.query.execute(Request::delete(R::COLLECTION, id)).await?;
        Ok(())
    }

    /// Create an account
    pub async fn add_account(
        &self,
        name: &str,
        account_type: AccountType,
        opening_balance: f64,
        currency_code: &str,
    ) -> InoutResult<Account> {
        let mut account = Account::new(name.trim(), account_type, currency_code);
        account.opening_balance = opening_balance;
        self.create(&account).await
    }

    /// Find an account by id or case-insensitive name
    pub async fn find_account(&self, key: &str) -> InoutResult<Option<Account>> {
        let accounts: Vec<Account> = self.list(ListQuery::default()).await?;
        Ok(accounts
            .into_iter()
            .find(|a| a.id.as_str() == key || a.name.eq_ignore_ascii_case(key)))
    }

    /// Find a category by id or case-insensitive name
    pub async fn find_category(
        &self,
        key: &str,
        kind: Option<CategoryKind>,
    ) -> InoutResult<Option<Category>> {
        let categories: Vec<Category> = self.list(ListQuery::default()).await?;
        Ok(categories.into_iter().find(|c| {
            (c.id.as_str() == key || c.name.eq_ignore_ascii_case(key))
                && kind.map_or(true, |k| c.kind == k)
        }))
    }

    /// Most recent transactions by date
    pub async fn recent_transactions(&self, limit: usize) -> InoutResult<Vec<Transaction>> {
        self.list(
            ListQuery::default()
                .sorted_by("date", SortOrder::Desc)
                .paged(1, limit),
        )
        .await
    }
}
