//! Query requests
//!
//! A request names a collection, a verb, an optional record id, list
//! parameters and an optional JSON body. Callers build requests directly;
//! `ListQuery::from_query_string` exists for the REST-style parameter form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::QueryError;
use crate::models::{parse_timestamp, Collection};

/// Default sort key for list requests
pub const DEFAULT_SORT_KEY: &str = "createdAt";

/// Default page size for list requests
pub const DEFAULT_LIMIT: usize = 1000;

/// Operation to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl FromStr for Verb {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(QueryError::MethodNotAllowed(other.to_string())),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(QueryError::BadRequest(format!("invalid _order '{}'", other))),
        }
    }
}

/// Filters, ordering and paging for a list request
///
/// Filters apply first, then sorting, then paging.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Match the record's `type` field exactly
    pub record_type: Option<String>,
    /// Match the record's `categoryId` exactly
    pub category_id: Option<String>,
    /// Match a `YYYY-MM` month
    pub month: Option<String>,
    /// Inclusive lower bound on `date`
    pub date_gte: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `date`
    pub date_lte: Option<DateTime<Utc>>,
    pub sort: String,
    pub order: SortOrder,
    /// 1-based page number
    pub page: usize,
    pub limit: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            record_type: None,
            category_id: None,
            month: None,
            date_gte: None,
            date_lte: None,
            sort: DEFAULT_SORT_KEY.to_string(),
            order: SortOrder::Desc,
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn parse_date_param(name: &str, value: &str) -> Result<DateTime<Utc>, QueryError> {
    parse_timestamp(value)
        .ok_or_else(|| QueryError::BadRequest(format!("invalid {} '{}'", name, value)))
}

fn parse_count_param(name: &str, value: &str) -> Result<usize, QueryError> {
    value
        .trim()
        .parse()
        .map_err(|_| QueryError::BadRequest(format!("invalid {} '{}'", name, value)))
}

impl ListQuery {
    /// Parse `type=expense&_sort=date&_order=asc&_page=2&_limit=20`
    ///
    /// Unknown parameters are ignored. Values are percent-decoded.
    pub fn from_query_string(query: &str) -> Result<Self, QueryError> {
        let query = query.trim_start_matches('?');
        let mut url = reqwest::Url::parse("local:/")
            .map_err(|e| QueryError::BadRequest(e.to_string()))?;
        url.set_query(Some(query));

        let mut out = Self::default();
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "type" => out.record_type = Some(value.into_owned()),
                "categoryId" => out.category_id = Some(value.into_owned()),
                "month" => out.month = Some(value.into_owned()),
                "date_gte" => out.date_gte = Some(parse_date_param("date_gte", &value)?),
                "date_lte" => out.date_lte = Some(parse_date_param("date_lte", &value)?),
                "_sort" => out.sort = value.into_owned(),
                "_order" => out.order = value.parse()?,
                "_page" => out.page = parse_count_param("_page", &value)?,
                "_limit" => out.limit = parse_count_param("_limit", &value)?,
                _ => {}
            }
        }
        Ok(out)
    }

    pub fn with_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.date_gte = from;
        self.date_lte = to;
        self
    }

    pub fn sorted_by(mut self, key: impl Into<String>, order: SortOrder) -> Self {
        self.sort = key.into();
        self.order = order;
        self
    }

    pub fn paged(mut self, page: usize, limit: usize) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }
}

/// One call into the query layer
#[derive(Debug, Clone)]
pub struct Request {
    pub collection: Collection,
    pub verb: Verb,
    pub id: Option<String>,
    pub query: ListQuery,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(collection: Collection, verb: Verb) -> Self {
        Self {
            collection,
            verb,
            id: None,
            query: ListQuery::default(),
            body: None,
        }
    }

    pub fn list(collection: Collection, query: ListQuery) -> Self {
        Self {
            query,
            ..Self::new(collection, Verb::Get)
        }
    }

    pub fn get(collection: Collection, id: impl Into<String>) -> Self {
        Self::new(collection, Verb::Get).with_id(id)
    }

    pub fn create(collection: Collection, body: Value) -> Self {
        Self::new(collection, Verb::Post).with_body(body)
    }

    pub fn update(collection: Collection, id: impl Into<String>, body: Value) -> Self {
        Self::new(collection, Verb::Patch).with_id(id).with_body(body)
    }

    pub fn delete(collection: Collection, id: impl Into<String>) -> Self {
        Self::new(collection, Verb::Delete).with_id(id)
    }

    /// Build a request from its textual parts
    pub fn parse(
        collection: &str,
        verb: &str,
        id: Option<&str>,
        query: Option<&str>,
        body: Option<Value>,
    ) -> Result<Self, QueryError> {
        let collection: Collection = collection
            .parse()
            .map_err(|_| QueryError::UnknownCollection(collection.to_string()))?;
        let verb: Verb = verb.parse()?;
        let query = match query {
            Some(q) => ListQuery::from_query_string(q)?,
            None => ListQuery::default(),
        };
        Ok(Self {
            collection,
            verb,
            id: id.map(str::to_string),
            query,
            body,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}
