//! Request execution against the document store

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use super::filter;
use super::request::{ListQuery, Request, Verb};
use super::QueryError;
use crate::config::Settings;
use crate::error::InoutError;
use crate::models::{
    upgrade_budget_value, Account, Attachment, Budget, BudgetUpgrade, Category, Collection,
    Record, Transaction,
};
use crate::storage::DocumentStore;

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    /// A page of records
    Records(Vec<Value>),
    /// One record, as read, created or updated
    Record(Value),
    /// Id of the removed record
    Deleted { id: String },
}

impl QueryResponse {
    pub fn into_value(self) -> Value {
        match self {
            Self::Records(records) => Value::Array(records),
            Self::Record(record) => record,
            Self::Deleted { id } => serde_json::json!({ "id": id }),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, QueryError> {
    serde_json::to_value(value).map_err(|e| QueryError::from(InoutError::from(e)))
}

fn now_stamp() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn body_object(body: Option<Value>) -> Result<Map<String, Value>, QueryError> {
    match body {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(QueryError::BadRequest("body must be a JSON object".into())),
        None => Err(QueryError::BadRequest("request body is required".into())),
    }
}

/// Decode, normalize and check a record built from JSON
fn build_record<R: Record>(mut value: Value, period_start_day: u8) -> Result<R, QueryError> {
    if R::COLLECTION == Collection::Budgets
        && upgrade_budget_value(&mut value, period_start_day) == BudgetUpgrade::Unusable
    {
        return Err(QueryError::BadRequest(
            "budget needs a periodId or a month".into(),
        ));
    }
    let mut record: R =
        serde_json::from_value(value).map_err(|e| QueryError::BadRequest(e.to_string()))?;
    record.normalize();
    record.validate().map_err(QueryError::BadRequest)?;
    Ok(record)
}

/// Executes requests against one document store
#[derive(Clone)]
pub struct LocalQuery {
    store: Arc<DocumentStore>,
    timeout: Duration,
}

impl LocalQuery {
    pub fn new(store: Arc<DocumentStore>, settings: &Settings) -> Self {
        Self::with_timeout(store, settings.request_timeout())
    }

    pub fn with_timeout(store: Arc<DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Run a request under the request deadline
    pub async fn execute(&self, request: Request) -> Result<QueryResponse, QueryError> {
        let collection = request.collection;
        let verb = request.verb;

        match timeout(self.timeout, self.dispatch(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                debug!(%collection, %verb, status = %e.status(), error = %e, "request failed");
                Err(e)
            }
            Err(_) => {
                warn!(%collection, %verb, timeout_ms = self.timeout.as_millis() as u64, "request timed out");
                Err(QueryError::Timeout)
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Result<QueryResponse, QueryError> {
        match request.collection {
            Collection::Accounts => self.handle::<Account>(request).await,
            Collection::Categories => self.handle::<Category>(request).await,
            Collection::Transactions => self.handle::<Transaction>(request).await,
            Collection::Budgets => self.handle::<Budget>(request).await,
            Collection::Attachments => self.handle::<Attachment>(request).await,
        }
    }

    async fn handle<R: Record>(&self, request: Request) -> Result<QueryResponse, QueryError> {
        let Request {
            verb,
            id,
            query,
            body,
            ..
        } = request;

        match verb {
            Verb::Get => match id {
                Some(id) => self.get::<R>(&id).await,
                None => self.list::<R>(&query).await,
            },
            Verb::Post => {
                if id.is_some() {
                    return Err(QueryError::MethodNotAllowed(format!(
                        "POST on a single {} record",
                        R::COLLECTION
                    )));
                }
                self.create::<R>(body).await
            }
            Verb::Put | Verb::Patch => {
                let id = id
                    .or_else(|| {
                        body.as_ref()
                            .and_then(|b| b.get("id"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                    })
                    .ok_or_else(|| QueryError::BadRequest("update requires an id".into()))?;
                self.update::<R>(id, body).await
            }
            Verb::Delete => {
                let id = id.ok_or_else(|| QueryError::BadRequest("delete requires an id".into()))?;
                self.delete::<R>(id).await
            }
        }
    }

    async fn list<R: Record>(&self, query: &ListQuery) -> Result<QueryResponse, QueryError> {
        let doc = self.store.load().await;
        let records = R::items(&doc)
            .iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResponse::Records(filter::apply(records, query)))
    }

    async fn get<R: Record>(&self, id: &str) -> Result<QueryResponse, QueryError> {
        let doc = self.store.load().await;
        let record = R::items(&doc)
            .iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| QueryError::NotFound {
                collection: R::COLLECTION.name(),
                id: id.to_string(),
            })?;
        Ok(QueryResponse::Record(to_json(record)?))
    }

    async fn create<R: Record>(&self, body: Option<Value>) -> Result<QueryResponse, QueryError> {
        let mut obj = body_object(body)?;
        let now = now_stamp();
        obj.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        obj.insert("createdAt".into(), now.clone());
        obj.insert("updatedAt".into(), now);

        let record: R = build_record(Value::Object(obj), self.store.period_start_day())?;
        let created = to_json(&record)?;

        self.store
            .mutate(move |doc| {
                R::items_mut(doc).push(record);
                Ok(())
            })
            .await?;

        debug!(collection = %R::COLLECTION, "record created");
        Ok(QueryResponse::Record(created))
    }

    async fn update<R: Record>(
        &self,
        id: String,
        body: Option<Value>,
    ) -> Result<QueryResponse, QueryError> {
        let patch = body_object(body)?;
        let start_day = self.store.period_start_day();

        let updated = self
            .store
            .mutate(|doc| {
                let items = R::items_mut(doc);
                let index = items
                    .iter()
                    .position(|r| r.id() == id)
                    .ok_or_else(|| InoutError::not_found(R::COLLECTION.name(), id.as_str()))?;

                let mut merged = serde_json::to_value(&items[index])?;
                if let Value::Object(target) = &mut merged {
                    // A budget patched by month moves to that month's cycle
                    if R::COLLECTION == Collection::Budgets
                        && patch.contains_key("month")
                        && !patch.contains_key("periodId")
                    {
                        target.remove("periodId");
                    }
                    for (key, value) in patch {
                        if key == "id" || key == "createdAt" {
                            continue;
                        }
                        target.insert(key, value);
                    }
                    target.insert("updatedAt".into(), now_stamp());
                }

                let record: R = build_record(merged, start_day)?;
                items[index] = record.clone();
                Ok(record)
            })
            .await?;

        Ok(QueryResponse::Record(to_json(&updated)?))
    }

    async fn delete<R: Record>(&self, id: String) -> Result<QueryResponse, QueryError> {
        self.store
            .mutate(|doc| {
                let items = R::items_mut(doc);
                let index = items
                    .iter()
                    .position(|r| r.id() == id)
                    .ok_or_else(|| InoutError::not_found(R::COLLECTION.name(), id.as_str()))?;
                items.remove(index);
                Ok(())
            })
            .await?;

        debug!(collection = %R::COLLECTION, %id, "record deleted");
        Ok(QueryResponse::Deleted { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryStatus, SortOrder};
    use crate::storage::kv::test_support::SlowKeyValueStore;
    use crate::storage::{KeyValueStore, MemoryKeyValueStore};
    use serde_json::json;

    fn query_over(kv: Arc<dyn KeyValueStore>) -> LocalQuery {
        let settings = Settings::default();
        let store = Arc::new(DocumentStore::new(kv, &settings));
        LocalQuery::new(store, &settings)
    }

    fn fresh() -> LocalQuery {
        query_over(Arc::new(MemoryKeyValueStore::new()))
    }

    fn expense_body(amount: f64) -> Value {
        json!({
            "type": "expense",
            "amount": amount,
            "accountId": "acc1",
            "categoryId": "cat1",
            "date": "2024-06-01T00:00:00Z"
        })
    }

    async fn create(query: &LocalQuery, collection: Collection, body: Value) -> Value {
        query
            .execute(Request::create(collection, body))
            .await
            .unwrap()
            .into_value()
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let query = fresh();
        let created = create(&query, Collection::Transactions, expense_body(42.50)).await;
        assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));

        let listed = query
            .execute(Request::list(
                Collection::Transactions,
                ListQuery::default().with_type("expense"),
            ))
            .await
            .unwrap();
        let QueryResponse::Records(records) = listed else {
            panic!("expected records");
        };
        assert!(records
            .iter()
            .any(|r| r["amount"] == 42.5 && r["id"] == created["id"]));
    }

    #[tokio::test]
    async fn test_transfer_has_no_category() {
        let query = fresh();
        let created = create(
            &query,
            Collection::Transactions,
            json!({"type": "transfer", "accountId": "acc1", "accountIdTo": "acc2", "amount": 100, "categoryId": "cat1"}),
        )
        .await;
        assert!(created["categoryId"].is_null());

        let id = created["id"].as_str().unwrap();
        let stored = query
            .execute(Request::get(Collection::Transactions, id))
            .await
            .unwrap()
            .into_value();
        assert!(stored["categoryId"].is_null());
        assert_eq!(stored["accountIdTo"], "acc2");
    }

    #[tokio::test]
    async fn test_invalid_body_rejected() {
        let query = fresh();
        let err = query
            .execute(Request::create(Collection::Transactions, expense_body(-5.0)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), QueryStatus::Http(400));

        let err = query
            .execute(Request::create(Collection::Transactions, json!([1, 2])))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let query = fresh();
        let err = query
            .execute(Request::get(Collection::Accounts, "nope"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.status(), QueryStatus::Http(404));
    }

    #[tokio::test]
    async fn test_update_is_non_destructive() {
        let query = fresh();
        let created = create(&query, Collection::Transactions, expense_body(10.0)).await;
        let id = created["id"].as_str().unwrap().to_string();

        tokio::time::sleep(Duration::from_millis(5)).await;

        let updated = query
            .execute(Request::update(
                Collection::Transactions,
                &id,
                json!({"note": "lunch", "id": "hijack", "createdAt": "1999-01-01T00:00:00Z"}),
            ))
            .await
            .unwrap()
            .into_value();

        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["createdAt"], created["createdAt"]);
        assert_eq!(updated["amount"], created["amount"]);
        assert_eq!(updated["accountId"], created["accountId"]);
        assert_eq!(updated["note"], "lunch");

        let before = crate::models::parse_timestamp(created["updatedAt"].as_str().unwrap());
        let after = crate::models::parse_timestamp(updated["updatedAt"].as_str().unwrap());
        assert!(after > before);
    }

    #[tokio::test]
    async fn test_update_rechecks_invariants() {
        let query = fresh();
        let created = create(&query, Collection::Transactions, expense_body(10.0)).await;
        let id = created["id"].as_str().unwrap();

        let err = query
            .execute(Request::update(Collection::Transactions, id, json!({"amount": 0})))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::BadRequest(_)));

        let stored = query
            .execute(Request::get(Collection::Transactions, id))
            .await
            .unwrap()
            .into_value();
        assert_eq!(stored["amount"], 10.0);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let query = fresh();
        let err = query
            .execute(Request::update(Collection::Budgets, "ghost", json!({"amount": 1})))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_takes_id_from_body() {
        let query = fresh();
        let created = create(&query, Collection::Transactions, expense_body(10.0)).await;

        let mut request = Request::new(Collection::Transactions, Verb::Put);
        request.body = Some(json!({"id": created["id"], "amount": 11.0}));
        let updated = query.execute(request).await.unwrap().into_value();
        assert_eq!(updated["amount"], 11.0);
    }

    #[tokio::test]
    async fn test_delete_is_final() {
        let query = fresh();
        let keep = create(&query, Collection::Transactions, expense_body(1.0)).await;
        let gone = create(&query, Collection::Transactions, expense_body(2.0)).await;
        let gone_id = gone["id"].as_str().unwrap();

        let response = query
            .execute(Request::delete(Collection::Transactions, gone_id))
            .await
            .unwrap();
        assert_eq!(
            response,
            QueryResponse::Deleted {
                id: gone_id.to_string()
            }
        );

        let err = query
            .execute(Request::get(Collection::Transactions, gone_id))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let kept = query
            .execute(Request::get(Collection::Transactions, keep["id"].as_str().unwrap()))
            .await
            .unwrap()
            .into_value();
        assert_eq!(kept, keep);

        let again = query
            .execute(Request::delete(Collection::Transactions, gone_id))
            .await
            .unwrap_err();
        assert!(again.is_not_found());
    }

    #[tokio::test]
    async fn test_unsupported_verb() {
        let err = Request::parse("accounts", "HEAD", None, None, None).unwrap_err();
        assert_eq!(err.status(), QueryStatus::Http(405));

        let query = fresh();
        let err = query
            .execute(Request::create(Collection::Accounts, json!({})).with_id("a1"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::MethodNotAllowed(_)));
    }

    #[tokio::test]
    async fn test_list_sorted_by_amount() {
        let query = fresh();
        for amount in [5.0, 50.0, 0.5] {
            create(&query, Collection::Transactions, expense_body(amount)).await;
        }
        let records = query
            .execute(Request::list(
                Collection::Transactions,
                ListQuery::default().sorted_by("amount", SortOrder::Asc).paged(1, 2),
            ))
            .await
            .unwrap()
            .into_value();
        assert_eq!(records.as_array().map(Vec::len), Some(2));
        assert_eq!(records[0]["amount"], 0.5);
        assert_eq!(records[1]["amount"], 5.0);
    }

    #[tokio::test]
    async fn test_budget_created_from_legacy_body() {
        let query = fresh();
        let created = create(
            &query,
            Collection::Budgets,
            json!({"categoryId": "cat1", "month": "2024-06", "amount": 300}),
        )
        .await;
        assert_eq!(created["periodId"], "2024-06-01");
        assert!(created.get("month").is_none());
    }

    #[tokio::test]
    async fn test_create_keeps_unreadable_ledger() {
        let stored = r#"{"accounts":[{"id":"myacc","name":"Mine","type":"bank"}],
            "transactions":[{"id":"t1","type":"Expense","amount":5,"accountId":"myacc"}]}"#;
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(crate::storage::keys::APP_DB, stored).await.unwrap();
        let query = query_over(kv.clone());

        let result = query
            .execute(Request::create(Collection::Transactions, expense_body(10.0)))
            .await;

        assert!(result.is_err());
        assert_eq!(kv.snapshot(crate::storage::keys::APP_DB).as_deref(), Some(stored));
    }

    #[tokio::test]
    async fn test_budget_month_patch_moves_cycle() {
        let query = fresh();
        let created = create(
            &query,
            Collection::Budgets,
            json!({"categoryId": "cat1", "month": "2024-06", "amount": 300}),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let updated = query
            .execute(Request::update(Collection::Budgets, id, json!({"month": "2024-07"})))
            .await
            .unwrap()
            .into_value();
        assert_eq!(updated["periodId"], "2024-07-01");
        assert!(updated.get("month").is_none());

        let bad = query
            .execute(Request::update(Collection::Budgets, id, json!({"month": "July"})))
            .await
            .unwrap_err();
        assert!(matches!(bad, QueryError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_concurrent_creates_all_land() {
        let query = fresh();
        let mut handles = Vec::new();
        for i in 0..10 {
            let query = query.clone();
            handles.push(tokio::spawn(async move {
                query
                    .execute(Request::create(
                        Collection::Transactions,
                        expense_body(i as f64 + 1.0),
                    ))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records = query
            .execute(Request::list(Collection::Transactions, ListQuery::default()))
            .await
            .unwrap()
            .into_value();
        assert_eq!(records.as_array().map(Vec::len), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_deadline() {
        let kv = Arc::new(SlowKeyValueStore {
            inner: MemoryKeyValueStore::new(),
            delay: Duration::from_secs(60),
        });
        let settings = Settings::default();
        let store = Arc::new(DocumentStore::new(kv, &settings));
        let query = LocalQuery::with_timeout(store, Duration::from_secs(1));

        let err = query
            .execute(Request::list(Collection::Accounts, ListQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), QueryStatus::Timeout);
    }
}
