//! Cloud drive transport
//!
//! Talks to a Drive-style REST API with a bearer token: multipart upload,
//! name-pattern listing, media download and delete.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::fs;
use tracing::{info, warn};

use super::auth::AuthProvider;
use super::{BackupTarget, TransportOutcome};
use crate::backup::{ExportedFile, RestoreManager, RestoreResult, JSON_MIME_TYPE};
use crate::config::CloudSettings;
use crate::error::{InoutError, InoutResult};

const MULTIPART_BOUNDARY: &str = "-------314159265358979323846";
const BACKUP_DESCRIPTION: &str = "Financial app backup - created by In & Out";
const LIST_FIELDS: &str = "files(id,name,mimeType,createdTime,modifiedTime,size)";

const USER_AGENT: &str = concat!("inout/", env!("CARGO_PKG_VERSION"));

/// A backup stored in the cloud drive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    /// Byte count; the API sends it as a string
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<CloudFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Upload,
    List,
    Download,
    Delete,
}

impl Operation {
    fn fallback_message(self) -> &'static str {
        match self {
            Self::Upload => "Upload failed",
            Self::List => "Failed to list backups",
            Self::Download => "Download failed",
            Self::Delete => "Delete failed",
        }
    }
}

/// Turn an API error message into something a user can act on
fn classify_api_error(operation: Operation, message: &str) -> String {
    let lower = message.to_lowercase();
    if operation == Operation::Upload
        && (lower.contains("storage quota") || message.contains("storageQuotaExceeded"))
    {
        return "Your cloud storage is full. Please free up space and try again.".into();
    }
    if operation == Operation::Upload
        && (lower.contains("rate limit") || message.contains("rateLimitExceeded"))
    {
        return "Too many requests. Please wait a few minutes and try again.".into();
    }
    if lower.contains("invalid") && lower.contains("credentials") {
        return "Authentication error. Please sign out and sign in again.".into();
    }
    if matches!(operation, Operation::Download | Operation::Delete)
        && lower.contains("not found")
    {
        return match operation {
            Operation::Delete => "Backup file not found. It may have already been deleted.",
            _ => "Backup file not found. It may have been deleted.",
        }
        .into();
    }
    message.to_string()
}

fn network_error(e: reqwest::Error) -> InoutError {
    if e.is_connect() || e.is_timeout() {
        InoutError::Transport("Network error. Please check your internet connection.".into())
    } else {
        InoutError::Transport(e.to_string())
    }
}

/// Assemble a `multipart/related` body: JSON metadata, then the content
fn multipart_body(metadata: &Value, mime_type: &str, content: &str) -> String {
    let delimiter = format!("\r\n--{}\r\n", MULTIPART_BOUNDARY);
    let close_delimiter = format!("\r\n--{}--", MULTIPART_BOUNDARY);
    format!(
        "{delimiter}Content-Type: application/json; charset=UTF-8\r\n\r\n{metadata}{delimiter}Content-Type: {mime_type}\r\n\r\n{content}{close_delimiter}"
    )
}

/// Client for the cloud drive API
#[derive(Clone)]
pub struct CloudDriveClient {
    http: Client,
    api_url: String,
    upload_url: String,
    auth: Arc<dyn AuthProvider>,
}

impl CloudDriveClient {
    pub fn new(settings: &CloudSettings, auth: Arc<dyn AuthProvider>) -> InoutResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| InoutError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            upload_url: settings.upload_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn auth(&self) -> &Arc<dyn AuthProvider> {
        &self.auth
    }

    async fn bearer(&self) -> InoutResult<String> {
        if self.auth.current_user().await?.is_none() {
            return Err(InoutError::SignInRequired);
        }
        Ok(format!("Bearer {}", self.auth.get_tokens().await?.access_token))
    }

    fn upload_request(&self, bearer: &str, file_name: &str, content: &str) -> RequestBuilder {
        let metadata = json!({
            "name": file_name,
            "mimeType": JSON_MIME_TYPE,
            "description": BACKUP_DESCRIPTION,
        });
        self.http
            .post(format!("{}/files", self.upload_url))
            .query(&[("uploadType", "multipart")])
            .header(AUTHORIZATION, bearer)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(multipart_body(&metadata, JSON_MIME_TYPE, content))
    }

    fn list_request(&self, bearer: &str) -> RequestBuilder {
        let query = format!(
            "mimeType='{}' and name contains 'financial_backup'",
            JSON_MIME_TYPE
        );
        self.http
            .get(format!("{}/files", self.api_url))
            .query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("orderBy", "modifiedTime desc"),
            ])
            .header(AUTHORIZATION, bearer)
    }

    fn file_request(&self, method: reqwest::Method, bearer: &str, id: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/files/{}", self.api_url, id))
            .header(AUTHORIZATION, bearer)
    }

    /// Send a request and turn a non-2xx reply into a classified error
    async fn send(&self, request: RequestBuilder, operation: Operation) -> InoutResult<Response> {
        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or(operation.fallback_message());
        warn!(status = status.as_u16(), %message, ?operation, "cloud request failed");
        Err(InoutError::Transport(classify_api_error(operation, message)))
    }

    /// Upload a backup file, then remove the local copy
    pub async fn upload(&self, file: &ExportedFile) -> InoutResult<CloudFile> {
        let bearer = self.bearer().await?;
        let content = fs::read_to_string(&file.path).await?;

        let response = self
            .send(
                self.upload_request(&bearer, &file.file_name, &content),
                Operation::Upload,
            )
            .await?;
        let uploaded: CloudFile = response.json().await.map_err(network_error)?;
        info!(id = %uploaded.id, name = %uploaded.name, "uploaded backup");

        if let Err(e) = fs::remove_file(&file.path).await {
            warn!(path = %file.path.display(), error = %e, "failed to clean up local backup");
        }
        Ok(uploaded)
    }

    /// Backups in the drive, most recently modified first
    pub async fn list(&self) -> InoutResult<Vec<CloudFile>> {
        let bearer = self.bearer().await?;
        let response = self.send(self.list_request(&bearer), Operation::List).await?;
        let list: FileList = response.json().await.map_err(network_error)?;
        Ok(list.files)
    }

    /// Raw content of one backup
    pub async fn download(&self, id: &str) -> InoutResult<String> {
        let bearer = self.bearer().await?;
        let response = self
            .send(
                self.file_request(reqwest::Method::GET, &bearer, id)
                    .query(&[("alt", "media")]),
                Operation::Download,
            )
            .await?;
        response.text().await.map_err(network_error)
    }

    /// Download a backup and restore it over the ledger
    pub async fn restore(&self, id: &str, restore: &RestoreManager) -> InoutResult<RestoreResult> {
        let content = self.download(id).await?;
        let result = restore.restore_from_str(&content).await.map_err(|e| {
            if e.is_validation() {
                InoutError::Validation(format!(
                    "Invalid backup file. The file may be corrupted or incompatible. ({})",
                    e
                ))
            } else {
                e
            }
        })?;
        info!(id, records = result.total(), "restored cloud backup");
        Ok(result)
    }

    pub async fn delete(&self, id: &str) -> InoutResult<()> {
        let bearer = self.bearer().await?;
        self.send(
            self.file_request(reqwest::Method::DELETE, &bearer, id),
            Operation::Delete,
        )
        .await?;
        info!(id, "deleted cloud backup");
        Ok(())
    }
}

#[async_trait]
impl BackupTarget for CloudDriveClient {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn deliver(&self, file: &ExportedFile) -> TransportOutcome {
        match self.upload(file).await {
            Ok(_) => TransportOutcome::Succeeded,
            Err(e) => TransportOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;
    use crate::transport::StoredTokenAuth;

    fn client() -> CloudDriveClient {
        let settings = CloudSettings {
            api_url: "https://drive.example.test/v3/".into(),
            upload_url: "https://drive.example.test/upload/v3".into(),
        };
        let auth = Arc::new(StoredTokenAuth::new(Arc::new(MemoryKeyValueStore::new())));
        CloudDriveClient::new(&settings, auth).unwrap()
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body(&json!({"name": "b.json"}), JSON_MIME_TYPE, "{}");
        assert_eq!(
            body,
            "\r\n---------314159265358979323846\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{\"name\":\"b.json\"}\r\n---------314159265358979323846\r\nContent-Type: application/json\r\n\r\n{}\r\n---------314159265358979323846--"
        );
    }

    #[test]
    fn test_upload_request() {
        let request = client()
            .upload_request("Bearer t", "financial_backup_1.json", "{}")
            .build()
            .unwrap();
        assert_eq!(request.method(), &reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://drive.example.test/upload/v3/files?uploadType=multipart"
        );
        assert_eq!(
            request.headers()[CONTENT_TYPE],
            "multipart/related; boundary=-------314159265358979323846"
        );
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer t");
    }

    #[test]
    fn test_list_request_query() {
        let request = client().list_request("Bearer t").build().unwrap();
        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(request.url().path(), "/v3/files");
        assert!(pairs.contains(&(
            "q".to_string(),
            "mimeType='application/json' and name contains 'financial_backup'".to_string()
        )));
        assert!(pairs.contains(&("orderBy".to_string(), "modifiedTime desc".to_string())));
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            classify_api_error(Operation::Upload, "The user's Drive storage quota has been exceeded."),
            "Your cloud storage is full. Please free up space and try again."
        );
        assert_eq!(
            classify_api_error(Operation::Upload, "User rate limit exceeded"),
            "Too many requests. Please wait a few minutes and try again."
        );
        assert_eq!(
            classify_api_error(Operation::List, "Request had invalid authentication credentials."),
            "Authentication error. Please sign out and sign in again."
        );
        assert_eq!(
            classify_api_error(Operation::Delete, "File not found: abc"),
            "Backup file not found. It may have already been deleted."
        );
        assert_eq!(
            classify_api_error(Operation::Download, "File not found: abc"),
            "Backup file not found. It may have been deleted."
        );
        assert_eq!(classify_api_error(Operation::List, "Backend Error"), "Backend Error");
    }

    #[test]
    fn test_file_list_decoding() {
        let list: FileList = serde_json::from_value(json!({
            "files": [{
                "id": "f1",
                "name": "financial_backup_20240601-000000.json",
                "mimeType": "application/json",
                "modifiedTime": "2024-06-01T00:00:00.000Z",
                "size": "2048"
            }]
        }))
        .unwrap();
        assert_eq!(list.files[0].size.as_deref(), Some("2048"));
        assert!(list.files[0].created_time.is_none());
    }

    #[tokio::test]
    async fn test_signed_out_list_fails_without_network() {
        let err = client().list().await.unwrap_err();
        assert!(matches!(err, InoutError::SignInRequired));
        assert!(err.to_string().contains("sign in again"));
    }
}
