//! Attachment model
//!
//! Associates a transaction with a file reference. Only the reference is
//! stored; file contents never enter the document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::Document;
use super::ids::{AttachmentId, TransactionId};
use super::record::{timestamp_now, Collection, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: AttachmentId,

    pub transaction_id: TransactionId,

    pub file_name: String,

    /// Location of the file on the device
    pub file_path: String,

    #[serde(default)]
    pub file_size: u64,

    #[serde(default)]
    pub mime_type: String,

    #[serde(default = "timestamp_now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "timestamp_now")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Attachment {
    const COLLECTION: Collection = Collection::Attachments;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn validate(&self) -> Result<(), String> {
        if self.file_path.trim().is_empty() {
            return Err("Attachment requires a file path".into());
        }
        Ok(())
    }

    fn items(doc: &Document) -> &Vec<Self> {
        &doc.attachments
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.attachments
    }
}
