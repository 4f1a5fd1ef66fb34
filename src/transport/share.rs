//! Share-sheet transport
//!
//! A `ShareSheet` hands a file (or a plain message) to whatever the platform
//! offers for sharing. `OutboxShareSheet` is the desktop stand-in: it drops
//! shared items into an outbox directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::{info, warn};

use super::{BackupTarget, TransportOutcome};
use crate::backup::{ExportedFile, CSV_MIME_TYPE, JSON_MIME_TYPE};

/// Inline fallback content is cut to this many characters
pub const INLINE_SHARE_LIMIT: usize = 2000;

const TRUNCATION_NOTE: &str = "\n\n... (content truncated)";

/// What to share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub title: String,
    pub message: String,
    /// File to attach; `None` shares the message alone
    pub file_path: Option<PathBuf>,
    pub mime_type: Option<String>,
}

/// How a share attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareResult {
    Shared,
    /// The user closed the share dialog
    Dismissed,
    Failed(String),
}

#[async_trait]
pub trait ShareSheet: Send + Sync {
    async fn share(&self, request: &ShareRequest) -> ShareResult;
}

/// Shares by copying into a directory
pub struct OutboxShareSheet {
    dir: PathBuf,
}

impl OutboxShareSheet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn deliver(&self, request: &ShareRequest) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        match &request.file_path {
            Some(source) => {
                let name = source
                    .file_name()
                    .map(|n| n.to_os_string())
                    .unwrap_or_else(|| "shared".into());
                let target = self.dir.join(name);
                fs::copy(source, &target).await?;
                Ok(target)
            }
            None => {
                let target = self.dir.join(format!(
                    "shared_message_{}.txt",
                    Utc::now().format("%Y%m%d-%H%M%S%3f")
                ));
                fs::write(&target, format!("{}\n\n{}", request.title, request.message)).await?;
                Ok(target)
            }
        }
    }
}

#[async_trait]
impl ShareSheet for OutboxShareSheet {
    async fn share(&self, request: &ShareRequest) -> ShareResult {
        match self.deliver(request).await {
            Ok(path) => {
                info!(path = %path.display(), title = %request.title, "shared to outbox");
                ShareResult::Shared
            }
            Err(e) => ShareResult::Failed(e.to_string()),
        }
    }
}

/// Cut `content` for inline sharing
fn truncate_inline(content: &str) -> String {
    if content.chars().count() <= INLINE_SHARE_LIMIT {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(INLINE_SHARE_LIMIT).collect();
    cut.push_str(TRUNCATION_NOTE);
    cut
}

/// Shares exports and backups through a `ShareSheet`
#[derive(Clone)]
pub struct ShareTransport {
    sheet: Arc<dyn ShareSheet>,
}

impl ShareTransport {
    pub fn new(sheet: Arc<dyn ShareSheet>) -> Self {
        Self { sheet }
    }

    /// Share a CSV export
    ///
    /// When the file itself cannot be shared, the (possibly truncated) CSV
    /// text is shared inline instead.
    pub async fn share_export(&self, file: &ExportedFile, content: &str) -> TransportOutcome {
        let request = ShareRequest {
            title: "Financial Data Export".into(),
            message: format!("Your transaction data export - {}", file.file_name),
            file_path: Some(file.path.clone()),
            mime_type: Some(CSV_MIME_TYPE.into()),
        };

        let reason = match self.sheet.share(&request).await {
            ShareResult::Shared => return TransportOutcome::Succeeded,
            ShareResult::Dismissed => return TransportOutcome::Cancelled,
            ShareResult::Failed(reason) => reason,
        };
        warn!(%reason, "file share failed, sharing content inline");

        let fallback = ShareRequest {
            title: "Financial Data Export".into(),
            message: format!("Your transaction data:\n\n{}", truncate_inline(content)),
            file_path: None,
            mime_type: None,
        };
        match self.sheet.share(&fallback).await {
            ShareResult::Shared => TransportOutcome::Succeeded,
            ShareResult::Dismissed => TransportOutcome::Cancelled,
            ShareResult::Failed(reason) => {
                warn!(%reason, "inline share failed");
                TransportOutcome::Failed(
                    "Unable to share the file. The file was exported successfully to your device."
                        .into(),
                )
            }
        }
    }

    /// Share a JSON backup; there is no inline fallback
    pub async fn share_backup(&self, file: &ExportedFile) -> TransportOutcome {
        let request = ShareRequest {
            title: "Financial Data Backup".into(),
            message: format!("Complete backup of your financial data - {}", file.file_name),
            file_path: Some(file.path.clone()),
            mime_type: Some(JSON_MIME_TYPE.into()),
        };

        match self.sheet.share(&request).await {
            ShareResult::Shared => TransportOutcome::Succeeded,
            ShareResult::Dismissed => TransportOutcome::Cancelled,
            ShareResult::Failed(reason) => {
                warn!(%reason, "backup share failed");
                TransportOutcome::Failed(
                    "Unable to share the backup file. The backup was created successfully on your device."
                        .into(),
                )
            }
        }
    }
}

#[async_trait]
impl BackupTarget for ShareTransport {
    fn name(&self) -> &'static str {
        "share"
    }

    async fn deliver(&self, file: &ExportedFile) -> TransportOutcome {
        self.share_backup(file).await
    }
}
