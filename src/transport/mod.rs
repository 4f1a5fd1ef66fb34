//! Backup transports
//!
//! Moves exported files off the device. Every transport reports one of three
//! outcomes so callers can tell a user who backed out from a real failure.

pub mod auth;
pub mod cloud;
pub mod share;

use std::fmt;

use async_trait::async_trait;

use crate::backup::ExportedFile;

pub use auth::{AuthProvider, AuthTokens, CloudUser, StoredAuth, StoredTokenAuth};
pub use cloud::{CloudDriveClient, CloudFile};
pub use share::{OutboxShareSheet, ShareRequest, ShareResult, ShareSheet, ShareTransport};

/// Result of handing a file to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    Succeeded,
    /// The user dismissed the transport; nothing went wrong
    Cancelled,
    Failed(String),
}

impl TransportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for TransportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// A destination for scheduled backups
#[async_trait]
pub trait BackupTarget: Send + Sync {
    /// Short name used in logs and error notes
    fn name(&self) -> &'static str;

    async fn deliver(&self, file: &ExportedFile) -> TransportOutcome;
}
