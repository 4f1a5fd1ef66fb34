//! Cloud sign-in
//!
//! `AuthProvider` is the seam to an OAuth client. `StoredTokenAuth` keeps a
//! token obtained elsewhere in the `cloudAuth` key-value slot.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{InoutError, InoutResult};
use crate::storage::kv::{get_json, keys, set_json, KeyValueStore};

/// The signed-in cloud account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthTokens {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self) -> InoutResult<CloudUser>;

    async fn sign_out(&self) -> InoutResult<()>;

    async fn current_user(&self) -> InoutResult<Option<CloudUser>>;

    /// A usable access token, or `SignInRequired`
    async fn get_tokens(&self) -> InoutResult<AuthTokens>;
}

/// Persisted sign-in record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAuth {
    pub user: CloudUser,
    pub tokens: AuthTokens,
}

/// Token-based provider backed by the key-value store
pub struct StoredTokenAuth {
    kv: Arc<dyn KeyValueStore>,
    pending: Option<StoredAuth>,
}

impl StoredTokenAuth {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv, pending: None }
    }

    /// Credentials that `sign_in` will store
    pub fn with_credentials(mut self, auth: StoredAuth) -> Self {
        self.pending = Some(auth);
        self
    }

    async fn stored(&self) -> InoutResult<Option<StoredAuth>> {
        get_json(self.kv.as_ref(), keys::CLOUD_AUTH).await
    }
}

#[async_trait]
impl AuthProvider for StoredTokenAuth {
    async fn sign_in(&self) -> InoutResult<CloudUser> {
        if let Some(auth) = &self.pending {
            set_json(self.kv.as_ref(), keys::CLOUD_AUTH, auth).await?;
            info!(email = %auth.user.email, "signed in to cloud storage");
            return Ok(auth.user.clone());
        }
        self.stored()
            .await?
            .map(|auth| auth.user)
            .ok_or(InoutError::SignInRequired)
    }

    async fn sign_out(&self) -> InoutResult<()> {
        self.kv.remove(keys::CLOUD_AUTH).await?;
        info!("signed out of cloud storage");
        Ok(())
    }

    async fn current_user(&self) -> InoutResult<Option<CloudUser>> {
        Ok(self.stored().await?.map(|auth| auth.user))
    }

    async fn get_tokens(&self) -> InoutResult<AuthTokens> {
        match self.stored().await {
            Ok(Some(auth)) if !auth.tokens.is_expired(Utc::now()) => Ok(auth.tokens),
            _ => Err(InoutError::SignInRequired),
        }
    }
}
