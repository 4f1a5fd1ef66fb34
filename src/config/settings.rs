//! User settings for In & Out
//!
//! Manages preferences that the data layer depends on: the default currency,
//! the budget period start day, persistence deadlines and cloud endpoints.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::InoutPaths;
use crate::error::InoutError;

/// Cloud file-storage endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSettings {
    /// Metadata API base (list, download, delete)
    #[serde(default = "default_drive_api_url")]
    pub api_url: String,

    /// Upload API base
    #[serde(default = "default_drive_upload_url")]
    pub upload_url: String,
}

fn default_drive_api_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_drive_upload_url() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            api_url: default_drive_api_url(),
            upload_url: default_drive_upload_url(),
        }
    }
}

/// User settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency applied to starter accounts and imported rows without one
    #[serde(default = "default_currency")]
    pub currency_code: String,

    /// Day of month (1-28) on which budget cycles start
    #[serde(default = "default_period_start_day")]
    pub period_start_day: u8,

    /// Deadline for a single key-value read or write
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Deadline for a whole query request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How often the scheduler re-checks while in the foreground
    #[serde(default = "default_poll_interval_secs")]
    pub scheduler_poll_secs: u64,

    /// Overrides the share outbox directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_outbox: Option<PathBuf>,

    /// Cloud endpoints
    #[serde(default)]
    pub cloud: CloudSettings,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_period_start_day() -> u8 {
    1
}

fn default_store_timeout_ms() -> u64 {
    3_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_secs() -> u64 {
    60 * 60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            currency_code: default_currency(),
            period_start_day: default_period_start_day(),
            store_timeout_ms: default_store_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            scheduler_poll_secs: default_poll_interval_secs(),
            share_outbox: None,
            cloud: CloudSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &InoutPaths) -> Result<Self, InoutError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                InoutError::Io(format!("Failed to read settings file: {}", e))
            })?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                InoutError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            settings.validate()?;
            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &InoutPaths) -> Result<(), InoutError> {
        self.validate()?;
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            InoutError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        std::fs::write(paths.settings_file(), contents).map_err(|e| {
            InoutError::Io(format!("Failed to write settings file: {}", e))
        })?;

        Ok(())
    }

    /// Reject values the data layer cannot work with
    pub fn validate(&self) -> Result<(), InoutError> {
        if !(1..=28).contains(&self.period_start_day) {
            return Err(InoutError::Config(format!(
                "period start day must be between 1 and 28, got {}",
                self.period_start_day
            )));
        }
        if self.currency_code.len() != 3 {
            return Err(InoutError::Config(format!(
                "currency code must be a 3-letter ISO 4217 code, got '{}'",
                self.currency_code
            )));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn scheduler_poll_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler_poll_secs)
    }

    /// Where the share transport delivers files
    pub fn outbox_dir(&self, paths: &InoutPaths) -> PathBuf {
        self.share_outbox
            .clone()
            .unwrap_or_else(|| paths.outbox_dir())
    }
}
