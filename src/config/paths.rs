//! Path management for In & Out
//!
//! Resolves where the key-value slots, exports, backups and the share outbox
//! live on disk.
//!
//! ## Path Resolution Order
//!
//! 1. `INOUT_DATA_DIR` environment variable (if set)
//! 2. The platform data directory from `directories::ProjectDirs`

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::InoutError;

/// Manages all paths used by the ledger
#[derive(Debug, Clone)]
pub struct InoutPaths {
    /// Base directory for all ledger data
    base_dir: PathBuf,
}

impl InoutPaths {
    /// Create a new InoutPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no platform data directory can be determined.
    pub fn new() -> Result<Self, InoutError> {
        let base_dir = if let Ok(custom) = std::env::var("INOUT_DATA_DIR") {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create InoutPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Directory holding one file per key-value slot
    pub fn store_dir(&self) -> PathBuf {
        self.base_dir.join("store")
    }

    /// Directory where CSV exports and backup files are written
    pub fn export_dir(&self) -> PathBuf {
        self.base_dir.join("exports")
    }

    /// Default directory the share transport delivers into
    pub fn outbox_dir(&self) -> PathBuf {
        self.base_dir.join("outbox")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), InoutError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| InoutError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.store_dir())
            .map_err(|e| InoutError::Io(format!("Failed to create store directory: {}", e)))?;

        std::fs::create_dir_all(self.export_dir())
            .map_err(|e| InoutError::Io(format!("Failed to create export directory: {}", e)))?;

        std::fs::create_dir_all(self.outbox_dir())
            .map_err(|e| InoutError::Io(format!("Failed to create outbox directory: {}", e)))?;

        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, InoutError> {
    ProjectDirs::from("app", "inout", "inout")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| InoutError::Config("Could not determine a data directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = InoutPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.store_dir(), temp_dir.path().join("store"));
        assert_eq!(paths.export_dir(), temp_dir.path().join("exports"));
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();
        let custom_path = temp_dir.path().to_str().unwrap();

        env::set_var("INOUT_DATA_DIR", custom_path);

        let paths = InoutPaths::new().unwrap();
        assert_eq!(paths.base_dir(), temp_dir.path());

        env::remove_var("INOUT_DATA_DIR");
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = InoutPaths::with_base_dir(temp_dir.path().to_path_buf());

        paths.ensure_directories().unwrap();

        assert!(paths.store_dir().exists());
        assert!(paths.export_dir().exists());
        assert!(paths.outbox_dir().exists());
    }
}
