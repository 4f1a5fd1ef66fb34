//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure.

use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::InoutError;

/// Read a UTF-8 file, returning `None` if it doesn't exist
pub async fn read_text<P: AsRef<Path>>(path: P) -> Result<Option<String>, InoutError> {
    let path = path.as_ref();
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(InoutError::Storage(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Read JSON from a file, returning an error if file doesn't exist
pub async fn read_json_required<T, P>(path: P) -> Result<T, InoutError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = read_text(path)
        .await?
        .ok_or_else(|| InoutError::Storage(format!("File not found: {}", path.display())))?;

    serde_json::from_str(&text)
        .map_err(|e| InoutError::Json(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write text to a file atomically (write to temp, then rename)
///
/// The file is either completely written or not modified at all.
pub async fn write_text_atomic<P: AsRef<Path>>(path: P, contents: &str) -> Result<(), InoutError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            InoutError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Temp file must live in the same directory for the rename to be atomic
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let mut file = fs::File::create(&temp_path)
        .await
        .map_err(|e| InoutError::Storage(format!("Failed to create temp file: {}", e)))?;

    file.write_all(contents.as_bytes())
        .await
        .map_err(|e| InoutError::Storage(format!("Failed to write data: {}", e)))?;

    file.sync_all()
        .await
        .map_err(|e| InoutError::Storage(format!("Failed to sync data: {}", e)))?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(InoutError::Storage(format!("Failed to rename temp file: {}", e)));
    }

    Ok(())
}

/// Write pretty-printed JSON to a file atomically
pub async fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), InoutError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let text = serde_json::to_string_pretty(data)
        .map_err(|e| InoutError::Json(format!("Failed to serialize data: {}", e)))?;
    write_text_atomic(path, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let text = read_text(temp_dir.path().join("missing.json")).await.unwrap();
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_write_and_read_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };
        write_json_atomic(&path, &data).await.unwrap();

        let loaded: TestData = read_json_required(&path).await.unwrap();
        assert_eq!(data, loaded);
    }

    #[tokio::test]
    async fn test_no_temp_file_left() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("slot.json");

        write_text_atomic(&path, "{}").await.unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join("slot.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("out.csv");

        write_text_atomic(&path, "a,b\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }

    #[tokio::test]
    async fn test_read_json_required_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result: Result<TestData, _> =
            read_json_required(temp_dir.path().join("nope.json")).await;
        assert!(result.is_err());
    }
}
