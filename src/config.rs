//! Configuration for the storage client

use crate::chunker::DEFAULT_CHUNK_SIZE;
use crate::error::{Result, StorageError};
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage gateway base URL
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Bucket blobs are written to
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Owner identity (the backend that issues certificates)
    #[serde(default)]
    pub owner: String,

    /// Project ID sent with every gateway request
    #[serde(default)]
    pub project_id: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Chunking and upload concurrency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Chunk size in bytes (default: 1 MiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunk uploads in flight at once (default: 10)
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,
}

fn default_gateway_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_bucket() -> String {
    "default-bucket".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_concurrent_uploads() -> usize {
    10
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_concurrent_uploads: default_max_concurrent_uploads(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            bucket: default_bucket(),
            owner: String::new(),
            project_id: String::new(),
            request_timeout_secs: default_timeout_secs(),
            upload: UploadConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| StorageError::Config(e.to_string()))
    }

    /// Save config to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| StorageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Gateway URL without trailing slashes
    pub fn gateway_base(&self) -> &str {
        self.gateway_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway_base().is_empty() {
            return Err(StorageError::Config("gateway_url must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(StorageError::Config("request_timeout_secs must be > 0".into()));
        }
        if self.upload.chunk_size == 0 {
            return Err(StorageError::Config("upload.chunk_size must be > 0".into()));
        }
        if self.upload.max_concurrent_uploads == 0 {
            return Err(StorageError::Config(
                "upload.max_concurrent_uploads must be > 0".into(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(StorageError::Config(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.upload.chunk_size, 1024 * 1024);
        assert_eq!(config.upload.max_concurrent_uploads, 10);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.retry.max_delay_ms, 30_000);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: StorageConfig = toml::from_str(
            r#"
            gateway_url = "https://gateway.example.com/"
            project_id = "proj-1"

            [retry]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway_base(), "https://gateway.example.com");
        assert_eq!(config.project_id, "proj-1");
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.upload, UploadConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = StorageConfig::default();
        config.owner = "owner-1".into();
        config.upload.chunk_size = 4096;
        config.save(&path).unwrap();

        assert_eq!(StorageConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "upload = 3").unwrap();
        assert!(matches!(
            StorageConfig::load(&path),
            Err(StorageError::Config(_))
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = StorageConfig::default();
        config.upload.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = StorageConfig::default();
        config.upload.max_concurrent_uploads = 0;
        assert!(config.validate().is_err());

        let mut config = StorageConfig::default();
        config.retry.base_delay_ms = 60_000;
        assert!(config.validate().is_err());

        let mut config = StorageConfig::default();
        config.gateway_url = "/".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = StorageConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StorageError::Config(_))));
    }
}
