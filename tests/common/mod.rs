//! Shared helpers for gateway integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use icfs_storage_client::{
    CertificateProvider, RetryConfig, StorageConfig, StorageError, UploadConfig,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

pub const TEST_OWNER: &str = "owner-principal";
pub const TEST_PROJECT: &str = "project-42";
pub const TEST_BUCKET: &str = "bucket-a";
pub const TEST_CERTIFICATE: &[u8] = &[0xde, 0xad, 0xbe, 0xef, 0x01];

/// Retry settings that keep tests in the millisecond range
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        base_delay_ms: 20,
        max_delay_ms: 200,
        jitter_ms: 5,
    }
}

pub fn test_config(gateway_url: &str) -> StorageConfig {
    StorageConfig {
        gateway_url: gateway_url.to_string(),
        bucket: TEST_BUCKET.to_string(),
        owner: TEST_OWNER.to_string(),
        project_id: TEST_PROJECT.to_string(),
        request_timeout_secs: 5,
        upload: UploadConfig::default(),
        retry: fast_retry(),
    }
}

/// Certificate provider recording every hash it was asked to sign
pub struct MockCertificates {
    fail: bool,
    call_count: AtomicU32,
    requested: Mutex<Vec<String>>,
}

impl MockCertificates {
    pub fn new() -> Self {
        Self {
            fail: false,
            call_count: AtomicU32::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl CertificateProvider for MockCertificates {
    async fn get_certificate(&self, blob_hash: &str) -> icfs_storage_client::Result<Vec<u8>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(blob_hash.to_string());

        if self.fail {
            return Err(StorageError::Certificate("backend rejected request".into()));
        }
        Ok(TEST_CERTIFICATE.to_vec())
    }
}

/// Deterministic payload of `len` bytes
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}
