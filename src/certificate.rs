//! Write-authorization certificates
//!
//! The gateway only accepts a blob tree together with a certificate, issued by
//! the blob's owner, covering the tree's root hash. How the certificate is
//! obtained is up to the owner; [`CertificateProvider`] is the seam.

use crate::error::{Result, StorageError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Exchanges a blob root hash for a signed authorization certificate.
#[async_trait]
pub trait CertificateProvider: Send + Sync {
    /// Certificate bytes authorizing a write of `blob_hash` (`sha256:<hex>`).
    async fn get_certificate(&self, blob_hash: &str) -> Result<Vec<u8>>;
}

#[async_trait]
impl<T: CertificateProvider + ?Sized> CertificateProvider for Arc<T> {
    async fn get_certificate(&self, blob_hash: &str) -> Result<Vec<u8>> {
        (**self).get_certificate(blob_hash).await
    }
}

#[derive(Debug, Serialize)]
struct CertificateRequest<'a> {
    blob_hash: &'a str,
}

/// Certificate provider backed by an HTTP endpoint.
///
/// POSTs `{"blob_hash": "sha256:..."}` and returns the raw response body.
#[derive(Debug, Clone)]
pub struct HttpCertificateProvider {
    url: String,
    client: Client,
    api_key: Option<String>,
}

impl HttpCertificateProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
            api_key: None,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl CertificateProvider for HttpCertificateProvider {
    async fn get_certificate(&self, blob_hash: &str) -> Result<Vec<u8>> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&CertificateRequest { blob_hash });
        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Certificate(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Certificate(format!(
                "backend returned {}: {}",
                status, body
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Certificate(format!("failed to read body: {}", e)))?;
        if bytes.is_empty() {
            return Err(StorageError::Certificate("backend returned an empty certificate".into()));
        }
        Ok(bytes.to_vec())
    }
}
