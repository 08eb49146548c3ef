//! HTTP client for the storage gateway
//!
//! Two calls, both retried with [`with_retry`]:
//!
//! - `PUT {gateway}/v1/blob-tree/` registers a blob's hash tree
//! - `PUT {gateway}/v1/chunk/?...` uploads one chunk of a registered blob

use crate::error::{Result, StorageError};
use crate::hash::{validate_hash_format, ContentHash};
use crate::retry::{with_retry, RetryConfig};
use crate::tree::{BlobHashTree, BlobHashTreeJson};
use bytes::Bytes;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Versioned path prefix for every gateway endpoint
pub const GATEWAY_VERSION: &str = "v1";

/// Header carrying the project ID
pub const PROJECT_ID_HEADER: &str = "X-Caffeine-Project-ID";

/// Chunk response status marking the blob's final chunk
const BLOB_COMPLETE: &str = "blob_complete";

/// Parameters for a single chunk upload
#[derive(Debug, Clone)]
pub struct UploadChunkParams<'a> {
    pub blob_root_hash: ContentHash,
    pub chunk_hash: ContentHash,
    pub chunk_index: usize,
    pub chunk_data: Bytes,
    pub bucket_name: &'a str,
    pub owner: &'a str,
    pub project_id: &'a str,
}

/// Outcome of a chunk upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkUploadResult {
    /// Gateway has every chunk of the blob
    pub is_complete: bool,
}

#[derive(Debug, Serialize)]
struct RegisterTreeRequest<'a> {
    blob_tree: &'a BlobHashTreeJson,
    bucket_name: &'a str,
    num_blob_bytes: u64,
    owner: &'a str,
    project_id: &'a str,
    headers: &'a [String],
    auth: TreeAuth<'a>,
}

#[derive(Debug, Serialize)]
struct TreeAuth<'a> {
    #[serde(rename = "OwnerEgressSignature")]
    owner_egress_signature: &'a [u8],
}

#[derive(Debug, Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    status: Option<String>,
}

/// Low-level storage gateway client
#[derive(Debug, Clone)]
pub struct GatewayClient {
    gateway_url: String,
    client: Client,
    retry: RetryConfig,
}

impl GatewayClient {
    /// Create a gateway client with a per-request timeout
    pub fn new(
        gateway_url: impl Into<String>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http_client(gateway_url, client, retry))
    }

    /// Create a gateway client around an existing HTTP client
    pub fn with_http_client(
        gateway_url: impl Into<String>,
        client: Client,
        retry: RetryConfig,
    ) -> Self {
        let gateway_url = gateway_url.into().trim_end_matches('/').to_string();
        Self {
            gateway_url,
            client,
            retry,
        }
    }

    /// Gateway base URL (no trailing slash)
    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Register a blob's hash tree, authorized by `certificate`.
    ///
    /// Every hash is format-checked before any request is sent.
    pub async fn register_tree(
        &self,
        tree: &BlobHashTree,
        bucket_name: &str,
        num_blob_bytes: u64,
        owner: &str,
        project_id: &str,
        certificate: &[u8],
    ) -> Result<()> {
        let tree_json = tree.to_json();
        tree_json.validate()?;

        let url = format!("{}/{}/blob-tree/", self.gateway_url, GATEWAY_VERSION);
        let body = serde_json::to_vec(&RegisterTreeRequest {
            blob_tree: &tree_json,
            bucket_name,
            num_blob_bytes,
            owner,
            project_id,
            headers: tree.headers(),
            auth: TreeAuth {
                owner_egress_signature: certificate,
            },
        })?;
        let body = Bytes::from(body);

        debug!(
            root_hash = %tree_json.tree.hash,
            chunks = tree_json.chunk_hashes.len(),
            num_blob_bytes,
            "Registering blob tree"
        );

        with_retry(&self.retry, "register_tree", || {
            self.send_tree(&url, project_id, body.clone())
        })
        .await
    }

    /// Upload one chunk of an already registered blob.
    pub async fn upload_chunk(&self, params: UploadChunkParams<'_>) -> Result<ChunkUploadResult> {
        let blob_hash = params.blob_root_hash.to_sha_string();
        let chunk_hash = params.chunk_hash.to_sha_string();
        validate_hash_format(
            &blob_hash,
            &format!("uploadChunk[{}] blob_hash", params.chunk_index),
        )?;
        validate_hash_format(
            &chunk_hash,
            &format!("uploadChunk[{}] chunk_hash", params.chunk_index),
        )?;

        let url = format!(
            "{}/{}/chunk/?owner_id={}&blob_hash={}&chunk_hash={}&chunk_index={}&bucket_name={}&project_id={}",
            self.gateway_url,
            GATEWAY_VERSION,
            urlencoding::encode(params.owner),
            urlencoding::encode(&blob_hash),
            urlencoding::encode(&chunk_hash),
            params.chunk_index,
            urlencoding::encode(params.bucket_name),
            urlencoding::encode(params.project_id),
        );

        let result = with_retry(&self.retry, "upload_chunk", || {
            self.send_chunk(&url, params.project_id, params.chunk_data.clone())
        })
        .await?;

        debug!(
            chunk_index = params.chunk_index,
            size = params.chunk_data.len(),
            is_complete = result.is_complete,
            "Uploaded chunk"
        );
        Ok(result)
    }

    /// Direct retrieval URL for a blob. Does not touch the network.
    pub fn blob_url(&self, blob_hash: &str, owner: &str, project_id: &str) -> String {
        format!(
            "{}/{}/blob/?blob_hash={}&owner_id={}&project_id={}",
            self.gateway_url,
            GATEWAY_VERSION,
            urlencoding::encode(blob_hash),
            urlencoding::encode(owner),
            urlencoding::encode(project_id),
        )
    }

    // ==================== Helper Methods ====================

    async fn send_tree(&self, url: &str, project_id: &str, body: Bytes) -> Result<()> {
        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(PROJECT_ID_HEADER, project_id)
            .body(body)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn send_chunk(
        &self,
        url: &str,
        project_id: &str,
        data: Bytes,
    ) -> Result<ChunkUploadResult> {
        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(PROJECT_ID_HEADER, project_id)
            .body(data)
            .send()
            .await?;

        let body = check_status(response).await?.bytes().await?;
        if body.is_empty() {
            return Ok(ChunkUploadResult { is_complete: false });
        }

        // Chunk is stored once the gateway answers 2xx; the body only carries the completion flag
        let is_complete = match serde_json::from_slice::<ChunkResponse>(&body) {
            Ok(parsed) => parsed.status.as_deref() == Some(BLOB_COMPLETE),
            Err(e) => {
                debug!(error = %e, "Unparseable chunk response body");
                false
            }
        };
        Ok(ChunkUploadResult { is_complete })
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Gateway {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.to_string()
        } else {
            format!("{} - {}", status, message)
        },
    })
}
