//! End-to-end blob upload
//!
//! `put_file` runs the whole write path:
//!
//! 1. chunk the payload and hash every chunk
//! 2. build the blob hash tree over the chunk hashes and metadata headers
//! 3. fetch a certificate for the root hash
//! 4. register the tree with the gateway
//! 5. upload all chunks through a fixed pool of concurrent workers
//!
//! Each step starts only after the previous one succeeded. Any failure aborts
//! the upload; no partial result is returned.

use crate::certificate::CertificateProvider;
use crate::chunker::{self, Chunk};
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::gateway::{GatewayClient, UploadChunkParams};
use crate::hash::{validate_hash_format, ContentHash, Headers};
use crate::tree::BlobHashTree;
use bytes::Bytes;
use futures::future::try_join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Progress callback, called with a rounded 0-100 percentage
pub type ProgressFn<'a> = dyn Fn(u32) + Send + Sync + 'a;

/// Result of a successful upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutFileResult {
    /// Root hash of the blob tree; the blob's durable content address
    pub hash: ContentHash,
    /// Payload size in bytes
    pub size: u64,
    /// Number of data chunks uploaded
    pub chunk_count: usize,
    /// Gateway reported the blob complete on one of the chunk uploads
    pub completed_by_gateway: bool,
}

/// A payload split and hashed, ready to upload
#[derive(Debug, Clone)]
pub struct PreparedBlob {
    pub chunks: Vec<Chunk>,
    pub tree: BlobHashTree,
    pub size: u64,
}

impl PreparedBlob {
    pub fn root_hash(&self) -> ContentHash {
        self.tree.root_hash()
    }
}

/// Metadata headers recorded for a payload of `size` bytes.
pub fn file_headers(size: u64) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Content-Type".to_string(), "application/octet-stream".to_string());
    headers.insert("Content-Length".to_string(), size.to_string());
    headers
}

/// Chunk, hash and build the tree for `data`. No network access.
///
/// Fails with [`StorageError::Config`] when `chunk_size` is zero.
pub fn compute_blob_tree(
    data: &Bytes,
    headers: &Headers,
    chunk_size: usize,
) -> Result<PreparedBlob> {
    if chunk_size == 0 {
        return Err(StorageError::Config("chunk_size must be > 0".into()));
    }

    let chunks = chunker::split(data, chunk_size);
    let chunk_hashes: Vec<ContentHash> = chunks
        .iter()
        .map(|chunk| ContentHash::from_chunk(&chunk.data))
        .collect();
    let tree = BlobHashTree::build(chunk_hashes, headers);

    Ok(PreparedBlob {
        chunks,
        tree,
        size: data.len() as u64,
    })
}

/// Blob upload client
///
/// # Example
///
/// ```rust,no_run
/// use icfs_storage_client::{HttpCertificateProvider, StorageClient, StorageConfig};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let certificates = HttpCertificateProvider::new(
///     "https://backend.example.com/certificate",
///     Duration::from_secs(30),
/// )?;
/// let client = StorageClient::new(
///     StorageConfig {
///         gateway_url: "https://blob.example.com".into(),
///         owner: "owner-id".into(),
///         project_id: "project-id".into(),
///         ..Default::default()
///     },
///     Arc::new(certificates),
/// )?;
///
/// let result = client
///     .put_file(b"hello world".to_vec(), Some(&|pct: u32| println!("{}%", pct)))
///     .await?;
/// println!("{}", client.get_direct_url(&result.hash.to_sha_string())?);
/// # Ok(())
/// # }
/// ```
pub struct StorageClient {
    config: StorageConfig,
    gateway: GatewayClient,
    certificates: Arc<dyn CertificateProvider>,
}

impl StorageClient {
    /// Create a client; the configuration is validated first.
    pub fn new(config: StorageConfig, certificates: Arc<dyn CertificateProvider>) -> Result<Self> {
        config.validate()?;
        let gateway = GatewayClient::new(
            config.gateway_base(),
            Duration::from_secs(config.request_timeout_secs),
            config.retry.clone(),
        )?;

        Ok(Self {
            config,
            gateway,
            certificates,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    /// Chunk and hash `data` with the default file headers, without uploading.
    pub fn hash_payload(&self, data: impl Into<Bytes>) -> Result<PreparedBlob> {
        let data = data.into();
        let headers = file_headers(data.len() as u64);
        compute_blob_tree(&data, &headers, self.config.upload.chunk_size)
    }

    /// Upload `data` and return its content address.
    pub async fn put_file(
        &self,
        data: impl Into<Bytes>,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<PutFileResult> {
        let data = data.into();
        let headers = file_headers(data.len() as u64);
        self.upload(data, headers, on_progress).await
    }

    /// Upload `data` with caller-chosen metadata headers.
    ///
    /// `Content-Length` is always set to the payload size.
    pub async fn put_file_with_headers(
        &self,
        data: impl Into<Bytes>,
        mut headers: Headers,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<PutFileResult> {
        let data = data.into();
        headers.insert("Content-Length".to_string(), data.len().to_string());
        self.upload(data, headers, on_progress).await
    }

    /// Retrieval URL for a blob hash. Does not touch the network.
    pub fn get_direct_url(&self, hash: &str) -> Result<String> {
        if hash.is_empty() {
            return Err(StorageError::Format("Hash must not be empty".into()));
        }
        validate_hash_format(hash, &format!("getDirectURL for path '{}'", hash))?;

        Ok(self
            .gateway
            .blob_url(hash, &self.config.owner, &self.config.project_id))
    }

    async fn upload(
        &self,
        data: Bytes,
        headers: Headers,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<PutFileResult> {
        let prepared = compute_blob_tree(&data, &headers, self.config.upload.chunk_size)?;
        let root_hash = prepared.root_hash();
        let hash_string = root_hash.to_sha_string();

        info!(
            blob_hash = %hash_string,
            size = prepared.size,
            chunks = prepared.chunks.len(),
            "Starting blob upload"
        );

        let certificate = self
            .certificates
            .get_certificate(&hash_string)
            .await
            .map_err(|e| match e {
                StorageError::Certificate(_) => e,
                other => StorageError::Certificate(other.to_string()),
            })?;
        debug!(blob_hash = %hash_string, bytes = certificate.len(), "Obtained certificate");

        self.gateway
            .register_tree(
                &prepared.tree,
                &self.config.bucket,
                prepared.size,
                &self.config.owner,
                &self.config.project_id,
                &certificate,
            )
            .await?;

        let completed_by_gateway = self
            .parallel_upload(
                &prepared.chunks,
                prepared.tree.chunk_hashes(),
                root_hash,
                on_progress,
            )
            .await?;

        info!(
            blob_hash = %hash_string,
            chunks = prepared.chunks.len(),
            completed_by_gateway,
            "Blob upload finished"
        );

        Ok(PutFileResult {
            hash: root_hash,
            size: prepared.size,
            chunk_count: prepared.chunks.len(),
            completed_by_gateway,
        })
    }

    /// Upload every chunk with `max_concurrent_uploads` workers.
    ///
    /// Worker `w` takes chunks `w, w + N, w + 2N, ...` in order; workers run
    /// concurrently, so chunks land at the gateway in no particular order.
    async fn parallel_upload(
        &self,
        chunks: &[Chunk],
        chunk_hashes: &[ContentHash],
        blob_root_hash: ContentHash,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<bool> {
        let total = chunks.len();
        if total == 0 {
            if let Some(report) = on_progress {
                report(100);
            }
            return Ok(false);
        }

        let workers = self.config.upload.max_concurrent_uploads;
        let completed = AtomicUsize::new(0);
        let completed = &completed;

        let tasks = (0..workers).map(move |worker_id| async move {
            let mut blob_complete = false;
            for chunk in chunks.iter().skip(worker_id).step_by(workers) {
                let result = self
                    .gateway
                    .upload_chunk(UploadChunkParams {
                        blob_root_hash,
                        chunk_hash: chunk_hashes[chunk.index],
                        chunk_index: chunk.index,
                        chunk_data: chunk.data.clone(),
                        bucket_name: &self.config.bucket,
                        owner: &self.config.owner,
                        project_id: &self.config.project_id,
                    })
                    .await?;
                blob_complete |= result.is_complete;

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(report) = on_progress {
                    report(progress_percentage(done, total));
                }
            }
            Ok::<bool, StorageError>(blob_complete)
        });

        let results = try_join_all(tasks).await?;
        Ok(results.into_iter().any(|complete| complete))
    }
}

/// `done / total` as a rounded percentage.
fn progress_percentage(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}
