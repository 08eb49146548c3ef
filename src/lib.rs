//! Chunked, content-addressed blob upload client for the ICFS storage gateway
//!
//! A payload is split into 1 MiB chunks. Each chunk is hashed with a
//! domain-separated SHA-256, and the chunk hashes are combined with a metadata
//! hash into a binary hash tree. The tree's root is the blob's content address.
//! Uploading registers the tree with the gateway, authorized by a certificate
//! from the blob owner, then sends the chunks concurrently with
//! retry-with-backoff.
//!
//! # Example
//!
//! ```rust,no_run
//! use icfs_storage_client::{CertificateProvider, StorageClient, StorageConfig};
//! use std::sync::Arc;
//!
//! struct Backend;
//!
//! #[async_trait::async_trait]
//! impl CertificateProvider for Backend {
//!     async fn get_certificate(&self, blob_hash: &str) -> icfs_storage_client::Result<Vec<u8>> {
//!         // Ask the owner's backend to sign `blob_hash`
//!         # let _ = blob_hash;
//!         Ok(Vec::new())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = StorageClient::new(StorageConfig::load("icfs.toml")?, Arc::new(Backend))?;
//! let result = client.put_file(std::fs::read("photo.jpg")?, None).await?;
//! println!("stored as {}", result.hash.to_sha_string());
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod chunker;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hash;
pub mod retry;
pub mod tree;

// Re-export main types
pub use certificate::{CertificateProvider, HttpCertificateProvider};
pub use chunker::{Chunk, DEFAULT_CHUNK_SIZE};
pub use client::{
    compute_blob_tree, file_headers, PreparedBlob, ProgressFn, PutFileResult, StorageClient,
};
pub use config::{StorageConfig, UploadConfig};
pub use error::{Result, StorageError};
pub use gateway::{ChunkUploadResult, GatewayClient, UploadChunkParams};
pub use hash::{validate_hash_format, ContentHash, Headers};
pub use retry::RetryConfig;
pub use tree::{BlobHashTree, BlobHashTreeJson, HashTreeNode, TreeNodeJson};
