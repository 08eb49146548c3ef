//! ICFS storage command line
//!
//! ## Usage
//!
//! ```bash
//! # Compute a file's content address offline
//! icfs-storage hash photo.jpg
//!
//! # Also print the blob tree JSON that would be registered
//! icfs-storage hash photo.jpg --tree
//!
//! # Upload a file, asking a backend endpoint for the write certificate
//! icfs-storage --config icfs.toml put photo.jpg --certificate-url https://backend/cert
//!
//! # Retrieval URL for a stored blob
//! icfs-storage --config icfs.toml url sha256:...
//! ```

use clap::{Parser, Subcommand};
use icfs_storage_client::{HttpCertificateProvider, StorageClient, StorageConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "icfs-storage")]
#[command(about = "Upload and address blobs on an ICFS storage gateway")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage gateway base URL
    #[arg(long, env = "ICFS_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Bucket name
    #[arg(long, env = "ICFS_BUCKET")]
    bucket: Option<String>,

    /// Blob owner identity
    #[arg(long, env = "ICFS_OWNER")]
    owner: Option<String>,

    /// Project ID
    #[arg(long, env = "ICFS_PROJECT_ID")]
    project_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the content address of a file without uploading it
    Hash {
        file: PathBuf,

        /// Print the blob tree JSON as well
        #[arg(long)]
        tree: bool,
    },

    /// Upload a file and print its content address
    Put {
        file: PathBuf,

        /// Endpoint that issues write certificates for a blob hash
        #[arg(long, env = "ICFS_CERTIFICATE_URL")]
        certificate_url: String,

        /// Bearer token for the certificate endpoint
        #[arg(long, env = "ICFS_CERTIFICATE_TOKEN")]
        certificate_token: Option<String>,
    },

    /// Print the direct retrieval URL for a blob hash
    Url { hash: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("icfs_storage_client=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        StorageConfig::load(config_path)?
    } else {
        StorageConfig::default()
    };

    // Apply CLI overrides
    if let Some(url) = args.gateway_url {
        config.gateway_url = url;
    }
    if let Some(bucket) = args.bucket {
        config.bucket = bucket;
    }
    if let Some(owner) = args.owner {
        config.owner = owner;
    }
    if let Some(project_id) = args.project_id {
        config.project_id = project_id;
    }

    match args.command {
        Command::Hash { file, tree } => {
            config.validate()?;
            let data = tokio::fs::read(&file).await?;
            let headers = icfs_storage_client::file_headers(data.len() as u64);
            let prepared = icfs_storage_client::compute_blob_tree(
                &bytes::Bytes::from(data),
                &headers,
                config.upload.chunk_size,
            )?;

            println!("{}", prepared.root_hash().to_sha_string());
            if tree {
                println!("{}", serde_json::to_string_pretty(&prepared.tree.to_json())?);
            }
        }
        Command::Put {
            file,
            certificate_url,
            certificate_token,
        } => {
            let mut certificates = HttpCertificateProvider::new(
                certificate_url,
                Duration::from_secs(config.request_timeout_secs),
            )?;
            if let Some(token) = certificate_token {
                certificates = certificates.with_api_key(token);
            }

            let client = StorageClient::new(config, Arc::new(certificates))?;
            let data = tokio::fs::read(&file).await?;

            info!(file = %file.display(), size = data.len(), "Uploading");
            let result = client
                .put_file(
                    data,
                    Some(&|pct: u32| info!(progress = pct, "Upload progress")),
                )
                .await?;

            println!("{}", result.hash.to_sha_string());
            println!("{}", client.get_direct_url(&result.hash.to_sha_string())?);
        }
        Command::Url { hash } => {
            let client = StorageClient::new(config, Arc::new(NoCertificates))?;
            println!("{}", client.get_direct_url(&hash)?);
        }
    }

    Ok(())
}

/// Provider for commands that never write
struct NoCertificates;

#[async_trait::async_trait]
impl icfs_storage_client::CertificateProvider for NoCertificates {
    async fn get_certificate(&self, _blob_hash: &str) -> icfs_storage_client::Result<Vec<u8>> {
        Err(icfs_storage_client::StorageError::Certificate(
            "read-only command".into(),
        ))
    }
}
