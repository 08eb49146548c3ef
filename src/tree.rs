//! Blob hash tree (DSBMTWH: domain-separated binary Merkle tree with headers)
//!
//! Leaves are chunk hashes in payload order. Each level pairs adjacent nodes
//! left to right; a trailing unpaired node is hashed against the `UNBALANCED`
//! sentinel. When metadata headers are present, the published root is
//! `node(chunks_root, metadata_leaf)` instead of the bare chunk root.

use crate::error::Result;
use crate::hash::{validate_hash_format, ContentHash, Headers};
use serde::{Deserialize, Serialize};

/// Wire identifier of the tree layout
pub const TREE_TYPE: &str = "DSBMTWH";

/// Leaf hash used for a zero-length blob.
///
/// Protocol constant shared with stored trees; equal to the chunk hash of an
/// empty chunk, but never recomputed.
pub const EMPTY_BLOB_PLACEHOLDER_HEX: &str =
    "8b8e620f084e48da0be2287fd12c5aaa4dbe14b468fd2e360f48d741fe7628a0";

const EMPTY_BLOB_PLACEHOLDER: [u8; 32] = [
    0x8b, 0x8e, 0x62, 0x0f, 0x08, 0x4e, 0x48, 0xda, 0x0b, 0xe2, 0x28, 0x7f, 0xd1, 0x2c, 0x5a, 0xaa,
    0x4d, 0xbe, 0x14, 0xb4, 0x68, 0xfd, 0x2e, 0x36, 0x0f, 0x48, 0xd7, 0x41, 0xfe, 0x76, 0x28, 0xa0,
];

/// Placeholder leaf for an empty blob.
pub fn empty_blob_placeholder() -> ContentHash {
    ContentHash::from_bytes(EMPTY_BLOB_PLACEHOLDER)
}

/// Binary tree node; leaves have no children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTreeNode {
    pub hash: ContentHash,
    pub left: Option<Box<HashTreeNode>>,
    pub right: Option<Box<HashTreeNode>>,
}

impl HashTreeNode {
    pub fn leaf(hash: ContentHash) -> Self {
        Self {
            hash,
            left: None,
            right: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn to_json(&self) -> TreeNodeJson {
        TreeNodeJson {
            hash: self.hash.to_sha_string(),
            left: self.left.as_ref().map(|n| Box::new(n.to_json())),
            right: self.right.as_ref().map(|n| Box::new(n.to_json())),
        }
    }
}

/// Hash tree over a blob's chunks and metadata, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHashTree {
    chunk_hashes: Vec<ContentHash>,
    tree: HashTreeNode,
    headers: Vec<String>,
}

impl BlobHashTree {
    /// Build the tree for `chunk_hashes` (payload order) and `headers`.
    ///
    /// No chunk hashes means an empty blob: the placeholder leaf is used and
    /// also recorded as the single chunk hash.
    pub fn build(chunk_hashes: Vec<ContentHash>, headers: &Headers) -> Self {
        let chunk_hashes = if chunk_hashes.is_empty() {
            vec![empty_blob_placeholder()]
        } else {
            chunk_hashes
        };

        let mut level: Vec<HashTreeNode> =
            chunk_hashes.iter().copied().map(HashTreeNode::leaf).collect();

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut nodes = level.into_iter();
            while let Some(left) = nodes.next() {
                let right = nodes.next();
                let hash =
                    ContentHash::from_nodes(Some(&left.hash), right.as_ref().map(|r| &r.hash));
                next.push(HashTreeNode {
                    hash,
                    left: Some(Box::new(left)),
                    right: right.map(Box::new),
                });
            }
            level = next;
        }

        let chunks_root = match level.pop() {
            Some(root) => root,
            None => HashTreeNode::leaf(empty_blob_placeholder()),
        };

        let tree = if headers.is_empty() {
            chunks_root
        } else {
            let metadata = HashTreeNode::leaf(ContentHash::from_headers(headers));
            HashTreeNode {
                hash: ContentHash::from_nodes(Some(&chunks_root.hash), Some(&metadata.hash)),
                left: Some(Box::new(chunks_root)),
                right: Some(Box::new(metadata)),
            }
        };

        let mut header_lines: Vec<String> = headers
            .iter()
            .map(|(key, value)| format!("{}: {}", key.trim(), value.trim()))
            .collect();
        header_lines.sort();

        Self {
            chunk_hashes,
            tree,
            headers: header_lines,
        }
    }

    /// Published root hash, the blob's content address.
    pub fn root_hash(&self) -> ContentHash {
        self.tree.hash
    }

    pub fn root(&self) -> &HashTreeNode {
        &self.tree
    }

    pub fn chunk_hashes(&self) -> &[ContentHash] {
        &self.chunk_hashes
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_hashes.len()
    }

    /// Sorted `"key: value"` header lines.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Transport form with every hash rendered as `sha256:<hex>`.
    pub fn to_json(&self) -> BlobHashTreeJson {
        BlobHashTreeJson {
            tree_type: TREE_TYPE.to_string(),
            chunk_hashes: self.chunk_hashes.iter().map(ContentHash::to_sha_string).collect(),
            tree: self.tree.to_json(),
            headers: self.headers.clone(),
        }
    }
}

/// Serialized tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNodeJson {
    pub hash: String,
    pub left: Option<Box<TreeNodeJson>>,
    pub right: Option<Box<TreeNodeJson>>,
}

impl TreeNodeJson {
    fn validate(&self, context: &str) -> Result<()> {
        validate_hash_format(&self.hash, context)?;
        if let Some(left) = &self.left {
            left.validate(context)?;
        }
        if let Some(right) = &self.right {
            right.validate(context)?;
        }
        Ok(())
    }
}

/// Serialized blob hash tree, as sent to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobHashTreeJson {
    pub tree_type: String,
    pub chunk_hashes: Vec<String>,
    pub tree: TreeNodeJson,
    pub headers: Vec<String>,
}

impl BlobHashTreeJson {
    /// Check the root, every node and every chunk hash for canonical format.
    pub fn validate(&self) -> Result<()> {
        validate_hash_format(&self.tree.hash, "uploadBlobTree root hash")?;
        self.tree.validate("uploadBlobTree tree node")?;
        for (index, hash) in self.chunk_hashes.iter().enumerate() {
            validate_hash_format(hash, &format!("uploadBlobTree chunk_hash[{}]", index))?;
        }
        Ok(())
    }
}
