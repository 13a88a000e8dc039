//! Sift core types: cached records, ingest deltas, snapshots, store errors.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub type Uid = [u8; 16];

/// Annotation carrying a human-facing display name; consulted by fuzzy
/// name matching alongside the object name.
pub const DISPLAY_NAME_ANNOTATION: &str = "sift.dev/display-name";

/// Annotation recording who created the object. A non-empty value marks the
/// object as user-facing.
pub const CREATOR_ANNOTATION: &str = "sift.dev/creator";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeltaKind {
    Applied,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delta {
    pub uid: Uid,
    pub kind: DeltaKind,
    /// Raw object; only the `metadata` section is consulted when shaping records.
    pub raw: serde_json::Value,
}

/// Shaped record held by the cache. Owned and mutated by the store only; the
/// query layer reads a snapshot copy and never retains it past one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaObj {
    pub uid: Uid,
    pub namespace: Option<String>,
    pub name: String,
    pub creation_ts: i64,
    pub labels: SmallVec<[(String, String); 8]>,
    pub annotations: SmallVec<[(String, String); 4]>,
}

impl MetaObj {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Immutable once published; readers hold `Arc<CacheSnapshot>`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheSnapshot {
    pub epoch: u64,
    pub items: Vec<MetaObj>,
}

/// Failures surfaced by the store collaborator. The query layer introduces no
/// error kinds of its own; these propagate to callers unchanged.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum StoreError {
    #[error("retrieval: {0}")]
    Retrieval(String),
    #[error("not found: {scope}/{name}")]
    NotFound { scope: String, name: String },
}

/// Read API the query engine depends on. `scope` is a namespace-like
/// partition; the empty scope selects everything. `list` must return a
/// consistent snapshot safe for concurrent reads.
pub trait ObjectStore<T>: Send + Sync {
    fn list(&self, scope: &str) -> Result<Vec<T>, StoreError>;
    fn get(&self, scope: &str, name: &str) -> Result<T, StoreError>;
}

pub mod prelude {
    pub use super::{CacheSnapshot, Delta, DeltaKind, MetaObj, ObjectStore, StoreError, Uid};
}
