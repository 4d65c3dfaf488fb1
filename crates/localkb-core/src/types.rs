//! Domain types shared by the chunker, both retrieval branches and the
//! renderer.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Namespace assigned to documents sitting directly under the ingestion root,
/// and to persisted records that predate namespaces.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Heading label used when a document has no Markdown headings at all.
pub const DEFAULT_HEADING: &str = "Document";

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// The minimal retrievable unit: one heading section, or one fixed-size
/// window of an oversized section.
///
/// - `chunk_id`: short digest of `source_path`, `heading` and the first 200
///   characters of `content`; stable across rebuilds
/// - `source_path`: forward-slash path of the originating file
/// - `heading`: `" > "`-joined path of enclosing section titles
/// - `namespace`: top-level directory under the ingestion root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub source_path: String,
    pub heading: String,
    pub content: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// One fused result. A branch rank is `None` when the chunk never made it
/// into that branch's filtered candidate pool; that is distinct from any
/// numeric rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub fused_score: f64,
    pub chunk: Chunk,
    pub vec_rank: Option<usize>,
    pub bm25_rank: Option<usize>,
}

/// Build metadata written next to the indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub model: String,
    pub num_chunks: usize,
    pub source_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dim: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<String>,
}
