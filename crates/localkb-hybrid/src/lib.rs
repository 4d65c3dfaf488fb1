//! localkb-hybrid
//!
//! Runs the vector and lexical branches, fuses their rankings with
//! Reciprocal Rank Fusion, builds the on-disk indices, and renders the
//! knowledge pack and trace.

pub mod branch;
pub mod builder;
pub mod fusion;
pub mod pack;
pub mod retriever;

pub use builder::{build_knowledge_base, BuildSummary};
pub use fusion::{reciprocal_rank_fusion, FusedEntry, RRF_K};
pub use pack::{render_knowledge_pack, write_pack_and_trace, Trace, TraceHit};
pub use retriever::{RetrieveOptions, Retriever};
