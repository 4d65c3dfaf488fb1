//! localkb-core
//!
//! Shared domain types, configuration, project paths, the heading-aware
//! chunker and the JSONL chunk store. Engines in the sibling crates depend on
//! the capability traits in [`traits`] rather than on each other.

pub mod chunker;
pub mod config;
pub mod error;
pub mod paths;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{KbError, Result};
pub use types::{Chunk, IndexMeta, RetrievalHit};
