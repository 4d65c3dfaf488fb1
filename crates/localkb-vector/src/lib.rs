//! localkb-vector
//!
//! Exhaustive inner-product index over unit-normalised embeddings, its
//! binary blob format, and save/load with an in-memory fallback path.

pub mod codec;
pub mod flat;
pub mod persist;

pub use flat::FlatIpIndex;
pub use persist::{load_index, load_index_bytes, save_index, save_index_bytes};
