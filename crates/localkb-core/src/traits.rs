//! Capability seams between the orchestrator and the engines it drives.

use crate::types::Chunk;

/// Text-to-vector encoder. Implementations are chosen once, at construction
/// time, and must return unit-normalised rows of exactly `dim()` entries.
pub trait Encoder: Send + Sync {
    /// Stable identifier recorded in the index metadata.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn encode(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Ranked lexical search over a corpus aligned with the chunk list.
pub trait LexicalRanker: Send + Sync {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// `(row index, score)` pairs, best first, at most `k` of them.
    fn search(&self, query: &str, k: usize) -> Vec<(usize, f32)>;
}

/// Scores and row indices returned by a similarity search, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighbors {
    pub scores: Vec<f32>,
    pub indices: Vec<usize>,
}

impl Neighbors {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Nearest-neighbour search over vectors aligned with the chunk list.
pub trait VectorRanker: Send + Sync {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn search(&self, query: &[f32], k: usize) -> crate::Result<Neighbors>;
}

/// Progress sink for the index build. Every callback may fail; the build
/// stops on the first error instead of swallowing it.
pub trait BuildReporter {
    fn chunks_collected(&self, _chunks: &[Chunk]) -> anyhow::Result<()> {
        Ok(())
    }
    fn batch_encoded(&self, _done: usize, _total: usize) -> anyhow::Result<()> {
        Ok(())
    }
    fn artifact_written(&self, _label: &str, _path: &std::path::Path) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl BuildReporter for NoopReporter {}
