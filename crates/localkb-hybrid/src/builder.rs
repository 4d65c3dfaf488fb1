use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, instrument};

use localkb_core::chunker::{to_posix, Chunker};
use localkb_core::config::KbConfig;
use localkb_core::paths::KbPaths;
use localkb_core::store::{save_chunks_jsonl, save_index_meta};
use localkb_core::traits::{BuildReporter, Encoder};
use localkb_core::types::IndexMeta;
use localkb_core::{KbError, Result};
use localkb_text::{build_corpus, save_corpus, Tokenizer};
use localkb_vector::{save_index, FlatIpIndex};

/// What a build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub num_chunks: usize,
    pub dim: usize,
    pub model: String,
    pub artifacts: Vec<PathBuf>,
}

fn reported(result: anyhow::Result<()>) -> Result<()> {
    result.map_err(|e| KbError::Operation(format!("progress reporter failed: {e:#}")))
}

/// Chunk everything under `kb/raw`, encode it, and publish the vector index,
/// chunk store, index metadata and lexical corpus.
///
/// Each artifact replaces its predecessor atomically; the set as a whole
/// does not. Fails with [`KbError::NotFound`] when there is nothing to index.
#[instrument(skip_all, fields(root = %paths.project_root().display(), model = encoder.model_id()))]
pub fn build_knowledge_base(
    paths: &KbPaths,
    config: &KbConfig,
    encoder: &dyn Encoder,
    tokenizer: &Tokenizer,
    reporter: &dyn BuildReporter,
) -> Result<BuildSummary> {
    paths.ensure_dirs()?;
    let raw = paths.kb_raw();
    let chunks = Chunker::new(config.chunking.clone()).collect_chunks(&raw)?;
    if chunks.is_empty() {
        return Err(KbError::NotFound(format!("no documents found in {}", raw.display())));
    }
    reported(reporter.chunks_collected(&chunks))?;

    let passages: Vec<String> = chunks
        .iter()
        .map(|c| format!("{}{}", config.embed.passage_prefix, c.content))
        .collect();
    let mut index = FlatIpIndex::new(encoder.dim());
    let mut done = 0;
    for batch in passages.chunks(config.embed.batch_size.max(1)) {
        let rows = encoder.encode(batch).map_err(KbError::Encoder)?;
        if rows.len() != batch.len() {
            return Err(KbError::Misaligned { store: "encoder output", expected: batch.len(), actual: rows.len() });
        }
        index.add(&rows)?;
        done += batch.len();
        reported(reporter.batch_encoded(done, passages.len()))?;
    }

    let mut artifacts = Vec::with_capacity(4);

    let index_path = paths.vector_index();
    save_index(&index, &index_path)?;
    reported(reporter.artifact_written("vector index", &index_path))?;
    artifacts.push(index_path);

    let chunks_path = paths.chunks_jsonl();
    save_chunks_jsonl(&chunks, &chunks_path)?;
    reported(reporter.artifact_written("chunks", &chunks_path))?;
    artifacts.push(chunks_path);

    let meta = IndexMeta {
        model: encoder.model_id().to_string(),
        num_chunks: chunks.len(),
        source_root: to_posix(&raw),
        dim: Some(encoder.dim()),
        built_at: Some(Utc::now().to_rfc3339()),
    };
    let meta_path = paths.index_meta();
    save_index_meta(&meta, &meta_path)?;
    reported(reporter.artifact_written("index metadata", &meta_path))?;
    artifacts.push(meta_path);

    let corpus = build_corpus(&chunks, tokenizer);
    let corpus_path = paths.bm25_corpus_jsonl();
    save_corpus(&corpus, &chunks, &corpus_path)?;
    reported(reporter.artifact_written("lexical corpus", &corpus_path))?;
    artifacts.push(corpus_path);

    info!(chunks = chunks.len(), dim = encoder.dim(), "knowledge base built");
    Ok(BuildSummary { num_chunks: chunks.len(), dim: encoder.dim(), model: meta.model, artifacts })
}
