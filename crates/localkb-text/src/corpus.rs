//! Token corpus aligned row-for-row with the chunk list.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

use localkb_core::store::{read_jsonl, write_jsonl};
use localkb_core::types::{Chunk, DEFAULT_NAMESPACE};
use localkb_core::{KbError, Result};

use crate::tokenizer::Tokenizer;

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// One persisted corpus row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// Three order-aligned columns loaded from the corpus store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexicalCorpus {
    pub tokens: Vec<Vec<String>>,
    pub chunk_ids: Vec<String>,
    pub namespaces: Vec<String>,
}

impl LexicalCorpus {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<CorpusRecord> for LexicalCorpus {
    fn from_iter<I: IntoIterator<Item = CorpusRecord>>(iter: I) -> Self {
        let mut corpus = Self::default();
        for record in iter {
            corpus.tokens.push(record.tokens);
            corpus.chunk_ids.push(record.chunk_id);
            corpus.namespaces.push(record.namespace);
        }
        corpus
    }
}

/// Tokenize every chunk's content, in chunk order.
pub fn build_corpus(chunks: &[Chunk], tokenizer: &Tokenizer) -> Vec<Vec<String>> {
    chunks.iter().map(|c| tokenizer.tokenize(&c.content)).collect()
}

#[instrument(skip(corpus, chunks), fields(rows = corpus.len()))]
pub fn save_corpus(corpus: &[Vec<String>], chunks: &[Chunk], path: &Path) -> Result<()> {
    if corpus.len() != chunks.len() {
        return Err(KbError::Misaligned { store: "lexical corpus", expected: chunks.len(), actual: corpus.len() });
    }
    let records: Vec<CorpusRecord> = corpus
        .iter()
        .zip(chunks)
        .map(|(tokens, chunk)| CorpusRecord {
            chunk_id: chunk.chunk_id.clone(),
            namespace: chunk.namespace.clone(),
            tokens: tokens.clone(),
        })
        .collect();
    write_jsonl(path, &records)
}

/// `Ok(None)` when the store does not exist.
pub fn load_corpus(path: &Path) -> Result<Option<LexicalCorpus>> {
    let Some(records) = read_jsonl::<CorpusRecord>(path)? else {
        return Ok(None);
    };
    let corpus: LexicalCorpus = records.into_iter().collect();
    debug!(rows = corpus.len(), path = %path.display(), "loaded lexical corpus");
    Ok(Some(corpus))
}
