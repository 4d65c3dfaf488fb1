use std::collections::HashSet;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, instrument};

use localkb_core::config::RetrievalConfig;
use localkb_core::paths::KbPaths;
use localkb_core::store::load_chunks_jsonl;
use localkb_core::traits::{Encoder, LexicalRanker, VectorRanker};
use localkb_core::types::{Chunk, RetrievalHit};
use localkb_core::{KbError, Result};
use localkb_text::{LexicalIndex, Tokenizer};
use localkb_vector::load_index;

use crate::branch::{fetch_size, rank_candidates, BranchRanking};
use crate::fusion::reciprocal_rank_fusion;

/// Per-query knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveOptions {
    pub topk: usize,
    /// `None` searches every namespace.
    pub namespaces: Option<HashSet<String>>,
    pub vec_candidates: usize,
    pub bm25_candidates: usize,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

impl RetrieveOptions {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            topk: config.topk,
            namespaces: None,
            vec_candidates: config.vec_candidates,
            bm25_candidates: config.bm25_candidates,
        }
    }

    pub fn with_topk(mut self, topk: usize) -> Self {
        self.topk = topk;
        self
    }

    /// Restrict to these namespaces. Blank names are dropped and an empty
    /// list clears the filter.
    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: HashSet<String> = namespaces
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self.namespaces = (!set.is_empty()).then_some(set);
        self
    }
}

/// Hybrid retriever over one chunk list and whichever branch indices exist.
///
/// Both indices must be row-aligned with the chunk list; a non-empty index
/// whose length differs is rejected at construction. Empty indices are
/// dropped and their branch contributes no ranks.
pub struct Retriever<'a> {
    chunks: Vec<Chunk>,
    lexical: Option<Box<dyn LexicalRanker>>,
    vector: Option<Box<dyn VectorRanker>>,
    encoder: &'a dyn Encoder,
    query_prefix: String,
}

impl<'a> Retriever<'a> {
    pub fn new(
        chunks: Vec<Chunk>,
        lexical: Option<Box<dyn LexicalRanker>>,
        vector: Option<Box<dyn VectorRanker>>,
        encoder: &'a dyn Encoder,
    ) -> Result<Self> {
        // A zero-row index is an absent branch, not a misaligned one.
        let lexical = lexical.filter(|lex| !lex.is_empty());
        let vector = vector.filter(|vec| !vec.is_empty());
        if !chunks.is_empty() {
            if let Some(lex) = &lexical {
                check_aligned("lexical corpus", chunks.len(), lex.len())?;
            }
            if let Some(vec) = &vector {
                check_aligned("vector index", chunks.len(), vec.len())?;
            }
        }
        Ok(Self { chunks, lexical, vector, encoder, query_prefix: String::new() })
    }

    /// Load the chunk store, corpus and vector index for `paths`. Missing
    /// files leave the corresponding branch empty.
    #[instrument(skip_all, fields(root = %paths.project_root().display()))]
    pub fn open(paths: &KbPaths, encoder: &'a dyn Encoder, tokenizer: Arc<Tokenizer>) -> Result<Self> {
        let chunks = load_chunks_jsonl(&paths.chunks_jsonl())?;
        let lexical = LexicalIndex::open(&paths.bm25_corpus_jsonl(), tokenizer)?
            .map(|idx| Box::new(idx) as Box<dyn LexicalRanker>);
        let vector = load_index(&paths.vector_index())?.map(|idx| Box::new(idx) as Box<dyn VectorRanker>);
        debug!(
            chunks = chunks.len(),
            lexical = lexical.is_some(),
            vector = vector.is_some(),
            "opened knowledge base"
        );
        Self::new(chunks, lexical, vector, encoder)
    }

    /// Prepended to the query before encoding.
    pub fn with_query_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.query_prefix = prefix.into();
        self
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Run both branches, fuse, and return at most `options.topk` hits.
    #[instrument(skip(self, options), fields(topk = options.topk))]
    pub fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<RetrievalHit>> {
        if self.chunks.is_empty() || options.topk == 0 {
            return Ok(Vec::new());
        }
        let (vector, lexical) = rayon::join(
            || self.vector_branch(query, options),
            || self.lexical_branch(query, options),
        );
        let vector = vector?;
        debug!(vector = vector.len(), lexical = lexical.len(), "branch candidates");

        let hits = reciprocal_rank_fusion(&vector, &lexical, options.topk)
            .into_iter()
            .filter_map(|entry| {
                let chunk = self.chunks.get(entry.row)?.clone();
                Some(RetrievalHit {
                    fused_score: entry.score,
                    chunk,
                    vec_rank: entry.vec_rank,
                    bm25_rank: entry.bm25_rank,
                })
            })
            .collect();
        Ok(hits)
    }

    fn vector_branch(&self, query: &str, options: &RetrieveOptions) -> Result<BranchRanking> {
        let Some(index) = self.vector.as_deref() else {
            return Ok(BranchRanking::default());
        };
        let text = format!("{}{}", self.query_prefix, query);
        let query_vec = self
            .encoder
            .encode(&[text])
            .map_err(KbError::Encoder)?
            .into_iter()
            .next()
            .ok_or_else(|| KbError::Encoder(anyhow!("encoder returned no vector for the query")))?;
        let k = fetch_size(self.chunks.len(), options.vec_candidates, options.topk);
        let neighbors = index.search(&query_vec, k)?;
        Ok(rank_candidates(
            neighbors.indices,
            &self.chunks,
            options.namespaces.as_ref(),
            options.vec_candidates,
        ))
    }

    fn lexical_branch(&self, query: &str, options: &RetrieveOptions) -> BranchRanking {
        let Some(index) = self.lexical.as_deref() else {
            return BranchRanking::default();
        };
        let k = fetch_size(index.len(), options.bm25_candidates, options.topk);
        let results = index.search(query, k);
        rank_candidates(
            results.into_iter().map(|(row, _score)| row),
            &self.chunks,
            options.namespaces.as_ref(),
            options.bm25_candidates,
        )
    }
}

fn check_aligned(store: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(KbError::Misaligned { store, expected, actual });
    }
    Ok(())
}
