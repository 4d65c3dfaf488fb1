use std::path::Path;
use std::sync::Arc;

use localkb_core::traits::LexicalRanker;
use localkb_core::Result;

use crate::scoring::Bm25Scorer;
use crate::corpus::{load_corpus, LexicalCorpus};
use crate::tokenizer::Tokenizer;

/// Searchable lexical index: the persisted corpus plus BM25 statistics
/// computed once at load.
pub struct LexicalIndex {
    corpus: LexicalCorpus,
    bm25: Bm25Scorer,
    tokenizer: Arc<Tokenizer>,
}

impl LexicalIndex {
    pub fn from_corpus(corpus: LexicalCorpus, tokenizer: Arc<Tokenizer>) -> Self {
        let bm25 = Bm25Scorer::new(&corpus.tokens);
        Self { corpus, bm25, tokenizer }
    }

    /// `Ok(None)` when no corpus has been built yet.
    pub fn open(path: &Path, tokenizer: Arc<Tokenizer>) -> Result<Option<Self>> {
        Ok(load_corpus(path)?.map(|corpus| Self::from_corpus(corpus, tokenizer)))
    }

    pub fn corpus(&self) -> &LexicalCorpus {
        &self.corpus
    }
}

impl LexicalRanker for LexicalIndex {
    fn len(&self) -> usize {
        self.corpus.len()
    }

    fn search(&self, query: &str, k: usize) -> Vec<(usize, f32)> {
        let tokens = self.tokenizer.tokenize(query);
        if tokens.is_empty() || k == 0 {
            return Vec::new();
        }
        self.bm25.top_k(&tokens, k)
    }
}
