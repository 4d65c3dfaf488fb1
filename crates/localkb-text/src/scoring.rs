//! BM25 scoring over the persisted token corpus, backed by the
//! [`bm25`](https://crates.io/crates/bm25) crate.
//!
//! Corpus rows reach this module already tokenized, so the crate's
//! tokenizer seam is fed pre-split text: tokens joined with NUL and split
//! back by [`Pretokenized`]. Queries take the same route after going
//! through [`crate::Tokenizer`].

use bm25::{Embedder, EmbedderBuilder, Scorer};
use tracing::instrument;

pub const K1: f32 = 1.5;
pub const B: f32 = 0.75;

const SEP: char = '\0';

/// Splits NUL-joined token rows back into their tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pretokenized;

impl bm25::Tokenizer for Pretokenized {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        input_text
            .split(SEP)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

fn join_tokens(tokens: &[String]) -> String {
    let mut out = String::with_capacity(tokens.iter().map(|t| t.len() + 1).sum());
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(SEP);
        }
        out.push_str(token);
    }
    out
}

/// BM25 embedder plus scorer fitted to one corpus. Documents are keyed by
/// their corpus index.
pub struct Bm25Scorer {
    embedder: Embedder<u32, Pretokenized>,
    scorer: Scorer<usize>,
    len: usize,
}

impl Bm25Scorer {
    #[instrument(skip_all, fields(docs = corpus.len()))]
    pub fn new(corpus: &[Vec<String>]) -> Self {
        let total: usize = corpus.iter().map(Vec::len).sum();
        // A corpus of empty rows still needs a positive length norm.
        let avgdl = if total == 0 { 1.0 } else { total as f32 / corpus.len() as f32 };
        let embedder = EmbedderBuilder::<u32, Pretokenized>::with_avgdl(avgdl)
            .k1(K1)
            .b(B)
            .build();

        let mut scorer = Scorer::<usize>::new();
        for (i, doc) in corpus.iter().enumerate() {
            scorer.upsert(&i, embedder.embed(&join_tokens(doc)));
        }

        Self { embedder, scorer, len: corpus.len() }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One score per document, in corpus order; rows sharing no term with
    /// the query score zero.
    pub fn get_scores(&self, query: &[String]) -> Vec<f32> {
        if query.is_empty() {
            return vec![0.0; self.len];
        }
        let query = self.embedder.embed(&join_tokens(query));
        (0..self.len)
            .map(|i| self.scorer.score(&i, &query).unwrap_or(0.0))
            .collect()
    }

    /// The `k` best `(index, score)` pairs; equal scores keep corpus order.
    pub fn top_k(&self, query: &[String], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self.get_scores(query).into_iter().enumerate().collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm25::Tokenizer as _;

    fn docs(raw: &[&str]) -> Vec<Vec<String>> {
        raw.iter().map(|d| d.split_whitespace().map(str::to_string).collect()).collect()
    }

    fn q(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn pretokenized_rows_split_back_exactly() {
        let tokens = vec!["snake_case".to_string(), "知识".to_string(), "库".to_string()];
        assert_eq!(Pretokenized.tokenize(&join_tokens(&tokens)), tokens);
        assert!(Pretokenized.tokenize("").is_empty());
    }

    #[test]
    fn matching_document_outranks_non_matching() {
        let bm25 = Bm25Scorer::new(&docs(&["rust borrow checker", "python garbage collector", "go channels"]));
        let top = bm25.top_k(&q("borrow"), 3);
        assert_eq!(top.len(), 3, "every document is ranked");
        assert_eq!(top[0].0, 0);
        assert!(top[0].1 > 0.0);
        assert_eq!(top[1].1, 0.0);
        assert_eq!(top[2].1, 0.0);
    }

    #[test]
    fn term_present_everywhere_still_scores_positive() {
        let bm25 = Bm25Scorer::new(&docs(&["the cat", "the dog", "the bird", "fish"]));
        let scores = bm25.get_scores(&q("the"));
        assert!(scores[0] > 0.0);
        assert_eq!(scores[3], 0.0);
        let rare = bm25.get_scores(&q("cat"));
        assert!(rare[0] > scores[0], "rarer terms weigh more");
    }

    #[test]
    fn longer_documents_are_penalised() {
        let bm25 = Bm25Scorer::new(&docs(&["k pad pad pad pad pad", "k", "other"]));
        let scores = bm25.get_scores(&q("k"));
        assert!(scores[1] > scores[0]);
    }

    #[test]
    fn ties_keep_corpus_order() {
        let bm25 = Bm25Scorer::new(&docs(&["same x", "same y", "else", "more", "other"]));
        let top = bm25.top_k(&q("same"), 3);
        assert!(top[0].1 > 0.0);
        assert_eq!(top[0].1, top[1].1);
        assert_eq!(top.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn truncates_to_k() {
        let bm25 = Bm25Scorer::new(&docs(&["a", "b", "c", "d"]));
        assert_eq!(bm25.top_k(&q("a"), 2).len(), 2);
        assert!(bm25.top_k(&q("a"), 0).is_empty());
    }

    #[test]
    fn empty_corpus_scores_nothing() {
        let bm25 = Bm25Scorer::new(&[]);
        assert!(bm25.is_empty());
        assert!(bm25.top_k(&q("anything"), 5).is_empty());
    }

    #[test]
    fn corpus_of_empty_documents_scores_zero() {
        let bm25 = Bm25Scorer::new(&[Vec::new(), Vec::new()]);
        assert_eq!(bm25.get_scores(&q("x")), vec![0.0, 0.0]);
    }
}
