//! localkb-text
//!
//! Lexical side of retrieval: language-aware tokenization, BM25 scoring
//! through the `bm25` crate, and the token corpus persisted alongside the
//! chunk store.

pub mod corpus;
pub mod index;
pub mod scoring;
pub mod tokenizer;

pub use corpus::{build_corpus, load_corpus, save_corpus, CorpusRecord, LexicalCorpus};
pub use index::LexicalIndex;
pub use scoring::Bm25Scorer;
pub use tokenizer::Tokenizer;
