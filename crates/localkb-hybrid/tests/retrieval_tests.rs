use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use localkb_core::config::{EncoderKind, KbConfig};
use localkb_core::paths::KbPaths;
use localkb_core::store::load_index_meta;
use localkb_core::traits::{BuildReporter, NoopReporter};
use localkb_core::types::Chunk;
use localkb_core::KbError;
use localkb_embed::HashEncoder;
use localkb_hybrid::{build_knowledge_base, write_pack_and_trace, RetrieveOptions, Retriever, Trace};
use localkb_text::Tokenizer;
use localkb_vector::{save_index, FlatIpIndex};

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn hash_config() -> KbConfig {
    let mut config = KbConfig::default();
    config.embed.encoder = EncoderKind::Hash;
    config.embed.hash_dim = 128;
    config.embed.batch_size = 3;
    config
}

/// Four chunks across `domain`, `project` and the default namespace.
fn seeded_project() -> (TempDir, KbPaths) {
    let dir = TempDir::new().unwrap();
    let paths = KbPaths::new(dir.path());
    let raw = paths.kb_raw();
    write(
        &raw,
        "domain/rules.md",
        "# Refunds\nCustomers may request a refund within 30 days of purchase.\n\
         ## Exceptions\nDigital goods are not refundable once downloaded.\n",
    );
    write(&raw, "project/notes.md", "# Roadmap\nThe project will automate refund approvals next quarter.\n");
    write(&raw, "misc.txt", "Unrelated gardening tips about tomatoes.");
    (dir, paths)
}

fn build(paths: &KbPaths, encoder: &HashEncoder) {
    build_knowledge_base(paths, &hash_config(), encoder, &Tokenizer::new(), &NoopReporter).unwrap();
}

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<String>>,
}

impl BuildReporter for Recorder {
    fn chunks_collected(&self, chunks: &[Chunk]) -> anyhow::Result<()> {
        self.events.borrow_mut().push(format!("chunks {}", chunks.len()));
        Ok(())
    }
    fn batch_encoded(&self, done: usize, total: usize) -> anyhow::Result<()> {
        self.events.borrow_mut().push(format!("batch {done}/{total}"));
        Ok(())
    }
    fn artifact_written(&self, label: &str, path: &Path) -> anyhow::Result<()> {
        assert!(path.exists(), "{label} reported before it was written");
        self.events.borrow_mut().push(format!("wrote {label}"));
        Ok(())
    }
}

struct FailingReporter;

impl BuildReporter for FailingReporter {
    fn artifact_written(&self, _label: &str, _path: &Path) -> anyhow::Result<()> {
        anyhow::bail!("terminal went away")
    }
}

#[test]
fn build_reports_every_stage_and_writes_metadata() {
    let (_dir, paths) = seeded_project();
    let encoder = HashEncoder::new(128);
    let recorder = Recorder::default();
    let summary = build_knowledge_base(&paths, &hash_config(), &encoder, &Tokenizer::new(), &recorder).unwrap();

    assert_eq!(summary.num_chunks, 4);
    assert_eq!(summary.dim, 128);
    assert_eq!(summary.artifacts.len(), 4);
    assert_eq!(
        *recorder.events.borrow(),
        vec![
            "chunks 4",
            "batch 3/4",
            "batch 4/4",
            "wrote vector index",
            "wrote chunks",
            "wrote index metadata",
            "wrote lexical corpus",
        ]
    );

    let meta = load_index_meta(&paths.index_meta()).unwrap().expect("meta");
    assert_eq!(meta.model, "hash-128");
    assert_eq!(meta.num_chunks, 4);
    assert_eq!(meta.dim, Some(128));
    assert!(meta.source_root.ends_with(".localkb/kb/raw"));
    assert!(meta.built_at.is_some());
}

#[test]
fn reporter_failure_aborts_the_build() {
    let (_dir, paths) = seeded_project();
    let err = build_knowledge_base(&paths, &hash_config(), &HashEncoder::new(128), &Tokenizer::new(), &FailingReporter)
        .unwrap_err();
    assert!(matches!(err, KbError::Operation(msg) if msg.contains("terminal went away")));
}

#[test]
fn empty_raw_directory_is_not_found() {
    let dir = TempDir::new().unwrap();
    let paths = KbPaths::new(dir.path());
    let err = build_knowledge_base(&paths, &hash_config(), &HashEncoder::new(128), &Tokenizer::new(), &NoopReporter)
        .unwrap_err();
    assert!(matches!(err, KbError::NotFound(_)));
    assert!(!paths.vector_index().exists());
}

#[test]
fn hybrid_hits_carry_both_ranks_and_sorted_scores() {
    let (_dir, paths) = seeded_project();
    let encoder = HashEncoder::new(128);
    build(&paths, &encoder);

    let retriever = Retriever::open(&paths, &encoder, Arc::new(Tokenizer::new())).unwrap().with_query_prefix("query: ");
    let hits = retriever.retrieve("refund purchase", &RetrieveOptions::default().with_topk(10)).unwrap();

    assert_eq!(hits.len(), 4);
    assert!(hits.windows(2).all(|w| w[0].fused_score >= w[1].fused_score));
    assert!(hits.iter().all(|h| h.vec_rank.is_some() && h.bm25_rank.is_some()));
    assert_eq!(hits[0].chunk.heading, "Refunds");
    assert_eq!(hits[0].bm25_rank, Some(1));
}

#[test]
fn namespace_filter_never_leaks_other_namespaces() {
    let (_dir, paths) = seeded_project();
    let encoder = HashEncoder::new(128);
    build(&paths, &encoder);

    let retriever = Retriever::open(&paths, &encoder, Arc::new(Tokenizer::new())).unwrap();
    let options = RetrieveOptions::default().with_topk(10).with_namespaces(["domain", " "]);
    let hits = retriever.retrieve("refund approvals", &options).unwrap();

    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.chunk.namespace == "domain"));

    let none = retriever
        .retrieve("refund", &RetrieveOptions::default().with_namespaces(["nowhere"]))
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn missing_vector_index_degrades_to_lexical_only() {
    let (_dir, paths) = seeded_project();
    let encoder = HashEncoder::new(128);
    build(&paths, &encoder);
    fs::remove_file(paths.vector_index()).unwrap();

    let retriever = Retriever::open(&paths, &encoder, Arc::new(Tokenizer::new())).unwrap();
    let hits = retriever.retrieve("tomatoes", &RetrieveOptions::default()).unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.vec_rank.is_none()));
    assert_eq!(hits[0].chunk.content, "Unrelated gardening tips about tomatoes.");
    assert_eq!(hits[0].fused_score, 1.0 / 61.0);
}

#[test]
fn empty_inputs_yield_no_hits() {
    let dir = TempDir::new().unwrap();
    let paths = KbPaths::new(dir.path());
    let encoder = HashEncoder::new(128);
    let retriever = Retriever::open(&paths, &encoder, Arc::new(Tokenizer::new())).unwrap();
    assert!(retriever.retrieve("anything", &RetrieveOptions::default()).unwrap().is_empty());

    let (_dir, paths) = seeded_project();
    build(&paths, &encoder);
    fs::remove_file(paths.vector_index()).unwrap();
    let retriever = Retriever::open(&paths, &encoder, Arc::new(Tokenizer::new())).unwrap();
    assert!(retriever.retrieve("?!", &RetrieveOptions::default()).unwrap().is_empty());
}

#[test]
fn empty_corpus_file_drops_the_lexical_branch() {
    let (_dir, paths) = seeded_project();
    let encoder = HashEncoder::new(128);
    build(&paths, &encoder);
    fs::write(paths.bm25_corpus_jsonl(), "").unwrap();

    let retriever = Retriever::open(&paths, &encoder, Arc::new(Tokenizer::new())).unwrap();
    let hits = retriever.retrieve("refund purchase", &RetrieveOptions::default()).unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.bm25_rank.is_none() && h.vec_rank.is_some()));
}

#[test]
fn zero_row_vector_index_drops_the_vector_branch() {
    let (_dir, paths) = seeded_project();
    let encoder = HashEncoder::new(128);
    build(&paths, &encoder);
    save_index(&FlatIpIndex::new(128), &paths.vector_index()).unwrap();

    let retriever = Retriever::open(&paths, &encoder, Arc::new(Tokenizer::new())).unwrap();
    let hits = retriever.retrieve("tomatoes", &RetrieveOptions::default()).unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.vec_rank.is_none()));
}

#[test]
fn truncated_corpus_is_misaligned() {
    let (_dir, paths) = seeded_project();
    let encoder = HashEncoder::new(128);
    build(&paths, &encoder);
    let corpus = fs::read_to_string(paths.bm25_corpus_jsonl()).unwrap();
    fs::write(paths.bm25_corpus_jsonl(), corpus.lines().next().unwrap()).unwrap();

    let err = Retriever::open(&paths, &encoder, Arc::new(Tokenizer::new())).err().expect("misaligned");
    assert!(matches!(err, KbError::Misaligned { store: "lexical corpus", expected: 4, actual: 1 }));
}

#[test]
fn rebuild_is_deterministic_and_pack_round_trips() {
    let (_dir, paths) = seeded_project();
    let encoder = HashEncoder::new(128);
    build(&paths, &encoder);
    let first = fs::read_to_string(paths.chunks_jsonl()).unwrap();
    build(&paths, &encoder);
    assert_eq!(first, fs::read_to_string(paths.chunks_jsonl()).unwrap());

    let retriever = Retriever::open(&paths, &encoder, Arc::new(Tokenizer::new())).unwrap();
    let hits = retriever.retrieve("refund", &RetrieveOptions::default().with_topk(2)).unwrap();
    write_pack_and_trace(&paths, "refund", &hits).unwrap();

    let md = fs::read_to_string(paths.knowledge_pack_md()).unwrap();
    assert!(md.starts_with("# Knowledge Pack (auto-generated)\n\n**Query**: refund\n"));
    assert!(md.contains("[E2]"));
    let trace: Trace = serde_json::from_str(&fs::read_to_string(paths.trace_json()).unwrap()).unwrap();
    assert_eq!(trace.topk, 2);
    assert_eq!(trace.hits[0].chunk_id, hits[0].chunk.chunk_id);
    assert_eq!(trace.hits[1].evidence, "E2");
}
