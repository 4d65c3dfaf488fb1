//! Knowledge-pack (Markdown) and trace (JSON) rendering.

use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::instrument;

use localkb_core::paths::KbPaths;
use localkb_core::store::write_atomic;
use localkb_core::types::RetrievalHit;
use localkb_core::Result;

const NO_EVIDENCE: &str = "> No relevant evidence was found in the knowledge base. Proceed from the user \
input alone and record the evidence summary as \"no evidence retrieved from the knowledge base\".";

fn rank_label(rank: Option<usize>) -> String {
    rank.map_or_else(|| "None".to_string(), |r| r.to_string())
}

/// Render the human-readable evidence document. Always ends with exactly
/// one newline.
pub fn render_knowledge_pack(query: &str, hits: &[RetrievalHit]) -> String {
    let mut lines: Vec<String> = vec![
        "# Knowledge Pack (auto-generated)".into(),
        String::new(),
        format!("**Query**: {query}"),
        String::new(),
        "## Top Evidence".into(),
        String::new(),
    ];

    if hits.is_empty() {
        lines.push(NO_EVIDENCE.into());
    } else {
        for (i, hit) in hits.iter().enumerate() {
            let c = &hit.chunk;
            lines.push(format!(
                "### [E{}] {}  (hybrid={:.6} | vec_rank={} | bm25_rank={})",
                i + 1,
                c.heading,
                hit.fused_score,
                rank_label(hit.vec_rank),
                rank_label(hit.bm25_rank),
            ));
            lines.push(format!("Namespace: `{}`", c.namespace));
            lines.push(format!("Source: `{}`", c.source_path));
            lines.push(format!("Chunk ID: `{}`", c.chunk_id));
            lines.push(String::new());
            lines.push(c.content.trim().to_string());
            lines.push(String::new());
        }
        lines.push("## Evidence Trace Template".into());
        for (i, hit) in hits.iter().enumerate() {
            lines.push(format!("- [E{}] {} — {}", i + 1, hit.chunk.heading, hit.chunk.source_path));
        }
    }

    let mut out = lines.join("\n").trim().to_string();
    out.push('\n');
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHit {
    pub evidence: String,
    pub fused_score: f64,
    pub vec_rank: Option<usize>,
    pub bm25_rank: Option<usize>,
    pub chunk_id: String,
    pub heading: String,
    pub namespace: String,
    pub source_path: String,
}

/// Machine-readable mirror of the knowledge pack. `topk` is the number of
/// hits actually returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub query: String,
    pub topk: usize,
    pub hits: Vec<TraceHit>,
}

impl Trace {
    pub fn from_hits(query: &str, hits: &[RetrievalHit]) -> Self {
        let hits = hits
            .iter()
            .enumerate()
            .map(|(i, h)| TraceHit {
                evidence: format!("E{}", i + 1),
                fused_score: h.fused_score,
                vec_rank: h.vec_rank,
                bm25_rank: h.bm25_rank,
                chunk_id: h.chunk.chunk_id.clone(),
                heading: h.chunk.heading.clone(),
                namespace: h.chunk.namespace.clone(),
                source_path: h.chunk.source_path.clone(),
            })
            .collect::<Vec<_>>();
        Self { query: query.to_string(), topk: hits.len(), hits }
    }
}

/// Write `context/knowledge-pack.md` and `context/trace.json`.
#[instrument(skip(paths, hits), fields(hits = hits.len()))]
pub fn write_pack_and_trace(paths: &KbPaths, query: &str, hits: &[RetrievalHit]) -> Result<()> {
    paths.ensure_dirs()?;
    let pack = render_knowledge_pack(query, hits);
    write_atomic(&paths.knowledge_pack_md(), |w| w.write_all(pack.as_bytes()))?;
    let trace = Trace::from_hits(query, hits);
    write_atomic(&paths.trace_json(), |w| {
        serde_json::to_writer_pretty(&mut *w, &trace)?;
        w.write_all(b"\n")
    })
}
