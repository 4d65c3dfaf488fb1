//! Reciprocal Rank Fusion: score = Σ 1/(k + rank_i)

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::branch::BranchRanking;

/// Smoothing constant.
pub const RRF_K: f64 = 60.0;

/// One chunk after fusion. `row` indexes the chunk list.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedEntry {
    pub chunk_id: String,
    pub row: usize,
    pub score: f64,
    pub vec_rank: Option<usize>,
    pub bm25_rank: Option<usize>,
}

/// Fuse the two branch rankings and keep the best `topk`.
///
/// Sorted by fused score descending; equal scores are ordered by chunk id
/// ascending.
pub fn reciprocal_rank_fusion(vector: &BranchRanking, lexical: &BranchRanking, topk: usize) -> Vec<FusedEntry> {
    let mut fused: HashMap<&str, FusedEntry> = HashMap::new();

    for (id, r) in vector.iter() {
        let entry = fused.entry(id).or_insert_with(|| FusedEntry {
            chunk_id: id.to_string(),
            row: r.row,
            score: 0.0,
            vec_rank: None,
            bm25_rank: None,
        });
        entry.score += 1.0 / (RRF_K + r.rank as f64);
        entry.vec_rank = Some(r.rank);
    }
    for (id, r) in lexical.iter() {
        let entry = fused.entry(id).or_insert_with(|| FusedEntry {
            chunk_id: id.to_string(),
            row: r.row,
            score: 0.0,
            vec_rank: None,
            bm25_rank: None,
        });
        entry.score += 1.0 / (RRF_K + r.rank as f64);
        entry.bm25_rank = Some(r.rank);
    }

    let mut entries: Vec<FusedEntry> = fused.into_values().collect();
    entries.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.chunk_id.cmp(&b.chunk_id),
        other => other,
    });
    entries.truncate(topk);
    entries
}
