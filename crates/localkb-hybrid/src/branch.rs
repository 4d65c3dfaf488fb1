//! Candidate ranking for a single retrieval branch.

use std::collections::{HashMap, HashSet};

use localkb_core::types::Chunk;

/// Position a chunk earned in one branch, plus the row it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchRank {
    pub rank: usize,
    pub row: usize,
}

/// Ranks assigned by one branch, kept in assignment order.
#[derive(Debug, Clone, Default)]
pub struct BranchRanking {
    order: Vec<String>,
    ranks: HashMap<String, BranchRank>,
}

impl BranchRanking {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, chunk_id: &str) -> Option<BranchRank> {
        self.ranks.get(chunk_id).copied()
    }

    pub fn rank(&self, chunk_id: &str) -> Option<usize> {
        self.get(chunk_id).map(|r| r.rank)
    }

    /// `(chunk_id, rank)` in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, BranchRank)> + '_ {
        self.order.iter().map(|id| (id.as_str(), self.ranks[id]))
    }
}

/// How many candidates to request from a branch: the larger of the pool
/// size and five times `topk`, never more than the branch holds.
pub fn fetch_size(available: usize, pool: usize, topk: usize) -> usize {
    pool.max(topk.saturating_mul(5)).min(available)
}

/// Walk `candidates` (row indices, best first) and hand out 1-based ranks.
///
/// Rows outside `chunks`, rows whose namespace is not in `allowed`, and
/// chunk ids that already hold a rank are skipped without consuming a rank.
/// Stops after `pool` ranks.
pub fn rank_candidates<I>(
    candidates: I,
    chunks: &[Chunk],
    allowed: Option<&HashSet<String>>,
    pool: usize,
) -> BranchRanking
where
    I: IntoIterator<Item = usize>,
{
    let mut ranking = BranchRanking::default();
    for row in candidates {
        if ranking.len() >= pool {
            break;
        }
        let Some(chunk) = chunks.get(row) else { continue };
        if allowed.is_some_and(|ns| !ns.contains(&chunk.namespace)) {
            continue;
        }
        if ranking.ranks.contains_key(&chunk.chunk_id) {
            continue;
        }
        let rank = ranking.order.len() + 1;
        ranking.ranks.insert(chunk.chunk_id.clone(), BranchRank { rank, row });
        ranking.order.push(chunk.chunk_id.clone());
    }
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, ns: &str) -> Chunk {
        Chunk {
            chunk_id: id.into(),
            source_path: format!("{ns}/{id}.md"),
            heading: "H".into(),
            content: "c".into(),
            namespace: ns.into(),
        }
    }

    #[test]
    fn skips_out_of_range_filtered_and_duplicate_rows() {
        let chunks = vec![chunk("a", "domain"), chunk("b", "project"), chunk("a", "domain"), chunk("c", "domain")];
        let allowed: HashSet<String> = ["domain".to_string()].into();
        let ranking = rank_candidates([7, 0, 1, 2, 3], &chunks, Some(&allowed), 10);
        let got: Vec<(&str, usize, usize)> = ranking.iter().map(|(id, r)| (id, r.rank, r.row)).collect();
        assert_eq!(got, vec![("a", 1, 0), ("c", 2, 3)]);
        assert_eq!(ranking.rank("b"), None);
    }

    #[test]
    fn stops_at_pool_size() {
        let chunks = vec![chunk("a", "x"), chunk("b", "x"), chunk("c", "x")];
        let ranking = rank_candidates([2, 1, 0], &chunks, None, 2);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking.rank("c"), Some(1));
        assert_eq!(ranking.rank("b"), Some(2));
        assert_eq!(ranking.rank("a"), None);
    }

    #[test]
    fn fetch_size_expands_with_topk_and_caps_at_corpus() {
        assert_eq!(fetch_size(100, 30, 6), 30);
        assert_eq!(fetch_size(100, 30, 8), 40);
        assert_eq!(fetch_size(12, 30, 8), 12);
        assert_eq!(fetch_size(0, 30, 8), 0);
    }
}
