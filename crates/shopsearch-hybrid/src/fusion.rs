use std::collections::{HashMap, HashSet};

use shopsearch_core::SearchHit;

/// Elasticsearch's default `rank_constant`.
pub const DEFAULT_RANK_CONSTANT: u32 = 60;

/// Contribution of a 1-based `rank` to an item's fused score.
pub fn rrf_contribution(rank: usize, rank_constant: u32) -> f64 { 1.0 / (rank as f64 + f64::from(rank_constant)) }

struct Fused {
    hit: SearchHit,
    score: f64,
    best_rank: usize,
}

/// Reciprocal rank fusion over ranked hit lists.
///
/// An item's score is the sum of `1/(rank + rank_constant)` over the lists it
/// appears in; absent lists contribute nothing. Only the first occurrence of
/// an id within one list counts. Ties break by best single-list rank, then by
/// first appearance across `lists` in order. Returned hits carry the fused
/// score; at most `limit` are returned.
pub fn reciprocal_rank_fusion(lists: &[Vec<SearchHit>], rank_constant: u32, limit: usize) -> Vec<SearchHit> {
    let mut fused: Vec<Fused> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();

    for list in lists {
        let mut seen: HashSet<&str> = HashSet::new();
        for (position, hit) in list.iter().enumerate() {
            if !seen.insert(hit.id.as_str()) { continue; }
            let rank = position + 1;
            let contribution = rrf_contribution(rank, rank_constant);
            match index_of.get(&hit.id) {
                Some(&i) => {
                    let entry = &mut fused[i];
                    entry.score += contribution;
                    entry.best_rank = entry.best_rank.min(rank);
                }
                None => {
                    index_of.insert(hit.id.clone(), fused.len());
                    fused.push(Fused { hit: hit.clone(), score: contribution, best_rank: rank });
                }
            }
        }
    }

    // Stable sort keeps first-appearance order for full ties.
    fused.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.best_rank.cmp(&b.best_rank)));
    fused
        .into_iter()
        .take(limit)
        .map(|f| SearchHit { score: f.score, ..f.hit })
        .collect()
}
