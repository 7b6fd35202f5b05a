//! Reciprocal Rank Fusion: `score = Σ 1/(k + rank_i)`.
//!
//! Combines ranked lists from retrieval methods with incompatible
//! score scales (BM25 vs cosine) without normalizing either. Ranks are
//! 1-based; an item present in only one list still scores from that
//! single term.

use std::collections::HashMap;

/// Fuse ranked id lists. Returns (id, fused score) pairs, best first.
/// Order among equal scores is unspecified here; callers break ties
/// with recency once entities are loaded.
pub fn fuse(ranked_lists: &[Vec<String>], k: u32) -> Vec<(String, f64)> {
    let mut scores: HashMap<String, f64> = HashMap::new();

    for list in ranked_lists {
        for (index, id) in list.iter().enumerate() {
            let rank = index + 1;
            let rrf = 1.0 / (k as f64 + rank as f64);
            *scores.entry(id.clone()).or_default() += rrf;
        }
    }

    let mut fused: Vec<(String, f64)> = scores.into_iter().collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn item_in_both_lists_beats_single_list_top() {
        let fused = fuse(
            &[ids(&["both", "only_a"]), ids(&["both", "only_b"])],
            60,
        );
        assert_eq!(fused[0].0, "both");
        // 2/(60+1) vs 1/(60+2) for the runners-up.
        assert!((fused[0].1 - 2.0 / 61.0).abs() < 1e-12);
        assert!(fused[0].1 > 1.0 / 61.0);
    }

    #[test]
    fn single_list_item_scores_one_term() {
        let fused = fuse(&[ids(&["solo"])], 60);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].1 - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn empty_lists_fuse_to_nothing() {
        assert!(fuse(&[vec![], vec![]], 60).is_empty());
    }
}
