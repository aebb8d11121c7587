use crate::models::{Vote, VoteValue};
use std::collections::HashMap;

// Fold raw votes into per-option totals. Multi-select votes credit every
// option they list; options nobody picked never appear in the map.
pub fn aggregate_votes(votes: &[Vote], weighted: bool) -> HashMap<String, f64> {
    let mut vote_counts: HashMap<String, f64> = HashMap::new();

    for vote in votes {
        let weight = if weighted { vote.weight } else { 1.0 };

        match &vote.value {
            VoteValue::Single(option) => {
                *vote_counts.entry(option.clone()).or_insert(0.0) += weight;
            }
            VoteValue::Multi(options) => {
                for option in options {
                    *vote_counts.entry(option.clone()).or_insert(0.0) += weight;
                }
            }
        }
    }

    vote_counts
}
