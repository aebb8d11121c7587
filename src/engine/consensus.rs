use crate::engine::aggregate::aggregate_votes;
use crate::engine::Consensus;
use crate::models::{Nomination, Vote};
use std::collections::HashMap;

// Binary threads reach consensus on a simple majority.
const YESNO_AGREEMENT_THRESHOLD: f64 = 50.0;
// Multi-choice threads need both a stronger plurality and a participation floor.
const MCQ_AGREEMENT_THRESHOLD: f64 = 70.0;
const MCQ_ENGAGEMENT_THRESHOLD: f64 = 50.0;

pub fn calculate_yesno_consensus(votes: &[Vote], nominations: &[Nomination]) -> Consensus {
    let yes_votes = votes
        .iter()
        .filter(|vote| vote.value.as_single() == Some("yes"))
        .count();
    let no_votes = votes
        .iter()
        .filter(|vote| vote.value.as_single() == Some("no"))
        .count();
    let total_votes = yes_votes + no_votes;

    let agreement = if total_votes > 0 {
        yes_votes as f64 / total_votes as f64 * 100.0
    } else {
        0.0
    };

    // Nominations are normally empty on yes/no threads, so the denominator
    // is floored at 1 and engagement degenerates to totalVotes * 100.
    let denominator = nominations.len().max(1);
    let engagement = if total_votes > 0 {
        total_votes as f64 / denominator as f64 * 100.0
    } else {
        0.0
    };

    let mut vote_counts = HashMap::new();
    vote_counts.insert("yes".to_string(), yes_votes as f64);
    vote_counts.insert("no".to_string(), no_votes as f64);

    Consensus {
        agreement,
        engagement,
        reached: agreement >= YESNO_AGREEMENT_THRESHOLD,
        vote_counts,
        total_votes,
    }
}

pub fn calculate_mcq_consensus(votes: &[Vote], nominations: &[Nomination]) -> Consensus {
    // Raw tally by option key, one count per ballot
    let vote_counts = aggregate_votes(votes, false);
    let total_votes = votes.len();

    let max_votes = vote_counts
        .values()
        .fold(0.0_f64, |max, &count| if count > max { count } else { max });

    let agreement = if total_votes > 0 {
        max_votes / total_votes as f64 * 100.0
    } else {
        0.0
    };

    let engagement = if total_votes > 0 && !nominations.is_empty() {
        total_votes as f64 / nominations.len() as f64 * 100.0
    } else {
        0.0
    };

    Consensus {
        agreement,
        engagement,
        reached: agreement >= MCQ_AGREEMENT_THRESHOLD && engagement >= MCQ_ENGAGEMENT_THRESHOLD,
        vote_counts,
        total_votes,
    }
}
