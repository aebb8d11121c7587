use crate::models::{Comment, DecisionThread, Vote};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

const TOP_THREAD_LIMIT: usize = 3;
const RECENT_COMMENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ThreadVoteCount {
    pub thread: DecisionThread,
    pub votes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMetrics {
    pub active_members: usize,
    pub pulse_score: i64,
    // Calendar day (UTC, ISO format) -> votes cast that day
    pub heatmap: BTreeMap<String, u64>,
    pub top_threads: Vec<ThreadVoteCount>,
    pub recent_comments: Vec<Comment>,
}

pub fn compose_group_metrics(
    threads: &[DecisionThread],
    votes: &[Vote],
    comments: &[Comment],
) -> GroupMetrics {
    // Anyone who voted or commented counts as active
    let mut members: HashSet<String> = HashSet::new();
    for vote in votes {
        if let Some(user_id) = &vote.user_id {
            members.insert(user_id.clone());
        }
    }
    for comment in comments {
        members.insert(comment.user_id.clone());
    }
    let active_members = members.len();

    let pulse_score = if threads.is_empty() {
        0
    } else {
        let denominator = (threads.len() * active_members.max(1)) as f64;
        (((votes.len() + comments.len()) as f64 / denominator) * 100.0).round() as i64
    };

    let mut heatmap: BTreeMap<String, u64> = BTreeMap::new();
    for vote in votes {
        let day = vote.created_at.date_naive().to_string();
        *heatmap.entry(day).or_insert(0) += 1;
    }

    let mut top_threads: Vec<ThreadVoteCount> = threads
        .iter()
        .map(|thread| ThreadVoteCount {
            votes: votes.iter().filter(|vote| vote.thread_id == thread.id).count(),
            thread: thread.clone(),
        })
        .collect();
    top_threads.sort_by(|a, b| b.votes.cmp(&a.votes));
    top_threads.truncate(TOP_THREAD_LIMIT);

    let mut recent_comments = comments.to_vec();
    recent_comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_comments.truncate(RECENT_COMMENT_LIMIT);

    GroupMetrics {
        active_members,
        pulse_score,
        heatmap,
        top_threads,
        recent_comments,
    }
}
