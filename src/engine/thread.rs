use crate::engine::consensus::{calculate_mcq_consensus, calculate_yesno_consensus};
use crate::engine::Consensus;
use crate::models::{Comment, DecisionThread, Nomination, Vote, VoteType};
use serde::Serialize;
use std::collections::HashMap;

const RECENT_LIMIT: usize = 5;
const TOP_NOMINEE_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct NomineeCount {
    pub nomination: Nomination,
    pub votes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadMetrics {
    pub thread: DecisionThread,
    pub consensus: Consensus,
    pub recent_votes: Vec<Vote>,
    pub recent_comments: Vec<Comment>,
    pub unique_voters: Vec<Vote>,
    pub unique_commenters: Vec<Comment>,
    pub engagement_score: i64,
    // Multi-choice threads only; empty / None on yes/no threads
    pub top_nominees: Vec<NomineeCount>,
    pub winning_nominee: Option<Nomination>,
}

pub fn compose_thread_metrics(
    thread: &DecisionThread,
    votes: &[Vote],
    comments: &[Comment],
    nominations: &[Nomination],
) -> ThreadMetrics {
    let consensus = match thread.vote_type {
        VoteType::YesNo => calculate_yesno_consensus(votes, nominations),
        VoteType::Mcq => calculate_mcq_consensus(votes, nominations),
    };

    // Most recent first
    let mut recent_votes = votes.to_vec();
    recent_votes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_votes.truncate(RECENT_LIMIT);

    let mut recent_comments = comments.to_vec();
    recent_comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_comments.truncate(RECENT_LIMIT);

    // Dedup by user id; a later record replaces an earlier one under the
    // same key. Anonymous votes carry no identity and are skipped.
    let mut voters: HashMap<String, Vote> = HashMap::new();
    for vote in votes {
        if let Some(user_id) = &vote.user_id {
            voters.insert(user_id.clone(), vote.clone());
        }
    }
    let unique_voters: Vec<Vote> = voters.into_values().collect();

    let mut commenters: HashMap<String, Comment> = HashMap::new();
    for comment in comments {
        commenters.insert(comment.user_id.clone(), comment.clone());
    }
    let unique_commenters: Vec<Comment> = commenters.into_values().collect();

    let total_members = thread.total_members.max(1) as f64;
    let engagement_score =
        (((votes.len() + comments.len()) as f64 / total_members) * 100.0).round() as i64;

    let (top_nominees, winning_nominee) = match thread.vote_type {
        VoteType::Mcq => rank_nominees(votes, nominations),
        VoteType::YesNo => (Vec::new(), None),
    };

    ThreadMetrics {
        thread: thread.clone(),
        consensus,
        recent_votes,
        recent_comments,
        unique_voters,
        unique_commenters,
        engagement_score,
        top_nominees,
        winning_nominee,
    }
}

fn rank_nominees(
    votes: &[Vote],
    nominations: &[Nomination],
) -> (Vec<NomineeCount>, Option<Nomination>) {
    // A ballot counts for a nominee only when its single option value is
    // exactly the nominee id; option lists never match.
    let counted: Vec<NomineeCount> = nominations
        .iter()
        .map(|nomination| NomineeCount {
            votes: votes
                .iter()
                .filter(|vote| vote.value.as_single() == Some(nomination.id.as_str()))
                .count(),
            nomination: nomination.clone(),
        })
        .collect();

    // Winner via left fold with strict >, so the first nominee at the
    // maximum keeps the win on ties. Distinct from the stable sort below.
    let mut winner: Option<&NomineeCount> = None;
    for entry in &counted {
        let replace = match winner {
            Some(best) => entry.votes > best.votes,
            None => true,
        };
        if replace {
            winner = Some(entry);
        }
    }
    let winning_nominee = winner.map(|entry| entry.nomination.clone());

    // Stable sort keeps nomination order among equals
    let mut top_nominees = counted;
    top_nominees.sort_by(|a, b| b.votes.cmp(&a.votes));
    top_nominees.truncate(TOP_NOMINEE_LIMIT);

    (top_nominees, winning_nominee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn thread(vote_type: VoteType, total_members: u32) -> DecisionThread {
        DecisionThread::new("g1", "creator", "Pick a venue", "", vote_type, None, total_members)
    }

    fn vote_at(user: &str, option: &str, minutes_ago: i64) -> Vote {
        let mut vote = Vote::single("t1", Some(user.to_string()), option);
        vote.created_at = Utc::now() - Duration::minutes(minutes_ago);
        vote
    }

    fn comment_at(user: &str, text: &str, minutes_ago: i64) -> Comment {
        let mut comment = Comment::new("t1", user, text);
        comment.created_at = Utc::now() - Duration::minutes(minutes_ago);
        comment
    }

    fn nominee(id: &str, name: &str) -> Nomination {
        let mut nomination = Nomination::new("t1", name, None, "", "");
        nomination.id = id.to_string();
        nomination
    }

    #[test]
    fn recent_votes_are_newest_first_and_capped() {
        let votes: Vec<Vote> = (0..8i64).map(|i| vote_at(&format!("u{}", i), "yes", i)).collect();
        let metrics = compose_thread_metrics(&thread(VoteType::YesNo, 10), &votes, &[], &[]);

        assert_eq!(metrics.recent_votes.len(), 5);
        assert_eq!(metrics.recent_votes[0].user_id.as_deref(), Some("u0"));
        assert_eq!(metrics.recent_votes[4].user_id.as_deref(), Some("u4"));
    }

    #[test]
    fn unique_voters_dedup_is_last_write_wins() {
        let votes = vec![
            vote_at("u1", "yes", 10),
            vote_at("u1", "no", 5),
            vote_at("u2", "yes", 1),
        ];
        let metrics = compose_thread_metrics(&thread(VoteType::YesNo, 10), &votes, &[], &[]);

        assert_eq!(metrics.unique_voters.len(), 2);
        let u1 = metrics
            .unique_voters
            .iter()
            .find(|vote| vote.user_id.as_deref() == Some("u1"))
            .unwrap();
        // The later record under the same key is the one that survives
        assert_eq!(u1.value.as_single(), Some("no"));
    }

    #[test]
    fn anonymous_votes_are_not_unique_voters() {
        let mut anonymous = Vote::yes("t1", None);
        anonymous.created_at = Utc::now();
        let metrics =
            compose_thread_metrics(&thread(VoteType::YesNo, 10), &[anonymous], &[], &[]);
        assert!(metrics.unique_voters.is_empty());
        assert_eq!(metrics.consensus.total_votes, 1);
    }

    #[test]
    fn engagement_score_rounds_and_guards_zero_members() {
        let votes = vec![vote_at("u1", "yes", 1), vote_at("u2", "yes", 2)];
        let comments = vec![comment_at("u3", "sounds good", 1)];

        let metrics = compose_thread_metrics(&thread(VoteType::YesNo, 9), &votes, &comments, &[]);
        // (2 + 1) / 9 * 100 = 33.33 -> 33
        assert_eq!(metrics.engagement_score, 33);

        let metrics = compose_thread_metrics(&thread(VoteType::YesNo, 0), &votes, &comments, &[]);
        // Zero members falls back to a denominator of 1
        assert_eq!(metrics.engagement_score, 300);
    }

    #[test]
    fn top_nominees_rank_descending_with_stable_ties() {
        let nominations = vec![
            nominee("n1", "Ada"),
            nominee("n2", "Grace"),
            nominee("n3", "Edsger"),
        ];
        let votes = vec![
            vote_at("u1", "n2", 1),
            vote_at("u2", "n2", 2),
            vote_at("u3", "n1", 3),
            vote_at("u4", "n3", 4),
        ];
        let metrics =
            compose_thread_metrics(&thread(VoteType::Mcq, 10), &votes, &[], &nominations);

        let order: Vec<&str> = metrics
            .top_nominees
            .iter()
            .map(|entry| entry.nomination.id.as_str())
            .collect();
        // n2 leads with 2; n1 and n3 tie at 1 and keep nomination order
        assert_eq!(order, ["n2", "n1", "n3"]);
    }

    #[test]
    fn winning_nominee_tie_goes_to_earlier_nomination() {
        let nominations = vec![nominee("n1", "Ada"), nominee("n2", "Grace")];
        let votes = vec![
            vote_at("u1", "n2", 1),
            vote_at("u2", "n1", 2),
            vote_at("u3", "n2", 3),
            vote_at("u4", "n1", 4),
        ];
        let metrics =
            compose_thread_metrics(&thread(VoteType::Mcq, 10), &votes, &[], &nominations);
        assert_eq!(metrics.winning_nominee.unwrap().id, "n1");
    }

    #[test]
    fn yesno_threads_have_no_nominee_rankings() {
        let metrics = compose_thread_metrics(
            &thread(VoteType::YesNo, 10),
            &[vote_at("u1", "yes", 1)],
            &[],
            &[nominee("n1", "Ada")],
        );
        assert!(metrics.top_nominees.is_empty());
        assert!(metrics.winning_nominee.is_none());
    }

    #[test]
    fn multi_select_ballots_do_not_count_for_nominees() {
        let nominations = vec![nominee("n1", "Ada")];
        let ballot = Vote::multi("t1", Some("u1".to_string()), vec!["n1".into(), "n2".into()]);
        let metrics =
            compose_thread_metrics(&thread(VoteType::Mcq, 10), &[ballot], &[], &nominations);
        assert_eq!(metrics.top_nominees[0].votes, 0);
    }
}
