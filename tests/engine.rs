use campus_quorum::models::{
    Comment, DecisionThread, Group, Nomination, User, Vote, VoteType,
};
use campus_quorum::service::{MetricsService, ServiceError};
use campus_quorum::store::{DecisionStore, MemoryStore};
use chrono::{Duration, Utc};
use std::sync::Arc;

fn group(id: &str, org_id: &str, members: u32) -> Group {
    Group {
        id: id.to_string(),
        org_id: org_id.to_string(),
        name: format!("Group {}", id),
        description: String::new(),
        members,
        is_public: true,
        activity: 0.0,
        members_list: Vec::new(),
        created_at: Utc::now() - Duration::days(90),
    }
}

fn user(id: &str, org_id: &str) -> User {
    User {
        id: id.to_string(),
        org_id: org_id.to_string(),
        name: id.to_string(),
        email: format!("{}@campus.edu", id),
        created_at: Utc::now() - Duration::days(90),
    }
}

fn nomination(id: &str, thread_id: &str, name: &str) -> Nomination {
    let mut nomination = Nomination::new(thread_id, name, None, "", name);
    nomination.id = id.to_string();
    nomination
}

// One election: a board seat decided in an MCQ thread with nominations,
// votes, and a comment trail, driven through the service facade.
async fn seeded_election() -> Arc<MemoryStore> {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(MemoryStore::new());
    store.add_group(group("g1", "org1", 12)).await;

    for i in 1..=8 {
        store.add_user(user(&format!("u{}", i), "org1")).await;
    }

    let mut election =
        DecisionThread::new("g1", "u1", "Board seat", "", VoteType::Mcq, Some(120), 10);
    election.id = "election".to_string();
    store.add_thread(election).await;

    store.add_nomination(nomination("cand-a", "election", "Ada")).await;
    store.add_nomination(nomination("cand-b", "election", "Grace")).await;
    store.add_nomination(nomination("cand-c", "election", "Edsger")).await;

    // 7-2-1 split across ten ballots
    for i in 1..=7 {
        store
            .add_vote(Vote::single("election", Some(format!("u{}", i)), "cand-a"))
            .await;
    }
    store
        .add_vote(Vote::single("election", Some("u8".to_string()), "cand-b"))
        .await;
    store
        .add_vote(Vote::single("election", None, "cand-b"))
        .await;
    store
        .add_vote(Vote::single("election", None, "cand-c"))
        .await;

    store
        .add_comment(Comment::new("election", "u1", "Ada has my vote"))
        .await;
    store
        .add_comment(Comment::new("election", "u8", "Grace would be great"))
        .await;

    store
}

#[tokio::test]
async fn election_thread_metrics() {
    let service = MetricsService::new(seeded_election().await);
    let metrics = service.thread_metrics("election").await.unwrap();

    // 7 of 10 ballots behind the leader, 10 ballots over 3 nominations
    assert_eq!(metrics.consensus.agreement, 70.0);
    assert!(metrics.consensus.reached);
    assert_eq!(metrics.consensus.total_votes, 10);
    assert_eq!(metrics.consensus.vote_counts["cand-a"], 7.0);

    assert_eq!(metrics.winning_nominee.unwrap().id, "cand-a");
    assert_eq!(metrics.top_nominees[0].votes, 7);
    assert_eq!(metrics.top_nominees[1].nomination.id, "cand-b");
    assert_eq!(metrics.top_nominees[1].votes, 2);

    // 8 named voters; the two anonymous ballots carry no identity
    assert_eq!(metrics.unique_voters.len(), 8);
    assert_eq!(metrics.recent_votes.len(), 5);
    assert_eq!(metrics.recent_comments.len(), 2);

    // (10 votes + 2 comments) / 10 members * 100
    assert_eq!(metrics.engagement_score, 120);
}

#[tokio::test]
async fn election_group_metrics() {
    let service = MetricsService::new(seeded_election().await);
    let metrics = service.group_metrics("g1").await.unwrap();

    // u1..u8 voted or commented
    assert_eq!(metrics.active_members, 8);
    assert_eq!(metrics.top_threads.len(), 1);
    assert_eq!(metrics.top_threads[0].votes, 10);
    // (10 + 2) / (1 thread * 8 active) * 100 = 150
    assert_eq!(metrics.pulse_score, 150);
    // All ballots landed today
    assert_eq!(metrics.heatmap.len(), 1);
}

#[tokio::test]
async fn election_admin_insights() {
    let service = MetricsService::new(seeded_election().await);
    let insights = service.admin_insights("org1").await.unwrap();

    assert_eq!(insights.totals.votes, 10);
    assert_eq!(insights.totals.nominations, 3);
    assert_eq!(insights.averages.votes_per_thread, 10.0);
    assert_eq!(insights.averages.nominations_per_thread, 3.0);

    // Everything was created in the last window, the one before is empty
    assert_eq!(insights.growth.votes, 100.0);

    assert_eq!(insights.top_nominees[0].nomination.id, "cand-a");
    assert_eq!(insights.top_voters.len(), 5);
    assert_eq!(insights.top_voters[0].user_id, "u1");

    let top_thread = insights.highest_engagement_thread.unwrap();
    assert_eq!(top_thread.thread.id, "election");

    // All 8 registered users were active in the window
    assert_eq!(insights.retention_rate, 100.0);
    assert_eq!(insights.churn_rate, 0.0);
}

#[tokio::test]
async fn unknown_ids_surface_not_found() {
    let service = MetricsService::new(seeded_election().await);
    assert!(matches!(
        service.thread_metrics("missing").await.unwrap_err(),
        ServiceError::NotFound("thread")
    ));
    assert!(matches!(
        service.group_metrics("missing").await.unwrap_err(),
        ServiceError::NotFound("group")
    ));
}

#[tokio::test]
async fn yesno_thread_through_the_service() {
    let store = Arc::new(MemoryStore::new());
    store.add_group(group("g1", "org1", 6)).await;

    let mut proposal =
        DecisionThread::new("g1", "u1", "Extend library hours", "", VoteType::YesNo, None, 6);
    proposal.id = "proposal".to_string();
    store.add_thread(proposal).await;

    store.add_vote(Vote::yes("proposal", Some("u1".to_string()))).await;
    store.add_vote(Vote::yes("proposal", Some("u2".to_string()))).await;
    store.add_vote(Vote::yes("proposal", Some("u3".to_string()))).await;
    store.add_vote(Vote::no("proposal", Some("u4".to_string()))).await;

    let service = MetricsService::new(store as Arc<dyn DecisionStore>);
    let metrics = service.thread_metrics("proposal").await.unwrap();

    assert_eq!(metrics.consensus.agreement, 75.0);
    assert!(metrics.consensus.reached);
    assert_eq!(metrics.consensus.vote_counts["yes"], 3.0);
    assert_eq!(metrics.consensus.vote_counts["no"], 1.0);
    assert!(metrics.top_nominees.is_empty());
    assert!(metrics.winning_nominee.is_none());
}
