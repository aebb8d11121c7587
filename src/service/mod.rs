use crate::cache::TtlCache;
use crate::engine::admin::{compose_admin_insights, AdminInsights};
use crate::engine::group::{compose_group_metrics, GroupMetrics};
use crate::engine::thread::{compose_thread_metrics, ThreadMetrics};
use crate::store::{DecisionStore, StoreError};
use chrono::Utc;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("missing required identifier: {0}")]
    MissingId(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// Facade over the pure composers: fetch a stable snapshot, compute, cache.
// Holds no state of its own beyond the TTL caches.
pub struct MetricsService {
    store: Arc<dyn DecisionStore>,
    thread_cache: TtlCache<ThreadMetrics>,
    group_cache: TtlCache<GroupMetrics>,
    admin_cache: TtlCache<AdminInsights>,
}

impl MetricsService {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self::with_cache_ttl(store, DEFAULT_CACHE_TTL)
    }

    pub fn with_cache_ttl(store: Arc<dyn DecisionStore>, ttl: Duration) -> Self {
        Self {
            store,
            thread_cache: TtlCache::new(ttl),
            group_cache: TtlCache::new(ttl),
            admin_cache: TtlCache::new(ttl),
        }
    }

    pub async fn thread_metrics(&self, thread_id: &str) -> Result<ThreadMetrics, ServiceError> {
        if thread_id.is_empty() {
            return Err(ServiceError::MissingId("thread_id"));
        }
        if let Some(cached) = self.thread_cache.get(thread_id) {
            return Ok(cached);
        }

        let thread = self
            .store
            .thread(thread_id)
            .await?
            .ok_or(ServiceError::NotFound("thread"))?;

        let (votes, comments, nominations) = tokio::join!(
            self.store.votes_for_thread(thread_id),
            self.store.comments_for_thread(thread_id),
            self.store.nominations_for_thread(thread_id),
        );
        let metrics = compose_thread_metrics(&thread, &votes?, &comments?, &nominations?);

        info!(
            "Computed metrics for thread {} ({} votes, reached: {})",
            thread_id, metrics.consensus.total_votes, metrics.consensus.reached
        );
        self.thread_cache.insert(thread_id, metrics.clone());
        Ok(metrics)
    }

    pub async fn group_metrics(&self, group_id: &str) -> Result<GroupMetrics, ServiceError> {
        if group_id.is_empty() {
            return Err(ServiceError::MissingId("group_id"));
        }
        if let Some(cached) = self.group_cache.get(group_id) {
            return Ok(cached);
        }

        self.store
            .group(group_id)
            .await?
            .ok_or(ServiceError::NotFound("group"))?;

        let (threads, votes, comments) = tokio::join!(
            self.store.threads_in_group(group_id),
            self.store.votes_in_group(group_id),
            self.store.comments_in_group(group_id),
        );
        let metrics = compose_group_metrics(&threads?, &votes?, &comments?);

        info!(
            "Computed metrics for group {} ({} active members)",
            group_id, metrics.active_members
        );
        self.group_cache.insert(group_id, metrics.clone());
        Ok(metrics)
    }

    pub async fn admin_insights(&self, org_id: &str) -> Result<AdminInsights, ServiceError> {
        if org_id.is_empty() {
            return Err(ServiceError::MissingId("org_id"));
        }
        if let Some(cached) = self.admin_cache.get(org_id) {
            return Ok(cached);
        }

        let (groups, threads, votes, comments, users, nominations) = tokio::join!(
            self.store.groups_in_org(org_id),
            self.store.threads_in_org(org_id),
            self.store.votes_in_org(org_id),
            self.store.comments_in_org(org_id),
            self.store.users_in_org(org_id),
            self.store.nominations_in_org(org_id),
        );
        let insights = compose_admin_insights(
            &groups?,
            &threads?,
            &votes?,
            &comments?,
            &users?,
            &nominations?,
            Utc::now(),
        );

        info!(
            "Computed admin insights for org {} ({} groups, {} threads)",
            org_id, insights.totals.groups, insights.totals.threads
        );
        self.admin_cache.insert(org_id, insights.clone());
        Ok(insights)
    }

    // Change notifications drop the affected keys so the next read recomputes
    pub fn invalidate_thread(&self, thread_id: &str) {
        self.thread_cache.invalidate(thread_id);
    }

    pub fn invalidate_group(&self, group_id: &str) {
        self.group_cache.invalidate(group_id);
    }

    pub fn invalidate_org(&self, org_id: &str) {
        self.admin_cache.invalidate(org_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DecisionThread, Group, Vote, VoteType};
    use crate::store::MemoryStore;

    fn group(id: &str) -> Group {
        Group {
            id: id.to_string(),
            org_id: "org1".to_string(),
            name: id.to_string(),
            description: String::new(),
            members: 10,
            is_public: true,
            activity: 0.0,
            members_list: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn thread(id: &str) -> DecisionThread {
        let mut thread =
            DecisionThread::new("g1", "creator", "Budget vote", "", VoteType::YesNo, None, 10);
        thread.id = id.to_string();
        thread
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_group(group("g1")).await;
        store.add_thread(thread("t1")).await;
        store.add_vote(Vote::yes("t1", Some("u1".to_string()))).await;
        store.add_vote(Vote::yes("t1", Some("u2".to_string()))).await;
        store.add_vote(Vote::no("t1", Some("u3".to_string()))).await;
        store
    }

    #[tokio::test]
    async fn thread_metrics_end_to_end() {
        let service = MetricsService::new(seeded_store().await);
        let metrics = service.thread_metrics("t1").await.unwrap();
        assert_eq!(metrics.consensus.total_votes, 3);
        assert!(metrics.consensus.reached);
        assert_eq!(metrics.unique_voters.len(), 3);
    }

    #[tokio::test]
    async fn missing_thread_is_not_found() {
        let service = MetricsService::new(seeded_store().await);
        let err = service.thread_metrics("nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("thread")));
    }

    #[tokio::test]
    async fn empty_id_is_rejected() {
        let service = MetricsService::new(seeded_store().await);
        let err = service.thread_metrics("").await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingId("thread_id")));
    }

    #[tokio::test]
    async fn cached_metrics_serve_until_invalidated() {
        let store = seeded_store().await;
        let service = MetricsService::new(Arc::clone(&store) as Arc<dyn DecisionStore>);

        let first = service.thread_metrics("t1").await.unwrap();
        assert_eq!(first.consensus.total_votes, 3);

        // A new vote lands but the cached snapshot still answers
        store.add_vote(Vote::yes("t1", Some("u4".to_string()))).await;
        let cached = service.thread_metrics("t1").await.unwrap();
        assert_eq!(cached.consensus.total_votes, 3);

        // Dropping the key forces a fresh snapshot
        service.invalidate_thread("t1");
        let fresh = service.thread_metrics("t1").await.unwrap();
        assert_eq!(fresh.consensus.total_votes, 4);
    }

    #[tokio::test]
    async fn group_metrics_end_to_end() {
        let service = MetricsService::new(seeded_store().await);
        let metrics = service.group_metrics("g1").await.unwrap();
        assert_eq!(metrics.active_members, 3);
        assert_eq!(metrics.top_threads.len(), 1);

        let err = service.group_metrics("nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("group")));
    }

    #[tokio::test]
    async fn admin_insights_end_to_end() {
        let service = MetricsService::new(seeded_store().await);
        let insights = service.admin_insights("org1").await.unwrap();
        assert_eq!(insights.totals.groups, 1);
        assert_eq!(insights.totals.threads, 1);
        assert_eq!(insights.totals.votes, 3);
        // Every voter was active inside the last 30 days but no users are
        // registered, so retention reads 0 and churn 100
        assert_eq!(insights.retention_rate, 0.0);
    }
}
