pub mod memory;
pub mod postgres;

use crate::models::{Comment, DecisionThread, Group, Nomination, User, Vote};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

// Read-only snapshot access, the only view of persistence the metrics
// service sees. Callers fetch a stable snapshot, then compute.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn thread(&self, thread_id: &str) -> Result<Option<DecisionThread>, StoreError>;
    async fn group(&self, group_id: &str) -> Result<Option<Group>, StoreError>;

    async fn votes_for_thread(&self, thread_id: &str) -> Result<Vec<Vote>, StoreError>;
    async fn comments_for_thread(&self, thread_id: &str) -> Result<Vec<Comment>, StoreError>;
    async fn nominations_for_thread(&self, thread_id: &str)
        -> Result<Vec<Nomination>, StoreError>;

    async fn threads_in_group(&self, group_id: &str) -> Result<Vec<DecisionThread>, StoreError>;
    async fn votes_in_group(&self, group_id: &str) -> Result<Vec<Vote>, StoreError>;
    async fn comments_in_group(&self, group_id: &str) -> Result<Vec<Comment>, StoreError>;

    async fn groups_in_org(&self, org_id: &str) -> Result<Vec<Group>, StoreError>;
    async fn threads_in_org(&self, org_id: &str) -> Result<Vec<DecisionThread>, StoreError>;
    async fn votes_in_org(&self, org_id: &str) -> Result<Vec<Vote>, StoreError>;
    async fn comments_in_org(&self, org_id: &str) -> Result<Vec<Comment>, StoreError>;
    async fn users_in_org(&self, org_id: &str) -> Result<Vec<User>, StoreError>;
    async fn nominations_in_org(&self, org_id: &str) -> Result<Vec<Nomination>, StoreError>;
}

// Lifecycle surface for the deadline task. Kept apart from DecisionStore so
// the composers only ever see the read-only half.
#[async_trait]
pub trait ThreadLifecycle: Send + Sync {
    async fn expired_open_threads(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DecisionThread>, StoreError>;
    async fn close_thread(&self, thread_id: &str) -> Result<(), StoreError>;
}
