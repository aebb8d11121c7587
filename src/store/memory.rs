use crate::models::{
    Comment, DecisionThread, Group, Nomination, ThreadStatus, User, Vote,
};
use crate::store::{DecisionStore, StoreError, ThreadLifecycle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::sync::RwLock;

// In-memory implementation of the store traits. Backs unit tests and local
// runs; keeps records in insertion order like the SQL store's created_at
// ordering for freshly inserted data.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    groups: Vec<Group>,
    users: Vec<User>,
    threads: Vec<DecisionThread>,
    votes: Vec<Vote>,
    comments: Vec<Comment>,
    nominations: Vec<Nomination>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_group(&self, group: Group) {
        self.inner.write().await.groups.push(group);
    }

    pub async fn add_user(&self, user: User) {
        self.inner.write().await.users.push(user);
    }

    pub async fn add_thread(&self, thread: DecisionThread) {
        self.inner.write().await.threads.push(thread);
    }

    pub async fn add_vote(&self, vote: Vote) {
        self.inner.write().await.votes.push(vote);
    }

    pub async fn add_comment(&self, comment: Comment) {
        self.inner.write().await.comments.push(comment);
    }

    pub async fn add_nomination(&self, nomination: Nomination) {
        self.inner.write().await.nominations.push(nomination);
    }
}

impl Inner {
    fn group_thread_ids(&self, group_id: &str) -> HashSet<&str> {
        self.threads
            .iter()
            .filter(|thread| thread.group_id == group_id)
            .map(|thread| thread.id.as_str())
            .collect()
    }

    fn org_thread_ids(&self, org_id: &str) -> HashSet<&str> {
        let group_ids: HashSet<&str> = self
            .groups
            .iter()
            .filter(|group| group.org_id == org_id)
            .map(|group| group.id.as_str())
            .collect();
        self.threads
            .iter()
            .filter(|thread| group_ids.contains(thread.group_id.as_str()))
            .map(|thread| thread.id.as_str())
            .collect()
    }
}

#[async_trait]
impl DecisionStore for MemoryStore {
    async fn thread(&self, thread_id: &str) -> Result<Option<DecisionThread>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.threads.iter().find(|t| t.id == thread_id).cloned())
    }

    async fn group(&self, group_id: &str) -> Result<Option<Group>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.groups.iter().find(|g| g.id == group_id).cloned())
    }

    async fn votes_for_thread(&self, thread_id: &str) -> Result<Vec<Vote>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .votes
            .iter()
            .filter(|vote| vote.thread_id == thread_id)
            .cloned()
            .collect())
    }

    async fn comments_for_thread(&self, thread_id: &str) -> Result<Vec<Comment>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .comments
            .iter()
            .filter(|comment| comment.thread_id == thread_id)
            .cloned()
            .collect())
    }

    async fn nominations_for_thread(
        &self,
        thread_id: &str,
    ) -> Result<Vec<Nomination>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .nominations
            .iter()
            .filter(|nomination| nomination.thread_id == thread_id)
            .cloned()
            .collect())
    }

    async fn threads_in_group(&self, group_id: &str) -> Result<Vec<DecisionThread>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .threads
            .iter()
            .filter(|thread| thread.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn votes_in_group(&self, group_id: &str) -> Result<Vec<Vote>, StoreError> {
        let inner = self.inner.read().await;
        let thread_ids = inner.group_thread_ids(group_id);
        Ok(inner
            .votes
            .iter()
            .filter(|vote| thread_ids.contains(vote.thread_id.as_str()))
            .cloned()
            .collect())
    }

    async fn comments_in_group(&self, group_id: &str) -> Result<Vec<Comment>, StoreError> {
        let inner = self.inner.read().await;
        let thread_ids = inner.group_thread_ids(group_id);
        Ok(inner
            .comments
            .iter()
            .filter(|comment| thread_ids.contains(comment.thread_id.as_str()))
            .cloned()
            .collect())
    }

    async fn groups_in_org(&self, org_id: &str) -> Result<Vec<Group>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .groups
            .iter()
            .filter(|group| group.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn threads_in_org(&self, org_id: &str) -> Result<Vec<DecisionThread>, StoreError> {
        let inner = self.inner.read().await;
        let thread_ids = inner.org_thread_ids(org_id);
        Ok(inner
            .threads
            .iter()
            .filter(|thread| thread_ids.contains(thread.id.as_str()))
            .cloned()
            .collect())
    }

    async fn votes_in_org(&self, org_id: &str) -> Result<Vec<Vote>, StoreError> {
        let inner = self.inner.read().await;
        let thread_ids = inner.org_thread_ids(org_id);
        Ok(inner
            .votes
            .iter()
            .filter(|vote| thread_ids.contains(vote.thread_id.as_str()))
            .cloned()
            .collect())
    }

    async fn comments_in_org(&self, org_id: &str) -> Result<Vec<Comment>, StoreError> {
        let inner = self.inner.read().await;
        let thread_ids = inner.org_thread_ids(org_id);
        Ok(inner
            .comments
            .iter()
            .filter(|comment| thread_ids.contains(comment.thread_id.as_str()))
            .cloned()
            .collect())
    }

    async fn users_in_org(&self, org_id: &str) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .filter(|user| user.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn nominations_in_org(&self, org_id: &str) -> Result<Vec<Nomination>, StoreError> {
        let inner = self.inner.read().await;
        let thread_ids = inner.org_thread_ids(org_id);
        Ok(inner
            .nominations
            .iter()
            .filter(|nomination| thread_ids.contains(nomination.thread_id.as_str()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ThreadLifecycle for MemoryStore {
    async fn expired_open_threads(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DecisionThread>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .threads
            .iter()
            .filter(|thread| {
                thread.status == ThreadStatus::Open
                    && thread.deadline.is_some_and(|deadline| deadline < now)
            })
            .cloned()
            .collect())
    }

    async fn close_thread(&self, thread_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(thread) = inner.threads.iter_mut().find(|t| t.id == thread_id) {
            thread.status = ThreadStatus::Closed;
        }
        Ok(())
    }
}
