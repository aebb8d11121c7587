use crate::models::{
    Comment, DecisionThread, Group, GroupMember, Nomination, ThreadStatus, User, Vote, VoteType,
};
use crate::store::{DecisionStore, StoreError, ThreadLifecycle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::env;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    // Connect using DATABASE_URL, falling back to a local default
    pub async fn connect() -> Result<Self, StoreError> {
        let db_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/campus_quorum".to_string());
        Self::connect_to(&db_url).await
    }

    pub async fn connect_to(db_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(pool: &PgPool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS groups (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                members INTEGER NOT NULL DEFAULT 0,
                is_public BOOLEAN NOT NULL DEFAULT TRUE,
                activity DOUBLE PRECISION NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_members (
                group_id TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT '',
                position INTEGER NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS threads (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                creator_id TEXT NOT NULL DEFAULT '',
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                vote_type TEXT NOT NULL,
                deadline TIMESTAMPTZ,
                total_members INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                user_id TEXT,
                vote TEXT NOT NULL,
                weight DOUBLE PRECISION NOT NULL DEFAULT 1,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nominations (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                user_id TEXT,
                email TEXT NOT NULL DEFAULT '',
                label TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn create_group(&self, group: &Group) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO groups (id, org_id, name, description, members, is_public, activity, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&group.id)
        .bind(&group.org_id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.members as i32)
        .bind(group.is_public)
        .bind(group.activity)
        .bind(group.created_at)
        .execute(&self.pool)
        .await?;

        for (i, member) in group.members_list.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO group_members (group_id, name, role, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&group.id)
            .bind(&member.name)
            .bind(&member.role)
            .bind(i as i32)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    pub async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, org_id, name, email, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.org_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_thread(&self, thread: &DecisionThread) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO threads (id, group_id, creator_id, title, description, status, vote_type, deadline, total_members, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&thread.id)
        .bind(&thread.group_id)
        .bind(&thread.creator_id)
        .bind(&thread.title)
        .bind(&thread.description)
        .bind(status_to_str(thread.status))
        .bind(vote_type_to_str(thread.vote_type))
        .bind(thread.deadline)
        .bind(thread.total_members as i32)
        .bind(thread.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // Save a vote, replacing any earlier ballot from the same member on the
    // same thread. Anonymous votes always insert.
    pub async fn save_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        let value = serde_json::to_string(&vote.value)
            .map_err(|e| StoreError::Corrupt(format!("vote value: {}", e)))?;

        if let Some(user_id) = &vote.user_id {
            let updated = sqlx::query(
                r#"
                UPDATE votes
                SET vote = $1, weight = $2, updated_at = $3
                WHERE thread_id = $4 AND user_id = $5
                "#,
            )
            .bind(&value)
            .bind(vote.weight)
            .bind(vote.updated_at.unwrap_or(vote.created_at))
            .bind(&vote.thread_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

            if updated.rows_affected() > 0 {
                return Ok(());
            }
        }

        let id = vote
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        sqlx::query(
            r#"
            INSERT INTO votes (id, thread_id, user_id, vote, weight, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&id)
        .bind(&vote.thread_id)
        .bind(&vote.user_id)
        .bind(&value)
        .bind(vote.weight)
        .bind(vote.created_at)
        .bind(vote.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn add_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, thread_id, user_id, text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.thread_id)
        .bind(&comment.user_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn add_nomination(&self, nomination: &Nomination) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO nominations (id, thread_id, name, user_id, email, label, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&nomination.id)
        .bind(&nomination.thread_id)
        .bind(&nomination.name)
        .bind(&nomination.user_id)
        .bind(&nomination.email)
        .bind(&nomination.label)
        .bind(nomination.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn group_members(&self, group_id: &str) -> Result<Vec<GroupMember>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT name, role
            FROM group_members
            WHERE group_id = $1
            ORDER BY position
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in rows {
            members.push(GroupMember {
                name: row.try_get("name")?,
                role: row.try_get("role")?,
            });
        }
        Ok(members)
    }

    async fn group_from_row(&self, row: &PgRow) -> Result<Group, StoreError> {
        let id: String = row.try_get("id")?;
        let members_list = self.group_members(&id).await?;
        Ok(Group {
            id,
            org_id: row.try_get("org_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            members: row.try_get::<i32, _>("members")? as u32,
            is_public: row.try_get("is_public")?,
            activity: row.try_get("activity")?,
            members_list,
            created_at: row.try_get("created_at")?,
        })
    }
}

const THREAD_COLUMNS: &str =
    "id, group_id, creator_id, title, description, status, vote_type, deadline, total_members, created_at";
const VOTE_COLUMNS: &str = "id, thread_id, user_id, vote, weight, created_at, updated_at";

fn vote_type_to_str(vote_type: VoteType) -> &'static str {
    match vote_type {
        VoteType::YesNo => "yesno",
        VoteType::Mcq => "mcq",
    }
}

fn vote_type_from_str(raw: &str) -> Result<VoteType, StoreError> {
    match raw {
        "yesno" => Ok(VoteType::YesNo),
        "mcq" => Ok(VoteType::Mcq),
        other => Err(StoreError::Corrupt(format!("unknown vote type: {}", other))),
    }
}

fn status_to_str(status: ThreadStatus) -> &'static str {
    match status {
        ThreadStatus::Open => "open",
        ThreadStatus::Closed => "closed",
    }
}

fn status_from_str(raw: &str) -> Result<ThreadStatus, StoreError> {
    match raw {
        "open" => Ok(ThreadStatus::Open),
        "closed" => Ok(ThreadStatus::Closed),
        other => Err(StoreError::Corrupt(format!("unknown thread status: {}", other))),
    }
}

fn thread_from_row(row: &PgRow) -> Result<DecisionThread, StoreError> {
    let status: String = row.try_get("status")?;
    let vote_type: String = row.try_get("vote_type")?;
    Ok(DecisionThread {
        id: row.try_get("id")?,
        group_id: row.try_get("group_id")?,
        creator_id: row.try_get("creator_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: status_from_str(&status)?,
        vote_type: vote_type_from_str(&vote_type)?,
        deadline: row.try_get("deadline")?,
        total_members: row.try_get::<i32, _>("total_members")? as u32,
        created_at: row.try_get("created_at")?,
    })
}

fn vote_from_row(row: &PgRow) -> Result<Vote, StoreError> {
    // The vote column holds JSON: a bare option key or a list of keys
    let raw: String = row.try_get("vote")?;
    let value = serde_json::from_str(&raw)
        .map_err(|e| StoreError::Corrupt(format!("vote value: {}", e)))?;
    Ok(Vote {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        user_id: row.try_get("user_id")?,
        value,
        weight: row.try_get("weight")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, StoreError> {
    Ok(Comment {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        user_id: row.try_get("user_id")?,
        text: row.try_get("text")?,
        created_at: row.try_get("created_at")?,
    })
}

fn nomination_from_row(row: &PgRow) -> Result<Nomination, StoreError> {
    Ok(Nomination {
        id: row.try_get("id")?,
        thread_id: row.try_get("thread_id")?,
        name: row.try_get("name")?,
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        label: row.try_get("label")?,
        created_at: row.try_get("created_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        org_id: row.try_get("org_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl DecisionStore for PgStore {
    async fn thread(&self, thread_id: &str) -> Result<Option<DecisionThread>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM threads WHERE id = $1",
            THREAD_COLUMNS
        ))
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(thread_from_row).transpose()
    }

    async fn group(&self, group_id: &str) -> Result<Option<Group>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, org_id, name, description, members, is_public, activity, created_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.group_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn votes_for_thread(&self, thread_id: &str) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM votes WHERE thread_id = $1 ORDER BY created_at",
            VOTE_COLUMNS
        ))
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    async fn comments_for_thread(&self, thread_id: &str) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, thread_id, user_id, text, created_at
            FROM comments
            WHERE thread_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(comment_from_row).collect()
    }

    async fn nominations_for_thread(
        &self,
        thread_id: &str,
    ) -> Result<Vec<Nomination>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, thread_id, name, user_id, email, label, created_at
            FROM nominations
            WHERE thread_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(nomination_from_row).collect()
    }

    async fn threads_in_group(&self, group_id: &str) -> Result<Vec<DecisionThread>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM threads WHERE group_id = $1 ORDER BY created_at",
            THREAD_COLUMNS
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(thread_from_row).collect()
    }

    async fn votes_in_group(&self, group_id: &str) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT v.id, v.thread_id, v.user_id, v.vote, v.weight, v.created_at, v.updated_at
            FROM votes v
            JOIN threads t ON v.thread_id = t.id
            WHERE t.group_id = $1
            ORDER BY v.created_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    async fn comments_in_group(&self, group_id: &str) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.thread_id, c.user_id, c.text, c.created_at
            FROM comments c
            JOIN threads t ON c.thread_id = t.id
            WHERE t.group_id = $1
            ORDER BY c.created_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(comment_from_row).collect()
    }

    async fn groups_in_org(&self, org_id: &str) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, org_id, name, description, members, is_public, activity, created_at
            FROM groups
            WHERE org_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            groups.push(self.group_from_row(row).await?);
        }
        Ok(groups)
    }

    async fn threads_in_org(&self, org_id: &str) -> Result<Vec<DecisionThread>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.group_id, t.creator_id, t.title, t.description, t.status,
                   t.vote_type, t.deadline, t.total_members, t.created_at
            FROM threads t
            JOIN groups g ON t.group_id = g.id
            WHERE g.org_id = $1
            ORDER BY t.created_at
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(thread_from_row).collect()
    }

    async fn votes_in_org(&self, org_id: &str) -> Result<Vec<Vote>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT v.id, v.thread_id, v.user_id, v.vote, v.weight, v.created_at, v.updated_at
            FROM votes v
            JOIN threads t ON v.thread_id = t.id
            JOIN groups g ON t.group_id = g.id
            WHERE g.org_id = $1
            ORDER BY v.created_at
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    async fn comments_in_org(&self, org_id: &str) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.thread_id, c.user_id, c.text, c.created_at
            FROM comments c
            JOIN threads t ON c.thread_id = t.id
            JOIN groups g ON t.group_id = g.id
            WHERE g.org_id = $1
            ORDER BY c.created_at
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(comment_from_row).collect()
    }

    async fn users_in_org(&self, org_id: &str) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, org_id, name, email, created_at
            FROM users
            WHERE org_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn nominations_in_org(&self, org_id: &str) -> Result<Vec<Nomination>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT n.id, n.thread_id, n.name, n.user_id, n.email, n.label, n.created_at
            FROM nominations n
            JOIN threads t ON n.thread_id = t.id
            JOIN groups g ON t.group_id = g.id
            WHERE g.org_id = $1
            ORDER BY n.created_at
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(nomination_from_row).collect()
    }
}

#[async_trait]
impl ThreadLifecycle for PgStore {
    async fn expired_open_threads(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DecisionThread>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM threads WHERE deadline IS NOT NULL AND deadline < $1 AND status = 'open'",
            THREAD_COLUMNS
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(thread_from_row).collect()
    }

    async fn close_thread(&self, thread_id: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE threads
            SET status = 'closed'
            WHERE id = $1 AND status = 'open'
            "#,
        )
        .bind(thread_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
