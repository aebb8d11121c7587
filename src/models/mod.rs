use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_weight() -> f64 {
    1.0
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    YesNo,
    Mcq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Open,
    Closed,
}

// A vote value is either a single option key or a list of keys (multi-select).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VoteValue {
    Single(String),
    Multi(Vec<String>),
}

impl VoteValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            VoteValue::Single(option) => Some(option.as_str()),
            VoteValue::Multi(_) => None,
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            VoteValue::Single(option) => std::slice::from_ref(option),
            VoteValue::Multi(options) => options.as_slice(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub thread_id: String,
    // None when the vote was cast anonymously
    pub user_id: Option<String>,
    #[serde(rename = "vote")]
    pub value: VoteValue,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub thread_id: String,
    pub user_id: String,
    pub text: String,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nomination {
    pub id: String,
    pub thread_id: String,
    pub name: String,
    // Linked member account, if the candidate has one
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionThread {
    pub id: String,
    pub group_id: String,
    #[serde(default)]
    pub creator_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: ThreadStatus,
    pub vote_type: VoteType,
    pub deadline: Option<DateTime<Utc>>,
    // Eligible voter count, the denominator for engagement
    #[serde(default)]
    pub total_members: u32,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub org_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: u32,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub activity: f64,
    #[serde(default)]
    pub members_list: Vec<GroupMember>,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub org_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn yes(thread_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self::single(thread_id, user_id, "yes")
    }

    pub fn no(thread_id: impl Into<String>, user_id: Option<String>) -> Self {
        Self::single(thread_id, user_id, "no")
    }

    pub fn single(
        thread_id: impl Into<String>,
        user_id: Option<String>,
        option: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            thread_id: thread_id.into(),
            user_id,
            value: VoteValue::Single(option.into()),
            weight: 1.0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn multi(
        thread_id: impl Into<String>,
        user_id: Option<String>,
        options: Vec<String>,
    ) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            thread_id: thread_id.into(),
            user_id,
            value: VoteValue::Multi(options),
            weight: 1.0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

impl Comment {
    pub fn new(
        thread_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

impl Nomination {
    pub fn new(
        thread_id: impl Into<String>,
        name: impl Into<String>,
        user_id: Option<String>,
        email: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            name: name.into(),
            user_id,
            email: email.into(),
            label: label.into(),
            created_at: Utc::now(),
        }
    }
}

impl DecisionThread {
    pub fn new(
        group_id: impl Into<String>,
        creator_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        vote_type: VoteType,
        deadline_minutes: Option<i64>,
        total_members: u32,
    ) -> Self {
        let now = Utc::now();
        let deadline = deadline_minutes.map(|mins| now + chrono::Duration::minutes(mins));

        Self {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.into(),
            creator_id: creator_id.into(),
            title: title.into(),
            description: description.into(),
            status: ThreadStatus::Open,
            vote_type,
            deadline,
            total_members,
            created_at: now,
        }
    }
}
