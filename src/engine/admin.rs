use crate::engine::group::ThreadVoteCount;
use crate::engine::thread::NomineeCount;
use crate::models::{Comment, DecisionThread, Group, Nomination, User, Vote};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

const TOP_LIMIT: usize = 5;
const WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub groups: usize,
    pub threads: usize,
    pub votes: usize,
    pub comments: usize,
    pub users: usize,
    pub nominations: usize,
}

// Percentage change between the last 30-day window and the one before it
#[derive(Debug, Clone, Serialize)]
pub struct GrowthRates {
    pub groups: f64,
    pub threads: f64,
    pub votes: f64,
    pub comments: f64,
    pub users: f64,
    pub nominations: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Averages {
    pub votes_per_thread: f64,
    pub comments_per_thread: f64,
    pub threads_per_group: f64,
    pub members_per_group: f64,
    pub nominations_per_thread: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMemberCount {
    pub group: Group,
    pub members: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserActivity {
    pub user: User,
    pub votes: usize,
    pub comments: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCount {
    pub user_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadEngagement {
    pub thread: DecisionThread,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupEngagement {
    pub group: Group,
    pub score: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminInsights {
    pub totals: Totals,
    pub growth: GrowthRates,
    pub averages: Averages,
    pub top_groups: Vec<GroupMemberCount>,
    pub top_threads: Vec<ThreadVoteCount>,
    pub top_users: Vec<UserActivity>,
    pub top_voters: Vec<UserCount>,
    pub top_commenters: Vec<UserCount>,
    pub top_nominees: Vec<NomineeCount>,
    // "<weekday abbrev>-<hour>" -> vote + comment events
    pub activity_heatmap: BTreeMap<String, u64>,
    pub most_active_day: Option<String>,
    pub most_active_hour: Option<u32>,
    pub highest_engagement_thread: Option<ThreadEngagement>,
    pub highest_engagement_group: Option<GroupEngagement>,
    pub retention_rate: f64,
    pub churn_rate: f64,
}

// Growth between the two most recent 30-day windows. An empty previous
// window reads as 100% growth rather than a division by zero.
pub fn calc_growth<I>(created: I, now: DateTime<Utc>) -> f64
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let window = Duration::days(WINDOW_DAYS);
    let last_start = now - window;
    let prev_start = last_start - window;

    let mut last30 = 0u64;
    let mut prev30 = 0u64;
    for created_at in created {
        if created_at >= last_start {
            last30 += 1;
        } else if created_at >= prev_start {
            prev30 += 1;
        }
    }

    if prev30 == 0 {
        100.0
    } else {
        (last30 as f64 - prev30 as f64) / prev30 as f64 * 100.0
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn compose_admin_insights(
    groups: &[Group],
    threads: &[DecisionThread],
    votes: &[Vote],
    comments: &[Comment],
    users: &[User],
    nominations: &[Nomination],
    now: DateTime<Utc>,
) -> AdminInsights {
    let totals = Totals {
        groups: groups.len(),
        threads: threads.len(),
        votes: votes.len(),
        comments: comments.len(),
        users: users.len(),
        nominations: nominations.len(),
    };

    let growth = GrowthRates {
        groups: calc_growth(groups.iter().map(|group| group.created_at), now),
        threads: calc_growth(threads.iter().map(|thread| thread.created_at), now),
        votes: calc_growth(votes.iter().map(|vote| vote.created_at), now),
        comments: calc_growth(comments.iter().map(|comment| comment.created_at), now),
        users: calc_growth(users.iter().map(|user| user.created_at), now),
        nominations: calc_growth(nominations.iter().map(|n| n.created_at), now),
    };

    let total_group_members: usize = groups.iter().map(|group| group.members as usize).sum();
    let averages = Averages {
        votes_per_thread: ratio(votes.len(), threads.len()),
        comments_per_thread: ratio(comments.len(), threads.len()),
        threads_per_group: ratio(threads.len(), groups.len()),
        members_per_group: ratio(total_group_members, groups.len()),
        nominations_per_thread: ratio(nominations.len(), threads.len()),
    };

    // Votes per thread, shared by several rankings below
    let mut votes_per_thread: HashMap<&str, usize> = HashMap::new();
    for vote in votes {
        *votes_per_thread.entry(vote.thread_id.as_str()).or_insert(0) += 1;
    }
    let mut comments_per_thread: HashMap<&str, usize> = HashMap::new();
    for comment in comments {
        *comments_per_thread.entry(comment.thread_id.as_str()).or_insert(0) += 1;
    }

    let mut top_groups: Vec<GroupMemberCount> = groups
        .iter()
        .map(|group| GroupMemberCount {
            members: group.members,
            group: group.clone(),
        })
        .collect();
    top_groups.sort_by(|a, b| b.members.cmp(&a.members));
    top_groups.truncate(TOP_LIMIT);

    let mut top_threads: Vec<ThreadVoteCount> = threads
        .iter()
        .map(|thread| ThreadVoteCount {
            votes: votes_per_thread.get(thread.id.as_str()).copied().unwrap_or(0),
            thread: thread.clone(),
        })
        .collect();
    top_threads.sort_by(|a, b| b.votes.cmp(&a.votes));
    top_threads.truncate(TOP_LIMIT);

    let mut top_users: Vec<UserActivity> = users
        .iter()
        .map(|user| {
            let vote_count = votes
                .iter()
                .filter(|vote| vote.user_id.as_deref() == Some(user.id.as_str()))
                .count();
            let comment_count = comments
                .iter()
                .filter(|comment| comment.user_id == user.id)
                .count();
            UserActivity {
                user: user.clone(),
                votes: vote_count,
                comments: comment_count,
                total: vote_count + comment_count,
            }
        })
        .collect();
    top_users.sort_by(|a, b| b.total.cmp(&a.total));
    top_users.truncate(TOP_LIMIT);

    let top_voters = rank_by_count(votes.iter().filter_map(|vote| vote.user_id.as_deref()));
    let top_commenters = rank_by_count(comments.iter().map(|comment| comment.user_id.as_str()));

    let mut top_nominees: Vec<NomineeCount> = nominations
        .iter()
        .map(|nomination| NomineeCount {
            votes: votes
                .iter()
                .filter(|vote| vote.value.as_single() == Some(nomination.id.as_str()))
                .count(),
            nomination: nomination.clone(),
        })
        .collect();
    top_nominees.sort_by(|a, b| b.votes.cmp(&a.votes));
    top_nominees.truncate(TOP_LIMIT);

    // Fold votes and comments into one weekday-hour heatmap
    let mut activity_heatmap: BTreeMap<String, u64> = BTreeMap::new();
    let activity_times = votes
        .iter()
        .map(|vote| vote.created_at)
        .chain(comments.iter().map(|comment| comment.created_at));
    for created_at in activity_times {
        let key = format!("{}-{}", created_at.format("%a"), created_at.format("%H"));
        *activity_heatmap.entry(key).or_insert(0) += 1;
    }

    let mut day_totals: BTreeMap<String, u64> = BTreeMap::new();
    let mut hour_totals: BTreeMap<u32, u64> = BTreeMap::new();
    for (key, count) in &activity_heatmap {
        if let Some((day, hour)) = key.rsplit_once('-') {
            *day_totals.entry(day.to_string()).or_insert(0) += count;
            if let Ok(hour) = hour.parse::<u32>() {
                *hour_totals.entry(hour).or_insert(0) += count;
            }
        }
    }

    let mut most_active_day: Option<(String, u64)> = None;
    for (day, count) in &day_totals {
        let replace = match &most_active_day {
            Some((_, best)) => count > best,
            None => true,
        };
        if replace {
            most_active_day = Some((day.clone(), *count));
        }
    }

    let mut most_active_hour: Option<(u32, u64)> = None;
    for (hour, count) in &hour_totals {
        let replace = match &most_active_hour {
            Some((_, best)) => count > best,
            None => true,
        };
        if replace {
            most_active_hour = Some((*hour, *count));
        }
    }

    // First-max-wins folds, like the winning-nominee reduction
    let mut highest_engagement_thread: Option<ThreadEngagement> = None;
    for thread in threads {
        let activity = votes_per_thread.get(thread.id.as_str()).copied().unwrap_or(0)
            + comments_per_thread.get(thread.id.as_str()).copied().unwrap_or(0);
        let score = activity as f64 / thread.total_members.max(1) as f64;
        let replace = match &highest_engagement_thread {
            Some(best) => score > best.score,
            None => true,
        };
        if replace {
            highest_engagement_thread = Some(ThreadEngagement {
                thread: thread.clone(),
                score,
            });
        }
    }

    let mut highest_engagement_group: Option<GroupEngagement> = None;
    for group in groups {
        let group_threads: Vec<&DecisionThread> = threads
            .iter()
            .filter(|thread| thread.group_id == group.id)
            .collect();
        let group_votes: usize = group_threads
            .iter()
            .map(|thread| votes_per_thread.get(thread.id.as_str()).copied().unwrap_or(0))
            .sum();
        let score = group_threads.len() + group_votes;
        let replace = match &highest_engagement_group {
            Some(best) => score > best.score,
            None => true,
        };
        if replace {
            highest_engagement_group = Some(GroupEngagement {
                group: group.clone(),
                score,
            });
        }
    }

    // Users active in the last 30 days, from votes and comments
    let window_start = now - Duration::days(WINDOW_DAYS);
    let mut active_ids: HashSet<&str> = HashSet::new();
    for vote in votes {
        if vote.created_at >= window_start {
            if let Some(user_id) = vote.user_id.as_deref() {
                active_ids.insert(user_id);
            }
        }
    }
    for comment in comments {
        if comment.created_at >= window_start {
            active_ids.insert(comment.user_id.as_str());
        }
    }
    let retention_rate = if users.is_empty() {
        0.0
    } else {
        active_ids.len() as f64 / users.len() as f64 * 100.0
    };
    let churn_rate = 100.0 - retention_rate;

    AdminInsights {
        totals,
        growth,
        averages,
        top_groups,
        top_threads,
        top_users,
        top_voters,
        top_commenters,
        top_nominees,
        activity_heatmap,
        most_active_day: most_active_day.map(|(day, _)| day),
        most_active_hour: most_active_hour.map(|(hour, _)| hour),
        highest_engagement_thread,
        highest_engagement_group,
        retention_rate,
        churn_rate,
    }
}

// Count occurrences per user id, ranked descending; first appearance order
// breaks ties so the result is stable with respect to the input.
fn rank_by_count<'a, I>(ids: I) -> Vec<UserCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for id in ids {
        if !counts.contains_key(id) {
            order.push(id);
        }
        *counts.entry(id).or_insert(0) += 1;
    }

    let mut ranked: Vec<UserCount> = order
        .into_iter()
        .map(|id| UserCount {
            user_id: id.to_string(),
            count: counts[id],
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(TOP_LIMIT);
    ranked
}
