pub mod cache;
pub mod engine;
pub mod models;
pub mod service;
pub mod store;
pub mod tasks;

// The computation entry points consumed by routing/presentation code
pub use engine::admin::{calc_growth, compose_admin_insights, AdminInsights};
pub use engine::aggregate::aggregate_votes;
pub use engine::consensus::{calculate_mcq_consensus, calculate_yesno_consensus};
pub use engine::group::{compose_group_metrics, GroupMetrics};
pub use engine::thread::{compose_thread_metrics, ThreadMetrics};
pub use engine::Consensus;
pub use service::{MetricsService, ServiceError};
