pub mod admin;
pub mod aggregate;
pub mod consensus;
pub mod group;
pub mod thread;

use serde::Serialize;
use std::collections::HashMap;

// Derived verdict for one decision thread. Recomputed on every read, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct Consensus {
    // Share of votes behind the leading (or yes) option, 0-100
    pub agreement: f64,
    // Share of eligible voters who participated, 0-100
    pub engagement: f64,
    pub reached: bool,
    pub vote_counts: HashMap<String, f64>,
    pub total_votes: usize,
}
