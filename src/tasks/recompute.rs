use crate::engine::thread::ThreadMetrics;
use crate::service::MetricsService;
use log::{error, info};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

// A change to any of a thread's inputs. Whoever persists the write sends
// one of these; the feed refetches a snapshot and recomputes in full.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    VoteCast { thread_id: String },
    CommentPosted { thread_id: String },
    NominationAdded { thread_id: String },
}

impl ChangeEvent {
    pub fn thread_id(&self) -> &str {
        match self {
            ChangeEvent::VoteCast { thread_id }
            | ChangeEvent::CommentPosted { thread_id }
            | ChangeEvent::NominationAdded { thread_id } => thread_id,
        }
    }
}

// Subscribers start from None until the first snapshot lands, so a loading
// feed is distinguishable from one that computed an empty result.
pub fn metrics_channel() -> (
    watch::Sender<Option<ThreadMetrics>>,
    watch::Receiver<Option<ThreadMetrics>>,
) {
    watch::channel(None)
}

// Live metrics for one thread: publish an initial snapshot, then recompute
// from a fresh snapshot on every matching change event. No incremental
// state; every update is a full fold over the refetched records.
pub async fn thread_metrics_feed(
    service: Arc<MetricsService>,
    thread_id: String,
    mut changes: mpsc::Receiver<ChangeEvent>,
    updates: watch::Sender<Option<ThreadMetrics>>,
) {
    info!("Starting live metrics feed for thread {}", thread_id);
    publish(&service, &thread_id, &updates).await;

    while let Some(event) = changes.recv().await {
        if event.thread_id() != thread_id {
            continue;
        }
        service.invalidate_thread(&thread_id);
        publish(&service, &thread_id, &updates).await;
    }

    info!("Change stream closed, stopping feed for thread {}", thread_id);
}

async fn publish(
    service: &MetricsService,
    thread_id: &str,
    updates: &watch::Sender<Option<ThreadMetrics>>,
) {
    match service.thread_metrics(thread_id).await {
        Ok(metrics) => {
            // Send fails only when every receiver is gone; the feed keeps
            // running so late subscribers still get the next update
            let _ = updates.send(Some(metrics));
        }
        Err(e) => error!("Failed to recompute metrics for thread {}: {}", thread_id, e),
    }
}
