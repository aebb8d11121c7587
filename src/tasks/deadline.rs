use crate::store::ThreadLifecycle;
use chrono::Utc;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::interval;

const CHECK_INTERVAL_SECONDS: u64 = 60;

// The engine only reads thread status; this task is the external actor that
// moves threads from open to closed once their deadline passes.
pub async fn close_expired_threads_task(store: Arc<dyn ThreadLifecycle>) {
    info!("Starting background task to close threads past their deadline...");
    let mut interval = interval(StdDuration::from_secs(CHECK_INTERVAL_SECONDS));

    loop {
        interval.tick().await;
        let now = Utc::now();

        match store.expired_open_threads(now).await {
            Ok(expired) => {
                if expired.is_empty() {
                    continue;
                }
                info!("Found {} thread(s) past their deadline.", expired.len());
                for thread in expired {
                    match store.close_thread(&thread.id).await {
                        Ok(_) => info!("Closed thread {} past its deadline", thread.id),
                        Err(e) => error!("Failed to close thread {}: {}", thread.id, e),
                    }
                }
            }
            Err(e) => {
                error!("Failed to query threads past their deadline: {}", e);
            }
        }
    }
}
