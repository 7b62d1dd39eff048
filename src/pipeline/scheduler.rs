//! Expiry sweep scheduler

use super::engine::FeedEngine;
use super::lock_engine;
use std::sync::{Arc, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Periodically expire stale reach/found entries
///
/// Each sweep takes the same engine lock as ingestion, so a sweep never
/// overlaps an in-flight event. Runs until the task is cancelled.
pub async fn expiry_scheduler_task(engine: Arc<Mutex<FeedEngine>>, sweep_interval_ms: u64) {
    log::info!("⏰ Starting expiry scheduler (interval: {}ms)", sweep_interval_ms);

    let mut timer = interval(Duration::from_millis(sweep_interval_ms));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;

        // The engine logs what the sweep evicted
        lock_engine(&engine).tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::config::FeedConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_expires_entries() {
        let clock = Arc::new(AtomicI64::new(1_000_000));
        let config = FeedConfig {
            feed_expiry_ms: 5_000,
            ..FeedConfig::default()
        };
        let engine_clock = clock.clone();
        let engine = Arc::new(Mutex::new(FeedEngine::new_with_timestamp_fn(
            &config,
            Box::new(move || engine_clock.load(Ordering::SeqCst)),
        )));

        lock_engine(&engine)
            .on_reach(&json!({"id": "r1", "donator": "A", "gotrobux": "B"}))
            .unwrap();

        let task = tokio::spawn(expiry_scheduler_task(engine.clone(), 1_000));

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(lock_engine(&engine).reach_view().len(), 1);

        clock.store(1_000_000 + 5_001, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert!(lock_engine(&engine).reach_view().is_empty());

        task.abort();
    }
}
