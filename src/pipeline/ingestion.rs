//! Feed ingestion - async channel processor for inbound events

use super::engine::FeedEngine;
use super::lock_engine;
use crate::feed_core::normalizer::InboundEvent;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Counters reported when ingestion stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    pub accepted: u64,
    pub rejected: u64,
}

/// Drain inbound events into the engine until the channel closes
///
/// Each event is processed under a single lock acquisition, so it is fully
/// normalized, correlated, aggregated and policy-checked before the next one
/// (or an expiry sweep) can touch the engine.
pub async fn start_feed_ingestion(
    mut rx: mpsc::Receiver<InboundEvent>,
    engine: Arc<Mutex<FeedEngine>>,
) -> IngestionStats {
    log::info!("🚀 Starting feed ingestion");

    let mut stats = IngestionStats::default();
    let mut window_count = 0u64;
    let mut last_log_time = std::time::Instant::now();

    while let Some(event) = rx.recv().await {
        let result = {
            let mut engine_guard = lock_engine(&engine);
            engine_guard.on_event(&event)
        };

        match result {
            Ok(()) => stats.accepted += 1,
            // Already logged by the engine
            Err(_) => stats.rejected += 1,
        }
        window_count += 1;

        if last_log_time.elapsed().as_secs() >= 10 {
            let events_per_sec = window_count as f64 / last_log_time.elapsed().as_secs_f64();
            log::info!(
                "📊 Ingestion rate: {:.1} events/sec (accepted: {}, rejected: {})",
                events_per_sec,
                stats.accepted,
                stats.rejected
            );
            last_log_time = std::time::Instant::now();
            window_count = 0;
        }
    }

    log::warn!("⚠️  Event channel closed, stopping ingestion");
    log::info!(
        "✅ Feed ingestion stopped (accepted: {}, rejected: {})",
        stats.accepted,
        stats.rejected
    );
    stats
}
