//! # Feed Pipeline
//!
//! Runtime wiring around the feed core:
//!
//! - `config` - environment-driven settings
//! - `engine` - `FeedEngine`, the composition root and subscriber fan-out
//! - `ingestion` - channel consumer feeding events into the engine
//! - `scheduler` - periodic expiry sweep
//! - `reader` - JSONL event source standing in for the socket transport
//!
//! The engine is shared as `Arc<Mutex<FeedEngine>>`. Ingestion and the
//! scheduler each hold the lock for one whole operation, never across an await.

pub mod config;
pub mod engine;
pub mod ingestion;
pub mod reader;
pub mod scheduler;

pub use config::{ConfigError, FeedConfig};
pub use engine::{ChannelSubscriber, FeedEngine, FeedSubscriber, FeedUpdate};
pub use ingestion::{start_feed_ingestion, IngestionStats};
pub use reader::{forward_jsonl, ForwardStats};
pub use scheduler::expiry_scheduler_task;

use std::sync::{Arc, Mutex, MutexGuard};

/// Lock the shared engine, recovering the state if a holder panicked.
pub fn lock_engine(engine: &Arc<Mutex<FeedEngine>>) -> MutexGuard<'_, FeedEngine> {
    engine.lock().unwrap_or_else(|poisoned| {
        log::error!("Feed engine lock was poisoned, continuing with last state");
        poisoned.into_inner()
    })
}
