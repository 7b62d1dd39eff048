//! Feed Runtime
//!
//! Reads enveloped reach/found/init events as JSONL, runs them through the
//! feed engine, and logs the leaderboard and any auto-join.
//!
//! Usage:
//!   cargo run --release --bin feed_runtime [events.jsonl]
//!
//! Without a path, events are read from stdin. See `FeedConfig::try_from_env`
//! for the environment variables.

use donation_feed::feed_core::format::render_aggregate;
use donation_feed::pipeline::{
    expiry_scheduler_task, forward_jsonl, start_feed_ingestion, ChannelSubscriber,
    FeedConfig, FeedEngine, FeedUpdate,
};
use dotenv::dotenv;
use log::{error, info};
use std::env;
use std::sync::{Arc, Mutex};
use tokio::io::BufReader;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("🚀 Donation feed runtime");

    let config = FeedConfig::try_from_env()?;
    info!("📊 Configuration:");
    info!("   ├─ Feed expiry: {}ms", config.feed_expiry_ms);
    info!(
        "   ├─ Displayed: {} donations, {} reach",
        config.max_displayed_donations, config.max_displayed_reach
    );
    info!("   ├─ Found backlog: {}", config.found_backlog_cap);
    info!(
        "   ├─ Auto-join: {} (min R$ {}, games {:?}, skip full: {})",
        if config.auto_join_enabled { "ARMED" } else { "off" },
        config.auto_join_min_robux,
        config.auto_join_game_filters,
        config.auto_join_skip_full
    );
    info!("   └─ Sweep interval: {}ms", config.sweep_interval_ms);

    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<FeedUpdate>();
    let mut engine = FeedEngine::new(&config);
    engine.subscribe(Box::new(ChannelSubscriber::new(update_tx)));
    let engine = Arc::new(Mutex::new(engine));

    let (tx, rx) = mpsc::channel(config.channel_buffer);

    let ingestion = tokio::spawn(start_feed_ingestion(rx, engine.clone()));
    let scheduler = tokio::spawn(expiry_scheduler_task(
        engine.clone(),
        config.sweep_interval_ms,
    ));

    let renderer = tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            match update {
                FeedUpdate::Aggregates(view) => {
                    let now = chrono::Utc::now().timestamp_millis();
                    info!("🏆 Recent donations ({})", view.len());
                    for aggregate in &view {
                        info!("   {}", render_aggregate(aggregate, now));
                    }
                }
                FeedUpdate::Reach(view) => {
                    log::debug!("📡 Reach ledger: {} entries", view.len());
                }
                FeedUpdate::AutoJoinFired { entry, join } => match join {
                    Some(request) => {
                        info!("🎯 Auto join: @{} R$ {}", entry.donator.username, entry.donated_amount);
                        println!("{}", request.join_url());
                    }
                    None => error!("❌ Auto join fired for {} without a placeId", entry.id),
                },
            }
        }
    });

    let source = env::args().nth(1);
    let reader = tokio::spawn(async move {
        let result = match source {
            Some(path) => {
                info!("📖 Reading events from {}", path);
                match tokio::fs::File::open(&path).await {
                    Ok(file) => forward_jsonl(BufReader::new(file), tx).await,
                    Err(e) => Err(e),
                }
            }
            None => {
                info!("📖 Reading events from stdin");
                forward_jsonl(BufReader::new(tokio::io::stdin()), tx).await
            }
        };
        match result {
            Ok(stats) => info!(
                "✅ Event source finished ({} forwarded, {} skipped)",
                stats.forwarded, stats.skipped
            ),
            Err(e) => error!("❌ Event source failed: {}", e),
        }
    });

    info!("🔄 Press CTRL+C to shutdown");

    let reader_abort = reader.abort_handle();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("⚠️  Received CTRL+C, shutting down...");
            reader_abort.abort();
        }
        _ = reader => {}
    }

    // Reader is gone, so its sender is dropped and ingestion drains and stops.
    let stats = ingestion.await?;
    scheduler.abort();
    let _ = scheduler.await;

    // Last engine handle: dropping it closes the update channel.
    drop(engine);
    let _ = renderer.await;

    info!(
        "✅ Feed runtime stopped ({} accepted, {} rejected)",
        stats.accepted, stats.rejected
    );
    Ok(())
}
