//! JSONL event source: one enveloped inbound event per line

use crate::feed_core::normalizer::InboundEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardStats {
    pub forwarded: u64,
    pub skipped: u64,
}

/// Parse JSONL lines from `reader` and forward them into the ingestion channel.
///
/// Lines that are not valid events are logged and skipped. Stops at EOF or
/// when the receiving side is gone.
pub async fn forward_jsonl<R>(reader: R, tx: mpsc::Sender<InboundEvent>) -> std::io::Result<ForwardStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = ForwardStats::default();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match InboundEvent::from_jsonl(line) {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    log::warn!("⚠️  Ingestion channel closed, stopping reader");
                    break;
                }
                stats.forwarded += 1;
            }
            Err(e) => {
                log::warn!("Skipping unparseable line: {}", e);
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}
