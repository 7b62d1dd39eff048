//! Live donation feed: correlates reach/found events into a capped
//! leaderboard and fires a one-shot auto-join when a donation qualifies.

pub mod feed_core;
pub mod pipeline;
