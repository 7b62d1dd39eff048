//! Human-readable rendering helpers for the leaderboard

use super::games::game_name;
use super::types::{strip_handle, DonationAggregate};

/// "12s ago", "3m ago", "2h ago", "4d ago"
pub fn format_time_ago(timestamp_ms: i64, now_ms: i64) -> String {
    let seconds = (now_ms - timestamp_ms).max(0) / 1000;
    if seconds < 60 {
        return format!("{}s ago", seconds);
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}

/// Thousands-separated robux amount: 1234567 -> "1,234,567"
pub fn format_robux(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn server_short_id(server_id: &str) -> &str {
    match server_id.char_indices().nth(8) {
        Some((idx, _)) => &server_id[..idx],
        None => server_id,
    }
}

/// One leaderboard line for an aggregate.
pub fn render_aggregate(aggregate: &DonationAggregate, now_ms: i64) -> String {
    let receivers: Vec<String> = aggregate
        .receivers
        .values()
        .map(|r| format!("@{} ({})", strip_handle(&r.username), format_robux(r.total_amount)))
        .collect();

    let game = aggregate
        .place_id
        .as_deref()
        .and_then(game_name)
        .unwrap_or("?");

    format!(
        "@{} -> {} | R$ {} | {} | {} {} | {}",
        strip_handle(&aggregate.donator.username),
        receivers.join(", "),
        format_robux(aggregate.total_amount),
        game,
        server_short_id(&aggregate.server_id),
        aggregate.player_amount.as_deref().unwrap_or("-/-"),
        format_time_ago(aggregate.timestamp, now_ms),
    )
}
