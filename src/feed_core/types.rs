//! Typed feed entities and the derived aggregate records

use std::collections::BTreeMap;

/// Strip leading `@` characters, keeping the original casing.
pub fn strip_handle(username: &str) -> &str {
    username.trim_start_matches('@')
}

/// Comparison form of a username: leading `@` stripped, lower-cased.
pub fn normalize_username(username: &str) -> String {
    strip_handle(username).to_lowercase()
}

/// "Last known destination" signal for a donor
#[derive(Debug, Clone, PartialEq)]
pub struct ReachEntry {
    pub id: String,
    pub donator: String,
    pub gotrobux: Option<String>,
    pub robux: Option<u64>,
    pub place_id: Option<String>,
    /// Epoch milliseconds
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Donator {
    pub username: String,
    pub display_name: String,
    pub pfp: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receiver {
    pub username: String,
    pub display_name: String,
}

/// One confirmed donor -> receiver transfer
#[derive(Debug, Clone, PartialEq)]
pub struct FoundEntry {
    pub id: String,
    pub donator: Donator,
    pub receiver: Receiver,
    pub donated_amount: u64,
    pub server_id: String,
    pub place_id: Option<String>,
    /// Raw "current/max" player count
    pub player_amount: Option<String>,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl FoundEntry {
    /// True when the upstream feed recorded the donor as its own receiver.
    pub fn is_self_attributed(&self) -> bool {
        normalize_username(&self.donator.username) == normalize_username(&self.receiver.username)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverAggregate {
    pub username: String,
    pub display_name: String,
    pub total_amount: u64,
}

/// Every transfer from one donor on one server, merged
#[derive(Debug, Clone, PartialEq)]
pub struct DonationAggregate {
    /// Id of the most recent contributing entry
    pub id: String,
    pub server_id: String,
    pub place_id: Option<String>,
    pub player_amount: Option<String>,
    pub donator: Donator,
    /// Keyed by normalized receiver username
    pub receivers: BTreeMap<String, ReceiverAggregate>,
    pub total_amount: u64,
    pub timestamp: i64,
}

impl DonationAggregate {
    /// Aggregate identity: normalized donor username + server id
    pub fn key(&self) -> (String, String) {
        (normalize_username(&self.donator.username), self.server_id.clone())
    }

    /// Saturating sum of the receiver buckets, matching how `total_amount` accumulates.
    pub fn receivers_total(&self) -> u64 {
        self.receivers
            .values()
            .fold(0u64, |acc, r| acc.saturating_add(r.total_amount))
    }
}
