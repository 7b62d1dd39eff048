//! Donor+server aggregation over the found-event backlog
//!
//! The view is always recomputed from the full backlog. Receiver correction
//! depends on the current reach ledger, which changes independently of
//! found-event arrival, so an incremental merge could drift from what a
//! fresh rebuild would show.

use super::ledger::ReachLedger;
use super::resolver::ReceiverResolver;
use super::types::{normalize_username, strip_handle, DonationAggregate, FoundEntry, ReceiverAggregate};
use std::collections::{BTreeMap, HashMap, VecDeque};

pub const DEFAULT_BACKLOG_CAP: usize = 500;
pub const DEFAULT_DISPLAY_CAP: usize = 20;

#[derive(Debug, Clone)]
pub struct DonationAggregator {
    /// Raw found events, newest first
    backlog: VecDeque<FoundEntry>,
    backlog_cap: usize,
    display_cap: usize,
    view: Vec<DonationAggregate>,
}

impl DonationAggregator {
    pub fn new(backlog_cap: usize, display_cap: usize) -> Self {
        Self {
            backlog: VecDeque::with_capacity(backlog_cap),
            backlog_cap,
            display_cap,
            view: Vec::new(),
        }
    }

    /// Prepend `entry` to the backlog, cap it, and rebuild the view.
    ///
    /// Auto-join evaluation happens before this, against the uncorrected entry.
    pub fn add_found(&mut self, entry: FoundEntry, ledger: &ReachLedger) {
        self.backlog.push_front(entry);
        let dropped = self.backlog.len().saturating_sub(self.backlog_cap);
        if dropped > 0 {
            self.backlog.truncate(self.backlog_cap);
            log::trace!("Backlog at capacity, dropped {} oldest found events", dropped);
        }
        self.rebuild(ledger);
    }

    /// Replace the backlog with a backfill given oldest first.
    pub fn replace_oldest_first(&mut self, entries: Vec<FoundEntry>, ledger: &ReachLedger) {
        self.backlog = entries.into_iter().rev().take(self.backlog_cap).collect();
        self.rebuild(ledger);
    }

    /// Remove backlog entries with `timestamp < cutoff_timestamp`, then rebuild.
    pub fn evict_older_than(&mut self, cutoff_timestamp: i64, ledger: &ReachLedger) -> usize {
        let before = self.backlog.len();
        self.backlog.retain(|e| e.timestamp >= cutoff_timestamp);
        let evicted = before - self.backlog.len();
        self.rebuild(ledger);
        evicted
    }

    /// Recompute the sorted, capped view from the whole backlog.
    pub fn rebuild(&mut self, ledger: &ReachLedger) {
        self.view = build_view(self.backlog.iter().rev(), ledger, self.display_cap);
    }

    pub fn view(&self) -> &[DonationAggregate] {
        &self.view
    }

    /// Newest first
    pub fn backlog(&self) -> impl Iterator<Item = &FoundEntry> + '_ {
        self.backlog.iter()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn set_caps(&mut self, backlog_cap: usize, display_cap: usize, ledger: &ReachLedger) {
        self.backlog_cap = backlog_cap;
        self.display_cap = display_cap;
        self.backlog.truncate(backlog_cap);
        self.rebuild(ledger);
    }
}

impl Default for DonationAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_BACKLOG_CAP, DEFAULT_DISPLAY_CAP)
    }
}

/// Merge found events, given oldest first, into donor+server aggregates.
///
/// Totals saturate at `u64::MAX` rather than overflow.
///
/// Iterating oldest to newest makes "first non-null place id" and
/// "latest non-null player count" fall out of plain assignment order.
pub fn build_view<'e>(
    oldest_first: impl Iterator<Item = &'e FoundEntry>,
    ledger: &ReachLedger,
    display_cap: usize,
) -> Vec<DonationAggregate> {
    let resolver = ReceiverResolver::new(ledger);
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut aggregates: Vec<DonationAggregate> = Vec::new();

    for entry in oldest_first {
        let receiver = resolver.resolve(entry);
        let receiver_key = normalize_username(&receiver.username);
        let key = (normalize_username(&entry.donator.username), entry.server_id.clone());

        match index.get(&key).copied() {
            Some(slot) => {
                let existing = &mut aggregates[slot];
                let bucket = existing
                    .receivers
                    .entry(receiver_key)
                    .or_insert_with(|| ReceiverAggregate {
                        username: strip_handle(&receiver.username).to_string(),
                        display_name: receiver.display_name.clone(),
                        total_amount: 0,
                    });
                bucket.total_amount = bucket.total_amount.saturating_add(entry.donated_amount);
                existing.total_amount = existing.total_amount.saturating_add(entry.donated_amount);

                if entry.timestamp > existing.timestamp {
                    existing.timestamp = entry.timestamp;
                    existing.id = entry.id.clone();
                }
                if existing.place_id.is_none() {
                    existing.place_id = entry.place_id.clone();
                }
                if entry.player_amount.is_some() {
                    existing.player_amount = entry.player_amount.clone();
                }
            }
            None => {
                let mut receivers = BTreeMap::new();
                receivers.insert(
                    receiver_key,
                    ReceiverAggregate {
                        username: strip_handle(&receiver.username).to_string(),
                        display_name: receiver.display_name.clone(),
                        total_amount: entry.donated_amount,
                    },
                );

                index.insert(key, aggregates.len());
                aggregates.push(DonationAggregate {
                    id: entry.id.clone(),
                    server_id: entry.server_id.clone(),
                    place_id: entry.place_id.clone(),
                    player_amount: entry.player_amount.clone(),
                    donator: entry.donator.clone(),
                    receivers,
                    total_amount: entry.donated_amount,
                    timestamp: entry.timestamp,
                });
            }
        }
    }

    // Stable: ties keep first-appearance order
    aggregates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    aggregates.truncate(display_cap);
    aggregates
}
