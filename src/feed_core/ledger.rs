//! Bounded, newest-first list of recent reach events

use super::types::ReachEntry;
use std::collections::VecDeque;

pub const DEFAULT_REACH_CAP: usize = 20;

#[derive(Debug, Clone)]
pub struct ReachLedger {
    entries: VecDeque<ReachEntry>,
    cap: usize,
}

impl ReachLedger {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// Prepend `entry`, dropping the oldest entries beyond the cap.
    pub fn push(&mut self, entry: ReachEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.cap);
    }

    /// Replace the contents with a backfill given oldest first.
    pub fn replace_oldest_first(&mut self, entries: Vec<ReachEntry>) {
        self.entries = entries.into_iter().rev().take(self.cap).collect();
    }

    /// Newest first
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &ReachEntry> + '_ {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<ReachEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Remove entries with `timestamp < cutoff_timestamp`, returning how many went.
    pub fn evict_older_than(&mut self, cutoff_timestamp: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.timestamp >= cutoff_timestamp);
        before - self.entries.len()
    }

    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
        self.entries.truncate(cap);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReachLedger {
    fn default() -> Self {
        Self::new(DEFAULT_REACH_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reach(id: &str, timestamp: i64) -> ReachEntry {
        ReachEntry {
            id: id.to_string(),
            donator: "alice".to_string(),
            gotrobux: Some("bob".to_string()),
            robux: None,
            place_id: None,
            timestamp,
        }
    }

    #[test]
    fn test_push_is_newest_first_and_capped() {
        let mut ledger = ReachLedger::new(3);
        for i in 0..5 {
            ledger.push(reach(&format!("r{}", i), i));
        }

        let ids: Vec<&str> = ledger.entries().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["r4", "r3", "r2"]);
    }

    #[test]
    fn test_evict_older_than() {
        let mut ledger = ReachLedger::default();
        ledger.push(reach("old", 1000));
        ledger.push(reach("edge", 2000));
        ledger.push(reach("new", 3000));

        assert_eq!(ledger.evict_older_than(2000), 1);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.evict_older_than(2000), 0);

        assert_eq!(ledger.evict_older_than(i64::MAX), 2);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_replace_oldest_first() {
        let mut ledger = ReachLedger::new(2);
        ledger.replace_oldest_first(vec![reach("a", 1), reach("b", 2), reach("c", 3)]);

        let ids: Vec<&str> = ledger.entries().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_shrinking_cap_truncates() {
        let mut ledger = ReachLedger::new(5);
        for i in 0..5 {
            ledger.push(reach(&format!("r{}", i), i));
        }
        ledger.set_cap(2);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries().next().unwrap().id, "r4");
    }
}
