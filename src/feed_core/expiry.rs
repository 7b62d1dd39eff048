//! Rolling time-window eviction for the reach ledger and found backlog

use super::aggregator::DonationAggregator;
use super::ledger::ReachLedger;

pub const DEFAULT_FEED_EXPIRY_MS: i64 = 5 * 60 * 1000;

/// Entries evicted by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub reach_evicted: usize,
    pub found_evicted: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.reach_evicted == 0 && self.found_evicted == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExpirySweep {
    ttl_ms: i64,
}

impl ExpirySweep {
    pub fn new(ttl_ms: i64) -> Self {
        Self { ttl_ms }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// Entries with `timestamp < cutoff` are expired.
    pub fn cutoff(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.ttl_ms)
    }

    /// Evict expired entries from both containers and rebuild the view.
    ///
    /// The ledger goes first so the rebuild sees the post-sweep reach state.
    /// Safe to call repeatedly; a sweep with nothing to expire is a no-op
    /// apart from the rebuild.
    pub fn sweep(
        &self,
        now_ms: i64,
        ledger: &mut ReachLedger,
        aggregator: &mut DonationAggregator,
    ) -> SweepReport {
        let cutoff = self.cutoff(now_ms);
        let reach_evicted = ledger.evict_older_than(cutoff);
        let found_evicted = aggregator.evict_older_than(cutoff, ledger);

        SweepReport {
            reach_evicted,
            found_evicted,
        }
    }
}

impl Default for ExpirySweep {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_EXPIRY_MS)
    }
}
