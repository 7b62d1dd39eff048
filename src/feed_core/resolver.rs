//! Receiver correction for self-attributed found events
//!
//! Upstream sometimes reports a transfer with the donor as its own receiver.
//! The true receiver is recovered from the newest reach event for that donor
//! that names a destination. The lookup is read-only and re-run on every
//! rebuild, since matching reach events can arrive after the donation.

use super::ledger::ReachLedger;
use super::types::{normalize_username, strip_handle, FoundEntry, Receiver};

pub struct ReceiverResolver<'a> {
    ledger: &'a ReachLedger,
}

impl<'a> ReceiverResolver<'a> {
    pub fn new(ledger: &'a ReachLedger) -> Self {
        Self { ledger }
    }

    /// Newest `gotrobux` (leading `@` stripped) recorded for `donator`.
    pub fn lookup(&self, donator: &str) -> Option<&'a str> {
        let wanted = normalize_username(donator);

        self.ledger
            .entries()
            .filter(|reach| normalize_username(&reach.donator) == wanted)
            .filter_map(|reach| reach.gotrobux.as_deref())
            .map(strip_handle)
            .find(|receiver| !receiver.is_empty())
    }

    /// The receiver to attribute `entry` to.
    ///
    /// Falls back to the recorded receiver when the entry is not
    /// self-attributed or no reach event correlates.
    pub fn resolve(&self, entry: &FoundEntry) -> Receiver {
        if entry.is_self_attributed() {
            if let Some(actual) = self.lookup(&entry.donator.username) {
                return Receiver {
                    username: actual.to_string(),
                    display_name: actual.to_string(),
                };
            }
        }

        entry.receiver.clone()
    }
}
