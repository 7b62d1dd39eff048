//! Feed Core - donation event correlation and aggregation
//!
//! # Architecture
//!
//! ```text
//! raw reach/found payload
//!     ↓
//! normalizer (validate, shape, default timestamp)
//!     ↓
//! reach → ReachLedger (newest first, capped)
//! found → AutoJoinPolicy (one-shot) → DonationAggregator backlog
//!     ↓
//! rebuild: ReceiverResolver (self-attribution fix) + donor/server merge
//!     ↓
//! sorted, capped leaderboard view
//!
//! ExpirySweep (periodic) → evict both containers → rebuild
//! ```

pub mod aggregator;
pub mod auto_join;
pub mod expiry;
pub mod format;
pub mod games;
pub mod ledger;
pub mod normalizer;
pub mod resolver;
pub mod types;

pub use aggregator::DonationAggregator;
pub use auto_join::{ArmState, AutoJoinCriteria, AutoJoinDecision, AutoJoinPolicy, JoinRequest};
pub use expiry::{ExpirySweep, SweepReport};
pub use ledger::ReachLedger;
pub use normalizer::{InboundEvent, InitSnapshot, ValidationError};
pub use resolver::ReceiverResolver;
pub use types::{DonationAggregate, Donator, FoundEntry, ReachEntry, Receiver, ReceiverAggregate};
