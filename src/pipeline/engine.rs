//! Feed Engine - the single entry point for the transport and UI collaborators
//!
//! ## Architecture
//!
//! ```text
//! InboundEvent (reach | found | init)
//!     ↓
//! FeedEngine::on_event()
//!     ↓
//! normalizer → ReachLedger | AutoJoinPolicy + DonationAggregator
//!     ↓
//! FeedSubscriber callbacks (aggregate view, reach view, auto-join fired)
//! ```
//!
//! The engine owns all feed state. Callers that share it across tasks wrap it
//! in one `Arc<Mutex<FeedEngine>>` so that ingest, rebuild, sweep, and policy
//! evaluation always run as a single serialized step.

use super::config::FeedConfig;
use crate::feed_core::auto_join::{ArmState, AutoJoinDecision, AutoJoinPolicy, JoinRequest};
use crate::feed_core::normalizer::{self, InboundEvent, InitSnapshot, ValidationError};
use crate::feed_core::{
    DonationAggregate, DonationAggregator, ExpirySweep, FoundEntry, ReachEntry, ReachLedger,
    SweepReport,
};
use serde_json::Value;
use tokio::sync::mpsc;

/// Receives view changes and auto-join notifications from the engine
///
/// All methods default to no-ops so subscribers only implement what they need.
pub trait FeedSubscriber: Send {
    fn on_aggregate_changed(&mut self, _view: &[DonationAggregate]) {}

    fn on_reach_changed(&mut self, _view: &[ReachEntry]) {}

    /// `join` is `None` when the fired entry has no place id to join.
    fn on_auto_join_fired(&mut self, _entry: &FoundEntry, _join: Option<&JoinRequest>) {}
}

/// Owned copy of a subscriber notification
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    Aggregates(Vec<DonationAggregate>),
    Reach(Vec<ReachEntry>),
    AutoJoinFired {
        entry: FoundEntry,
        join: Option<JoinRequest>,
    },
}

/// Forwards every notification into an unbounded channel
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<FeedUpdate>,
}

impl ChannelSubscriber {
    pub fn new(tx: mpsc::UnboundedSender<FeedUpdate>) -> Self {
        Self { tx }
    }

    fn forward(&self, update: FeedUpdate) {
        if self.tx.send(update).is_err() {
            log::debug!("Feed update receiver dropped");
        }
    }
}

impl FeedSubscriber for ChannelSubscriber {
    fn on_aggregate_changed(&mut self, view: &[DonationAggregate]) {
        self.forward(FeedUpdate::Aggregates(view.to_vec()));
    }

    fn on_reach_changed(&mut self, view: &[ReachEntry]) {
        self.forward(FeedUpdate::Reach(view.to_vec()));
    }

    fn on_auto_join_fired(&mut self, entry: &FoundEntry, join: Option<&JoinRequest>) {
        self.forward(FeedUpdate::AutoJoinFired {
            entry: entry.clone(),
            join: join.cloned(),
        });
    }
}

pub struct FeedEngine {
    ledger: ReachLedger,
    aggregator: DonationAggregator,
    policy: AutoJoinPolicy,
    sweep: ExpirySweep,

    /// `auto_join_enabled` from the last applied config
    auto_join_enabled: bool,

    /// Most recent entry the auto-join policy fired on
    last_auto_join: Option<FoundEntry>,

    subscribers: Vec<Box<dyn FeedSubscriber>>,

    /// Epoch-millisecond clock (injectable for tests)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl FeedEngine {
    /// Create an engine on the system clock
    pub fn new(config: &FeedConfig) -> Self {
        Self::new_with_timestamp_fn(config, Box::new(|| chrono::Utc::now().timestamp_millis()))
    }

    /// Create an engine with a custom epoch-millisecond clock
    pub fn new_with_timestamp_fn(
        config: &FeedConfig,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        Self {
            ledger: ReachLedger::new(config.max_displayed_reach),
            aggregator: DonationAggregator::new(
                config.found_backlog_cap,
                config.max_displayed_donations,
            ),
            policy: AutoJoinPolicy::new(config.auto_join_criteria(), config.auto_join_enabled),
            sweep: ExpirySweep::new(config.feed_expiry_ms),
            auto_join_enabled: config.auto_join_enabled,
            last_auto_join: None,
            subscribers: Vec::new(),
            now_fn,
        }
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn FeedSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn now(&self) -> i64 {
        (self.now_fn)()
    }

    /// Dispatch an enveloped event from the transport.
    pub fn on_event(&mut self, event: &InboundEvent) -> Result<(), ValidationError> {
        match event {
            InboundEvent::Reach(raw) => self.on_reach(raw),
            InboundEvent::Found(raw) => self.on_found(raw).map(|_| ()),
            InboundEvent::Init(snapshot) => {
                self.on_init(snapshot);
                Ok(())
            }
        }
    }

    /// Ingest a raw reach payload.
    ///
    /// A new reach event can correct receivers of donations already in the
    /// backlog, so the aggregate view is rebuilt as well.
    pub fn on_reach(&mut self, raw: &Value) -> Result<(), ValidationError> {
        let entry = normalizer::normalize_reach(raw, self.now()).map_err(|e| {
            log::warn!("Dropped reach event: {}", e);
            e
        })?;

        log::debug!("reach {} from {}", entry.id, entry.donator);
        let before = self.aggregator.view().to_vec();
        self.ledger.push(entry);
        self.aggregator.rebuild(&self.ledger);

        self.notify_reach();
        if self.aggregator.view() != before.as_slice() {
            self.notify_aggregates();
        }
        Ok(())
    }

    /// Ingest a raw found payload.
    ///
    /// The auto-join policy sees the uncorrected entry before it joins the backlog.
    pub fn on_found(&mut self, raw: &Value) -> Result<AutoJoinDecision, ValidationError> {
        let entry = normalizer::normalize_found(raw, self.now()).map_err(|e| {
            log::warn!("Dropped found event: {}", e);
            e
        })?;

        let decision = self.policy.evaluate(&entry);
        if let AutoJoinDecision::Fire(fired) = &decision {
            self.fire_auto_join(fired);
        }

        self.aggregator.add_found(entry, &self.ledger);
        self.notify_aggregates();
        Ok(decision)
    }

    /// Replace all state with the backfill the transport sends on connect.
    ///
    /// Malformed members are dropped one by one. Auto-join is not consulted
    /// for backfilled donations. Returns the number of rejected members.
    pub fn on_init(&mut self, snapshot: &InitSnapshot) -> usize {
        let now = self.now();
        let mut rejected = 0;

        let reach: Vec<ReachEntry> = snapshot
            .reach
            .iter()
            .filter_map(|raw| match normalizer::normalize_reach(raw, now) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Dropped backfilled reach event: {}", e);
                    rejected += 1;
                    None
                }
            })
            .collect();

        let found: Vec<FoundEntry> = snapshot
            .found
            .iter()
            .filter_map(|raw| match normalizer::normalize_found(raw, now) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Dropped backfilled found event: {}", e);
                    rejected += 1;
                    None
                }
            })
            .collect();

        log::info!(
            "Backfill: {} reach, {} found ({} rejected)",
            reach.len(),
            found.len(),
            rejected
        );

        self.ledger.replace_oldest_first(reach);
        self.aggregator.replace_oldest_first(found, &self.ledger);
        self.notify_reach();
        self.notify_aggregates();
        rejected
    }

    /// Run one expiry sweep on the engine clock.
    pub fn tick(&mut self) -> SweepReport {
        let now = self.now();
        self.tick_at(now)
    }

    /// Run one expiry sweep with an explicit `now`.
    pub fn tick_at(&mut self, now_ms: i64) -> SweepReport {
        let before = self.aggregator.view().to_vec();
        let report = self.sweep.sweep(now_ms, &mut self.ledger, &mut self.aggregator);

        if !report.is_empty() {
            log::debug!(
                "🧹 Expiry sweep evicted {} reach, {} found (cutoff {})",
                report.reach_evicted,
                report.found_evicted,
                self.sweep.cutoff(now_ms)
            );
        }
        if report.reach_evicted > 0 {
            self.notify_reach();
        }
        if self.aggregator.view() != before.as_slice() {
            self.notify_aggregates();
        }
        report
    }

    /// Apply updated settings to a running engine.
    ///
    /// Caps and criteria take effect immediately. The arm state only changes
    /// when `auto_join_enabled` differs from the previously applied value, so
    /// re-applying an enabled config after a fire does not re-arm. Callers that
    /// persist settings should store `enabled = false` on the fired notification.
    pub fn apply_config(&mut self, config: &FeedConfig) {
        self.sweep = ExpirySweep::new(config.feed_expiry_ms);
        self.ledger.set_cap(config.max_displayed_reach);
        self.aggregator.set_caps(
            config.found_backlog_cap,
            config.max_displayed_donations,
            &self.ledger,
        );
        self.policy.set_criteria(config.auto_join_criteria());
        if config.auto_join_enabled != self.auto_join_enabled {
            self.auto_join_enabled = config.auto_join_enabled;
            if config.auto_join_enabled {
                self.policy.arm();
            } else {
                self.policy.disarm();
            }
        }

        self.notify_reach();
        self.notify_aggregates();
    }

    pub fn arm_auto_join(&mut self) {
        log::info!("Auto-join armed");
        self.policy.arm();
    }

    pub fn disarm_auto_join(&mut self) {
        log::info!("Auto-join disarmed");
        self.policy.disarm();
    }

    pub fn auto_join_state(&self) -> ArmState {
        self.policy.state()
    }

    pub fn last_auto_join(&self) -> Option<&FoundEntry> {
        self.last_auto_join.as_ref()
    }

    /// Sorted, capped leaderboard
    pub fn view(&self) -> &[DonationAggregate] {
        self.aggregator.view()
    }

    /// Reach entries, newest first
    pub fn reach_view(&self) -> Vec<ReachEntry> {
        self.ledger.snapshot()
    }

    pub fn backlog_len(&self) -> usize {
        self.aggregator.backlog_len()
    }

    fn fire_auto_join(&mut self, entry: &FoundEntry) {
        let join = JoinRequest::from_entry(entry);
        match &join {
            Some(request) => log::info!(
                "Auto-join fired: @{} donated {} on {} -> {}",
                entry.donator.username,
                entry.donated_amount,
                entry.server_id,
                request.join_url()
            ),
            None => log::error!(
                "Auto-join fired for {} but it has no placeId; cannot join",
                entry.id
            ),
        }

        self.last_auto_join = Some(entry.clone());
        for subscriber in self.subscribers.iter_mut() {
            subscriber.on_auto_join_fired(entry, join.as_ref());
        }
    }

    fn notify_aggregates(&mut self) {
        let view = self.aggregator.view();
        for subscriber in self.subscribers.iter_mut() {
            subscriber.on_aggregate_changed(view);
        }
    }

    fn notify_reach(&mut self) {
        let view = self.ledger.snapshot();
        for subscriber in self.subscribers.iter_mut() {
            subscriber.on_reach_changed(&view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    const NOW: i64 = 1_763_026_318_000;

    fn config() -> FeedConfig {
        FeedConfig {
            auto_join_game_filters: Default::default(),
            ..FeedConfig::default()
        }
    }

    fn engine_at(clock: Arc<AtomicI64>, config: &FeedConfig) -> FeedEngine {
        FeedEngine::new_with_timestamp_fn(config, Box::new(move || clock.load(Ordering::SeqCst)))
    }

    fn found(id: &str, donator: &str, receiver: &str, amount: u64, ts: i64) -> Value {
        json!({
            "id": id,
            "donator": {"username": donator, "displayName": donator, "pfp": ""},
            "receiver": {"username": receiver, "displayName": receiver},
            "donatedAmount": amount,
            "serverId": "S",
            "placeId": "8737602449",
            "playerAmount": "10/20",
            "timestamp": ts
        })
    }

    #[test]
    fn test_malformed_event_leaves_state_untouched() {
        let clock = Arc::new(AtomicI64::new(NOW));
        let mut engine = engine_at(clock, &config());
        engine.on_found(&found("1", "A", "B", 50, NOW)).unwrap();
        let before = engine.view().to_vec();

        let err = engine.on_found(&json!({"id": "2", "donatedAmount": 10})).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("donator"));
        assert!(engine.on_reach(&json!({"donator": 5})).is_err());

        assert_eq!(engine.view(), before.as_slice());
        assert_eq!(engine.backlog_len(), 1);
        assert!(engine.reach_view().is_empty());
    }

    #[test]
    fn test_reach_after_found_corrects_view() {
        let clock = Arc::new(AtomicI64::new(NOW));
        let mut engine = engine_at(clock, &config());
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.subscribe(Box::new(ChannelSubscriber::new(tx)));

        engine.on_found(&found("1", "@A", "@A", 100, NOW)).unwrap();
        engine
            .on_reach(&json!({"id": "r1", "donator": "A", "gotrobux": "B", "timestamp": NOW}))
            .unwrap();

        let view = engine.view();
        assert!(view[0].receivers.contains_key("b"));
        assert!(!view[0].receivers.contains_key("a"));

        assert!(matches!(rx.try_recv(), Ok(FeedUpdate::Aggregates(_))));
        assert!(matches!(rx.try_recv(), Ok(FeedUpdate::Reach(ref r)) if r.len() == 1));
        match rx.try_recv() {
            Ok(FeedUpdate::Aggregates(view)) => assert!(view[0].receivers.contains_key("b")),
            other => panic!("expected corrected aggregates, got {:?}", other),
        }
    }

    #[test]
    fn test_auto_join_fires_once_and_records() {
        let clock = Arc::new(AtomicI64::new(NOW));
        let config = FeedConfig {
            auto_join_enabled: true,
            auto_join_min_robux: 1000,
            ..config()
        };
        let mut engine = engine_at(clock, &config);
        let (tx, mut rx) = mpsc::unbounded_channel();
        engine.subscribe(Box::new(ChannelSubscriber::new(tx)));

        let first = engine.on_found(&found("1", "A", "B", 1500, NOW)).unwrap();
        let second = engine.on_found(&found("2", "C", "D", 2000, NOW)).unwrap();

        assert!(first.fired().is_some());
        assert_eq!(second, AutoJoinDecision::NotArmed);
        assert_eq!(engine.auto_join_state(), ArmState::Disarmed);
        assert_eq!(engine.last_auto_join().map(|e| e.id.as_str()), Some("1"));

        let mut fired = Vec::new();
        while let Ok(update) = rx.try_recv() {
            if let FeedUpdate::AutoJoinFired { entry, join } = update {
                fired.push((entry.id, join));
            }
        }
        assert_eq!(fired.len(), 1);
        assert_eq!(
            fired[0].1.as_ref().map(JoinRequest::join_url).as_deref(),
            Some("roblox://experiences/start?placeId=8737602449&gameInstanceId=S")
        );

        engine.arm_auto_join();
        let third = engine.on_found(&found("3", "E", "F", 2000, NOW)).unwrap();
        assert!(third.fired().is_some());
    }

    #[test]
    fn test_tick_expires_on_engine_clock() {
        let clock = Arc::new(AtomicI64::new(NOW));
        let config = config();
        let mut engine = engine_at(clock.clone(), &config);
        engine.on_found(&found("old", "A", "B", 10, NOW - 1_000)).unwrap();
        engine.on_found(&found("new", "C", "B", 10, NOW)).unwrap();
        engine
            .on_reach(&json!({"id": "r", "donator": "A", "timestamp": NOW - 1_000}))
            .unwrap();

        assert!(engine.tick().is_empty());

        clock.store(NOW + config.feed_expiry_ms - 500, Ordering::SeqCst);
        let report = engine.tick();
        assert_eq!(report.found_evicted, 1);
        assert_eq!(report.reach_evicted, 1);
        assert_eq!(engine.view().len(), 1);
        assert_eq!(engine.view()[0].id, "new");
    }

    #[test]
    fn test_init_backfill() {
        let clock = Arc::new(AtomicI64::new(NOW));
        let config = FeedConfig {
            auto_join_enabled: true,
            ..config()
        };
        let mut engine = engine_at(clock, &config);

        let snapshot = InitSnapshot {
            reach: vec![
                json!({"id": "r1", "donator": "A", "gotrobux": "Old", "timestamp": NOW - 20}),
                json!({"id": "r2", "donator": "A", "gotrobux": "New", "timestamp": NOW - 10}),
            ],
            found: vec![
                found("1", "A", "A", 100, NOW - 5),
                json!({"id": "bad"}),
                found("2", "C", "D", 40, NOW - 1),
            ],
        };

        assert_eq!(engine.on_init(&snapshot), 1);
        assert_eq!(engine.reach_view()[0].id, "r2");
        assert_eq!(engine.view().len(), 2);
        assert_eq!(engine.view()[0].id, "2");
        assert!(engine.view()[1].receivers.contains_key("new"));
        assert!(engine.last_auto_join().is_none());
        assert_eq!(engine.auto_join_state(), ArmState::Armed);
    }

    #[test]
    fn test_apply_config_shrinks_view() {
        let clock = Arc::new(AtomicI64::new(NOW));
        let mut engine = engine_at(clock, &config());
        for i in 0..10 {
            engine
                .on_found(&found(&i.to_string(), &format!("d{}", i), "R", 1, NOW + i))
                .unwrap();
        }
        assert_eq!(engine.view().len(), 10);

        let smaller = FeedConfig {
            max_displayed_donations: 3,
            found_backlog_cap: 5,
            auto_join_enabled: true,
            ..config()
        };
        engine.apply_config(&smaller);
        assert_eq!(engine.view().len(), 3);
        assert_eq!(engine.backlog_len(), 5);
        assert_eq!(engine.view()[0].id, "9");
        assert_eq!(engine.auto_join_state(), ArmState::Armed);
    }

    #[test]
    fn test_reapplying_enabled_config_does_not_rearm() {
        let clock = Arc::new(AtomicI64::new(NOW));
        let enabled = FeedConfig {
            auto_join_enabled: true,
            ..config()
        };
        let mut engine = engine_at(clock, &enabled);
        assert!(engine.on_found(&found("1", "A", "B", 10, NOW)).unwrap().fired().is_some());
        assert_eq!(engine.auto_join_state(), ArmState::Disarmed);

        engine.apply_config(&FeedConfig {
            auto_join_min_robux: 5,
            ..enabled.clone()
        });
        assert_eq!(engine.auto_join_state(), ArmState::Disarmed);
        assert_eq!(
            engine.on_found(&found("2", "A", "B", 10, NOW)).unwrap(),
            AutoJoinDecision::NotArmed
        );

        engine.apply_config(&config());
        engine.apply_config(&enabled);
        assert_eq!(engine.auto_join_state(), ArmState::Armed);
    }
}
