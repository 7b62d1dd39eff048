//! One-shot auto-join policy
//!
//! The policy is a two-state machine. `evaluate` is the only transition out of
//! [`ArmState::Armed`] and it happens in the same call that returns
//! [`AutoJoinDecision::Fire`], so two events can never both fire for one arming.
//! Re-arming is always an explicit call.

use super::games::game_name;
use super::types::FoundEntry;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    Armed,
    Disarmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoJoinCriteria {
    pub min_amount: u64,
    /// Game names; empty means any place qualifies
    pub game_filter: HashSet<String>,
    pub skip_full_servers: bool,
}

impl Default for AutoJoinCriteria {
    fn default() -> Self {
        Self {
            min_amount: 0,
            game_filter: HashSet::from(["Main".to_string()]),
            skip_full_servers: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AutoJoinDecision {
    /// Policy is not armed
    NotArmed,
    BelowMinimum,
    ServerFull,
    /// Place is unmapped or its game is not in the filter
    GameFiltered,
    /// Policy fired and is now disarmed
    Fire(FoundEntry),
}

impl AutoJoinDecision {
    pub fn fired(&self) -> Option<&FoundEntry> {
        match self {
            AutoJoinDecision::Fire(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Request handed to whatever performs the actual server join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub place_id: String,
    pub server_id: String,
}

impl JoinRequest {
    /// `None` when the entry carries no place id.
    pub fn from_entry(entry: &FoundEntry) -> Option<Self> {
        let place_id = entry.place_id.as_ref().filter(|p| !p.is_empty())?;
        Some(Self {
            place_id: place_id.clone(),
            server_id: entry.server_id.clone(),
        })
    }

    pub fn join_url(&self) -> String {
        format!(
            "roblox://experiences/start?placeId={}&gameInstanceId={}",
            self.place_id, self.server_id
        )
    }
}

/// Parse a `"current/max"` player count.
pub fn parse_player_amount(player_amount: &str) -> Option<(u32, u32)> {
    let (current, max) = player_amount.split_once('/')?;
    if max.contains('/') {
        return None;
    }
    Some((current.trim().parse().ok()?, max.trim().parse().ok()?))
}

/// Unparseable counts are never considered full.
pub fn is_server_full(player_amount: &str) -> bool {
    parse_player_amount(player_amount).is_some_and(|(current, max)| current >= max)
}

#[derive(Debug, Clone)]
pub struct AutoJoinPolicy {
    state: ArmState,
    criteria: AutoJoinCriteria,
}

impl AutoJoinPolicy {
    pub fn new(criteria: AutoJoinCriteria, armed: bool) -> Self {
        Self {
            state: if armed { ArmState::Armed } else { ArmState::Disarmed },
            criteria,
        }
    }

    /// Evaluate a raw (uncorrected) found entry against the policy.
    pub fn evaluate(&mut self, entry: &FoundEntry) -> AutoJoinDecision {
        if self.state != ArmState::Armed {
            return AutoJoinDecision::NotArmed;
        }

        if entry.donated_amount < self.criteria.min_amount {
            return AutoJoinDecision::BelowMinimum;
        }

        if self.criteria.skip_full_servers
            && entry.player_amount.as_deref().is_some_and(is_server_full)
        {
            return AutoJoinDecision::ServerFull;
        }

        if !self.criteria.game_filter.is_empty() {
            let game = entry.place_id.as_deref().and_then(game_name);
            match game {
                Some(name) if self.criteria.game_filter.contains(name) => {}
                _ => return AutoJoinDecision::GameFiltered,
            }
        }

        self.state = ArmState::Disarmed;
        AutoJoinDecision::Fire(entry.clone())
    }

    pub fn arm(&mut self) {
        self.state = ArmState::Armed;
    }

    pub fn disarm(&mut self) {
        self.state = ArmState::Disarmed;
    }

    pub fn state(&self) -> ArmState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == ArmState::Armed
    }

    pub fn criteria(&self) -> &AutoJoinCriteria {
        &self.criteria
    }

    /// Replace the criteria without touching the arm state.
    pub fn set_criteria(&mut self, criteria: AutoJoinCriteria) {
        self.criteria = criteria;
    }
}

impl Default for AutoJoinPolicy {
    fn default() -> Self {
        Self::new(AutoJoinCriteria::default(), false)
    }
}
