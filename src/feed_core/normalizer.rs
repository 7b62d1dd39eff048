//! Inbound event validation: raw JSON payloads -> typed feed entries
//!
//! A payload either normalizes completely or is rejected with a
//! [`ValidationError`]; nothing is ever partially inserted.

use super::types::{Donator, FoundEntry, Receiver, ReachEntry};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("field must be a non-empty string: {0}")]
    EmptyField(&'static str),

    #[error("field has an unexpected type: {0}")]
    InvalidField(&'static str),

    #[error("donatedAmount must be a positive number")]
    NonPositiveAmount,

    #[error("donatedAmount must be a whole robux amount")]
    FractionalAmount,

    #[error("donatedAmount is too large")]
    AmountOutOfRange,

    #[error("unknown event kind: {0}")]
    UnknownKind(String),
}

/// Event envelope as relayed by the transport
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum InboundEvent {
    Reach(Value),
    Found(Value),
    Init(InitSnapshot),
}

impl InboundEvent {
    /// Parse one JSONL line.
    pub fn from_jsonl(line: &str) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| ValidationError::Malformed(e.to_string()))?;

        match value.get("event").and_then(Value::as_str) {
            Some("reach") | Some("found") | Some("init") => serde_json::from_value(value)
                .map_err(|e| ValidationError::Malformed(e.to_string())),
            Some(other) => Err(ValidationError::UnknownKind(other.to_string())),
            None => Err(ValidationError::MissingField("event")),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Reach(_) => "reach",
            InboundEvent::Found(_) => "found",
            InboundEvent::Init(_) => "init",
        }
    }
}

/// Backfill sent on connect, both lists oldest first
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InitSnapshot {
    #[serde(default)]
    pub reach: Vec<Value>,
    #[serde(default)]
    pub found: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReach {
    id: Option<Value>,
    donator: Option<String>,
    gotrobux: Option<String>,
    robux: Option<Value>,
    place_id: Option<Value>,
    timestamp: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDonator {
    username: Option<String>,
    display_name: Option<String>,
    pfp: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceiver {
    username: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFound {
    id: Option<Value>,
    donator: Option<RawDonator>,
    receiver: Option<RawReceiver>,
    donated_amount: Option<Value>,
    server_id: Option<String>,
    place_id: Option<Value>,
    player_amount: Option<String>,
    timestamp: Option<Value>,
}

/// Ids and place ids show up both as strings and as numbers upstream.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_id(value: Option<Value>) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField("id"))?;
    scalar_to_string(&value).ok_or(ValidationError::InvalidField("id"))
}

fn required_str(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        None => Err(ValidationError::MissingField(field)),
        Some(s) if s.trim().is_empty() => Err(ValidationError::EmptyField(field)),
        Some(s) => Ok(s),
    }
}

fn optional_scalar(value: Option<Value>) -> Option<String> {
    value.as_ref().and_then(scalar_to_string)
}

fn timestamp_or(value: Option<Value>, now_ms: i64) -> Result<i64, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(now_ms),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .ok_or(ValidationError::InvalidField("timestamp")),
        Some(_) => Err(ValidationError::InvalidField("timestamp")),
    }
}

fn whole_amount(value: &Value) -> Option<u64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(v) = n.as_u64() {
        return Some(v);
    }
    let f = n.as_f64()?;
    // `u64::MAX as f64` rounds up to 2^64, which is already out of range
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

fn donated_amount(value: Option<Value>) -> Result<u64, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField("donatedAmount"))?;
    let Value::Number(n) = &value else {
        return Err(ValidationError::InvalidField("donatedAmount"));
    };

    let f = n.as_f64().unwrap_or(0.0);
    if !f.is_finite() || f <= 0.0 {
        return Err(ValidationError::NonPositiveAmount);
    }

    if f.fract() != 0.0 {
        return Err(ValidationError::FractionalAmount);
    }
    whole_amount(&value).ok_or(ValidationError::AmountOutOfRange)
}

/// Validate and shape a raw `reach` payload.
///
/// `timestamp` defaults to `now_ms` when absent upstream.
pub fn normalize_reach(raw: &Value, now_ms: i64) -> Result<ReachEntry, ValidationError> {
    let raw: RawReach = RawReach::deserialize(raw)
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;

    Ok(ReachEntry {
        id: required_id(raw.id)?,
        donator: required_str(raw.donator, "donator")?,
        gotrobux: raw.gotrobux.filter(|g| !g.trim().is_empty()),
        robux: raw.robux.as_ref().and_then(whole_amount),
        place_id: optional_scalar(raw.place_id),
        timestamp: timestamp_or(raw.timestamp, now_ms)?,
    })
}

/// Validate and shape a raw `found` payload.
pub fn normalize_found(raw: &Value, now_ms: i64) -> Result<FoundEntry, ValidationError> {
    let raw: RawFound = RawFound::deserialize(raw)
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let donator = raw.donator.ok_or(ValidationError::MissingField("donator"))?;
    let donator_username = required_str(donator.username, "donator.username")?;
    let receiver = raw.receiver.ok_or(ValidationError::MissingField("receiver"))?;
    let receiver_username = required_str(receiver.username, "receiver.username")?;

    Ok(FoundEntry {
        id: required_id(raw.id)?,
        donator: Donator {
            display_name: donator
                .display_name
                .unwrap_or_else(|| donator_username.clone()),
            username: donator_username,
            pfp: donator.pfp.unwrap_or_default(),
        },
        receiver: Receiver {
            display_name: receiver
                .display_name
                .unwrap_or_else(|| receiver_username.clone()),
            username: receiver_username,
        },
        donated_amount: donated_amount(raw.donated_amount)?,
        server_id: required_str(raw.server_id, "serverId")?,
        place_id: optional_scalar(raw.place_id),
        player_amount: raw.player_amount.filter(|p| !p.is_empty()),
        timestamp: timestamp_or(raw.timestamp, now_ms)?,
    })
}
