//! Channel payloads for stride-sync.
//!
//! Two historical shapes travel over the channel and both must decode:
//! - `{ action }` - legacy, no heart rate
//! - `{ action, heartRate }` - current
//!
//! There is no identifier, sequence number or timestamp. The last message
//! applied wins.

use serde::{Deserialize, Serialize};

use crate::{ActivityState, SyncError};

/// Wire string for the running action.
pub const ACTION_RUNNING: &str = "running";

/// Wire string for the standing action.
pub const ACTION_STANDING: &str = "standing";

/// Typed view of the `action` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// An activity session is active.
    Running,
    /// No activity session.
    Standing,
}

impl SyncAction {
    /// Map a wire string to an action.
    ///
    /// Only the exact string `"running"` means running; anything else,
    /// including unknown strings, is standing.
    pub fn from_wire(action: &str) -> Self {
        if action == ACTION_RUNNING {
            SyncAction::Running
        } else {
            SyncAction::Standing
        }
    }

    /// The wire string for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Running => ACTION_RUNNING,
            SyncAction::Standing => ACTION_STANDING,
        }
    }

    /// Action matching a running flag.
    pub fn from_running(is_running: bool) -> Self {
        if is_running {
            SyncAction::Running
        } else {
            SyncAction::Standing
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state push from the wrist to the phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
    /// `"running"` or `"standing"`; the authoritative running flag.
    pub action: String,
    /// Heart rate carried alongside, absent in the legacy shape.
    #[serde(
        rename = "heartRate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub heart_rate: Option<f64>,
}

impl SyncMessage {
    /// A running push with the given heart rate.
    pub fn running(heart_rate: f64) -> Self {
        Self::new(SyncAction::Running, Some(heart_rate))
    }

    /// A standing push with the given heart rate (normally 0).
    pub fn standing(heart_rate: f64) -> Self {
        Self::new(SyncAction::Standing, Some(heart_rate))
    }

    /// A legacy push without a heart rate field.
    pub fn legacy(action: SyncAction) -> Self {
        Self::new(action, None)
    }

    /// Build a push with an explicit action and optional heart rate.
    pub fn new(action: SyncAction, heart_rate: Option<f64>) -> Self {
        Self {
            action: action.as_str().to_string(),
            heart_rate,
        }
    }

    /// Build the push that reproduces `state` on the receiving side.
    ///
    /// The heart rate is carried verbatim, even when standing.
    pub fn from_state(state: &ActivityState) -> Self {
        Self::new(
            SyncAction::from_running(state.is_running),
            Some(state.heart_rate),
        )
    }

    /// Typed action.
    pub fn sync_action(&self) -> SyncAction {
        SyncAction::from_wire(&self.action)
    }

    /// Whether the action is exactly `"running"`.
    pub fn is_running(&self) -> bool {
        self.sync_action() == SyncAction::Running
    }

    /// The heart rate if present and usable (finite and `>= 0`).
    pub fn valid_heart_rate(&self) -> Option<f64> {
        self.heart_rate.filter(|bpm| bpm.is_finite() && *bpm >= 0.0)
    }

    /// Serialize to MessagePack bytes with named fields.
    ///
    /// Named fields keep the map shape, so an omitted `heartRate` stays
    /// omitted on the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        rmp_serde::to_vec_named(self).map_err(SyncError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        rmp_serde::from_slice(bytes).map_err(SyncError::Deserialization)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, SyncError> {
        serde_json::to_string(self).map_err(SyncError::Json)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(SyncError::Json)
    }
}
