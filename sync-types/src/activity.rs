//! The synchronized activity fact.

use serde::{Deserialize, Serialize};

/// Whether an activity session is active, and the latest heart rate.
///
/// Each process owns its own instance. Peers only ever see snapshots of it
/// carried by a [`SyncMessage`](crate::SyncMessage).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityState {
    /// Whether an activity session is currently considered active.
    pub is_running: bool,
    /// Most recently known heart rate in beats per minute (0 = no reading).
    pub heart_rate: f64,
}

impl ActivityState {
    /// A running state with the given heart rate.
    pub fn running(heart_rate: f64) -> Self {
        Self {
            is_running: true,
            heart_rate,
        }
    }

    /// The idle state, with the "no reading" sentinel.
    pub fn standing() -> Self {
        Self::default()
    }

    /// The heart rate to show, if any.
    ///
    /// The rate is only meaningful while running.
    pub fn displayed_heart_rate(&self) -> Option<f64> {
        if self.is_running {
            Some(self.heart_rate)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_standing_without_reading() {
        let state = ActivityState::default();
        assert!(!state.is_running);
        assert_eq!(state.heart_rate, 0.0);
        assert_eq!(state, ActivityState::standing());
    }

    #[test]
    fn heart_rate_hidden_while_standing() {
        let state = ActivityState {
            is_running: false,
            heart_rate: 88.0,
        };
        assert_eq!(state.displayed_heart_rate(), None);
        assert_eq!(
            ActivityState::running(132.0).displayed_heart_rate(),
            Some(132.0)
        );
    }
}
