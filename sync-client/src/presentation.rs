//! View models for the two screens.
//!
//! Pure mappings from [`ActivityState`] to what each side renders; no
//! rendering happens here.

use std::time::Duration;

use stride_sync_types::ActivityState;

/// Animated scene shown on the phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneScene {
    /// Running figure.
    Running,
    /// Standing figure.
    Standing,
}

impl PhoneScene {
    /// Scene for a mirrored state.
    pub fn for_state(state: &ActivityState) -> Self {
        if state.is_running {
            Self::Running
        } else {
            Self::Standing
        }
    }

    /// Scene asset name.
    pub fn asset(&self) -> &'static str {
        match self {
            Self::Running => "Run.dae",
            Self::Standing => "Stand.dae",
        }
    }
}

/// Status line shown on the wrist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WristStatus {
    /// Nothing has been committed yet.
    Idle,
    /// Running.
    Running,
    /// Standing after at least one change.
    Standing,
}

impl WristStatus {
    /// Status for a local state and its store revision.
    pub fn for_snapshot(state: &ActivityState, revision: u64) -> Self {
        match (revision, state.is_running) {
            (0, _) => Self::Idle,
            (_, true) => Self::Running,
            (_, false) => Self::Standing,
        }
    }

    /// Upper-case label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Standing => "STANDING",
        }
    }
}

impl std::fmt::Display for WristStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "STATUS: {}", self.label())
    }
}

/// Heart icon animation derived from the displayed rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartPulse {
    /// Beats per minute being displayed.
    pub bpm: f64,
    /// Time between beats.
    pub period: Duration,
}

impl HeartPulse {
    /// Pulse for a state, if the heart should beat at all.
    pub fn for_state(state: &ActivityState) -> Option<Self> {
        let bpm = state.displayed_heart_rate()?;
        if !bpm.is_finite() || bpm <= 0.0 {
            return None;
        }
        // Rates near zero give a period too long for a Duration
        let period = Duration::try_from_secs_f64(60.0 / bpm).ok()?;
        Some(Self { bpm, period })
    }
}
