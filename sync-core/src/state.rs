//! Publisher state machine for stride-sync.
//!
//! This module provides a pure, side-effect-free state machine that decides
//! the wrist's [`ActivityState`] from heart-rate samples, sensor session
//! lifecycle events and manual commands. The state machine takes events as
//! input and produces a new phase plus a list of actions to execute.
//!
//! The actual I/O (sending over the channel, opening sensor sessions,
//! starting streams) is performed by sync-client, not by this module.

use serde::Deserialize;
use stride_sync_types::{ActivityState, SyncAction, SyncMessage};

/// Heart rate above which the sensor-derived publisher considers the wearer
/// to be running.
pub const DEFAULT_RUNNING_THRESHOLD_BPM: f64 = 100.0;

/// Where the publisher takes its running/standing decision from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherMode {
    /// Heart-rate threshold decides; manual commands are accepted as
    /// overrides.
    #[default]
    SensorDerived,
    /// Manual start/stop open and close a sensor session; samples are
    /// telemetry only.
    ManualSession,
    /// Manual buttons only, no sensor; messages carry no heart rate.
    Legacy,
}

impl PublisherMode {
    /// Whether this mode talks to the sensor feed at all.
    pub fn uses_sensor(&self) -> bool {
        !matches!(self, PublisherMode::Legacy)
    }
}

/// What a stop (or start) command does when the publisher is already in the
/// requested state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Repeated commands are no-ops.
    #[default]
    Idempotent,
    /// Repeated commands re-send the current message.
    AlwaysResend,
}

/// Fixed parameters of the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    /// Source of the running decision.
    pub mode: PublisherMode,
    /// Samples strictly above this value count as running.
    pub running_threshold_bpm: f64,
    /// Behaviour of repeated start/stop commands.
    pub stop_policy: StopPolicy,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            mode: PublisherMode::default(),
            running_threshold_bpm: DEFAULT_RUNNING_THRESHOLD_BPM,
            stop_policy: StopPolicy::default(),
        }
    }
}

impl Rules {
    fn is_running_rate(&self, bpm: f64) -> bool {
        bpm > self.running_threshold_bpm
    }
}

/// Lifecycle of a sensor activity session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Session is being prepared.
    Starting,
    /// Session is collecting data.
    Running,
    /// Session ended normally.
    Ended,
    /// Session was stopped.
    Stopped,
    /// Session hit a fault; its state is uncertain.
    Failed(String),
}

/// Publisher state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum PublisherPhase {
    /// Waiting for the sensor feed to answer the authorization request.
    AwaitingAuthorization,
    /// Authorization was denied; nothing is ever sent again.
    Inert,
    /// Not running.
    Idle {
        /// Last sample seen while idle (0 if none yet).
        last_bpm: f64,
    },
    /// Running.
    Running {
        /// Latest heart rate.
        heart_rate: f64,
    },
}

impl PublisherPhase {
    /// Initial phase for a publisher in the given mode.
    ///
    /// Legacy publishers have no sensor to authorize and start idle.
    pub fn new(mode: PublisherMode) -> Self {
        if mode.uses_sensor() {
            Self::AwaitingAuthorization
        } else {
            Self::Idle { last_bpm: 0.0 }
        }
    }

    /// The activity state this phase presents.
    pub fn activity(&self) -> ActivityState {
        match self {
            Self::Running { heart_rate } => ActivityState::running(*heart_rate),
            _ => ActivityState::standing(),
        }
    }

    /// Check if currently running.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// Check if the publisher has been made permanently inert.
    pub fn is_inert(&self) -> bool {
        matches!(self, Self::Inert)
    }

    /// Process an event and return the new phase plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (sync-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, rules: &Rules, event: PublisherEvent) -> (Self, Vec<PublisherAction>) {
        match (self, event) {
            // Authorization
            (Self::AwaitingAuthorization, PublisherEvent::AuthorizationGranted) => {
                (Self::Idle { last_bpm: 0.0 }, vec![])
            }
            (Self::AwaitingAuthorization, PublisherEvent::AuthorizationDenied) => {
                (Self::Inert, vec![])
            }
            (Self::AwaitingAuthorization, _) => (Self::AwaitingAuthorization, vec![]),
            (Self::Inert, _) => (Self::Inert, vec![]),

            // Legacy buttons
            (phase, PublisherEvent::StartRequested) if rules.mode == PublisherMode::Legacy => {
                match phase {
                    Self::Running { .. } => (phase, resend(rules, legacy_running())),
                    _ => (
                        Self::Running { heart_rate: 0.0 },
                        vec![
                            PublisherAction::Send(legacy_running()),
                            PublisherAction::Publish(ActivityState::running(0.0)),
                        ],
                    ),
                }
            }
            (phase, PublisherEvent::StopRequested) if rules.mode == PublisherMode::Legacy => {
                match phase {
                    Self::Running { .. } => (
                        Self::Idle { last_bpm: 0.0 },
                        vec![
                            PublisherAction::Send(legacy_standing()),
                            PublisherAction::Publish(ActivityState::standing()),
                        ],
                    ),
                    _ => (phase, resend(rules, legacy_standing())),
                }
            }
            (phase, _) if rules.mode == PublisherMode::Legacy => (phase, vec![]),

            // Manual session commands
            (Self::Idle { last_bpm }, PublisherEvent::StartRequested) => {
                (Self::Idle { last_bpm }, vec![PublisherAction::BeginSession])
            }
            (Self::Running { heart_rate }, PublisherEvent::StartRequested) => (
                Self::Running { heart_rate },
                resend(rules, SyncMessage::running(heart_rate)),
            ),
            (Self::Idle { last_bpm }, PublisherEvent::SessionBegan) => enter_running(last_bpm),
            (Self::Running { .. }, PublisherEvent::StopRequested) => leave_running(0.0),
            (Self::Idle { last_bpm }, PublisherEvent::StopRequested) => (
                Self::Idle { last_bpm },
                resend(rules, SyncMessage::standing(0.0)),
            ),

            // Heart-rate samples
            (phase, PublisherEvent::HeartRateSample { bpm }) if !bpm.is_finite() || bpm < 0.0 => {
                (phase, vec![])
            }
            (Self::Idle { .. }, PublisherEvent::HeartRateSample { bpm }) => {
                if rules.mode == PublisherMode::SensorDerived && rules.is_running_rate(bpm) {
                    enter_running(bpm)
                } else {
                    (Self::Idle { last_bpm: bpm }, vec![])
                }
            }
            (Self::Running { .. }, PublisherEvent::HeartRateSample { bpm }) => {
                if rules.mode == PublisherMode::SensorDerived && !rules.is_running_rate(bpm) {
                    leave_running(bpm)
                } else {
                    (
                        Self::Running { heart_rate: bpm },
                        vec![
                            PublisherAction::Send(SyncMessage::running(bpm)),
                            PublisherAction::Publish(ActivityState::running(bpm)),
                        ],
                    )
                }
            }

            // Session lifecycle reported by the sensor feed. Only a manual
            // session treats it as the source of truth; the threshold rules
            // in sensor-derived mode.
            (Self::Idle { last_bpm }, PublisherEvent::SessionPhaseChanged(SessionPhase::Running))
                if rules.mode == PublisherMode::ManualSession =>
            {
                enter_running(last_bpm)
            }
            (
                Self::Running { .. },
                PublisherEvent::SessionPhaseChanged(SessionPhase::Ended | SessionPhase::Stopped),
            ) if rules.mode == PublisherMode::ManualSession => leave_running(0.0),

            // Everything else leaves the phase untouched
            (phase, _) => (phase, vec![]),
        }
    }
}

impl Default for PublisherPhase {
    fn default() -> Self {
        Self::new(PublisherMode::default())
    }
}

/// Events that can occur on the wrist.
#[derive(Debug, Clone, PartialEq)]
pub enum PublisherEvent {
    /// The sensor feed granted access.
    AuthorizationGranted,
    /// The sensor feed refused access.
    AuthorizationDenied,
    /// A live heart-rate sample arrived.
    HeartRateSample {
        /// Beats per minute.
        bpm: f64,
    },
    /// The sensor feed reported a session lifecycle change.
    SessionPhaseChanged(SessionPhase),
    /// The operator pressed start.
    StartRequested,
    /// A session requested by [`PublisherAction::BeginSession`] is collecting.
    SessionBegan,
    /// A session requested by [`PublisherAction::BeginSession`] could not be
    /// created.
    SessionBeginFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The operator pressed stop.
    StopRequested,
}

/// Actions to be executed by the sync-client.
///
/// These are instructions, not side effects. The sync-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum PublisherAction {
    /// Open a sensor activity session.
    BeginSession,
    /// Close the owned sensor activity session, if any.
    EndSession,
    /// Start the live heart-rate stream (cancelling any active one).
    StartHeartRateStream,
    /// Stop the live heart-rate stream, if any.
    StopHeartRateStream,
    /// Push a message to the peer.
    Send(SyncMessage),
    /// Commit a new local state for observers.
    Publish(ActivityState),
}

fn enter_running(bpm: f64) -> (PublisherPhase, Vec<PublisherAction>) {
    (
        PublisherPhase::Running { heart_rate: bpm },
        vec![
            PublisherAction::StartHeartRateStream,
            PublisherAction::Send(SyncMessage::running(bpm)),
            PublisherAction::Publish(ActivityState::running(bpm)),
        ],
    )
}

fn leave_running(last_bpm: f64) -> (PublisherPhase, Vec<PublisherAction>) {
    (
        PublisherPhase::Idle { last_bpm },
        vec![
            PublisherAction::StopHeartRateStream,
            PublisherAction::EndSession,
            PublisherAction::Send(SyncMessage::standing(0.0)),
            PublisherAction::Publish(ActivityState::standing()),
        ],
    )
}

fn resend(rules: &Rules, message: SyncMessage) -> Vec<PublisherAction> {
    match rules.stop_policy {
        StopPolicy::Idempotent => vec![],
        StopPolicy::AlwaysResend => vec![PublisherAction::Send(message)],
    }
}

fn legacy_running() -> SyncMessage {
    SyncMessage::legacy(SyncAction::Running)
}

fn legacy_standing() -> SyncMessage {
    SyncMessage::legacy(SyncAction::Standing)
}
