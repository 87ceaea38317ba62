//! StateSync - the wrist-side publisher.
//!
//! # Architecture
//!
//! StateSync uses the pure publisher state machine (from sync-core) for the
//! running decision and interprets its actions against the channel and the
//! sensor feed.
//!
//! ```text
//! Sensor / Buttons → Inbox → StateSync → Channel → Phone
//!                               ↓
//!                    sync-core (pure state machine)
//! ```
//!
//! All state lives on the task that drives the publisher. Callbacks and UI
//! buttons only post to its inbox; [`StateSync::process_pending`] or
//! [`StateSync::run`] applies them in arrival order.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use stride_sync_core::{
    PublisherAction, PublisherEvent, PublisherMode, PublisherPhase, Rules, SessionPhase,
    StateStore, StopPolicy, SubscriptionId, DEFAULT_RUNNING_THRESHOLD_BPM,
};
use stride_sync_types::ActivityState;
use tokio::sync::mpsc;

use crate::channel::{activate_logged, send_message, Channel, ChannelError};
use crate::error::ClientError;
use crate::inbox::{ChannelEvent, Inbox, SensorEvent};
use crate::sensor::{NoSensor, SensorFeed, SessionHandle, StreamHandle, WorkoutConfig};

/// Configuration for StateSync.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    /// Source of the running decision.
    pub mode: PublisherMode,
    /// Samples strictly above this rate count as running.
    pub running_threshold_bpm: f64,
    /// Behaviour of repeated start/stop presses.
    pub stop_policy: StopPolicy,
    /// Parameters for sessions opened by the start button.
    pub workout: WorkoutConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            mode: PublisherMode::default(),
            running_threshold_bpm: DEFAULT_RUNNING_THRESHOLD_BPM,
            stop_policy: StopPolicy::default(),
            workout: WorkoutConfig::default(),
        }
    }
}

impl PublisherConfig {
    /// Set the publisher mode.
    pub fn with_mode(mut self, mode: PublisherMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the running threshold.
    ///
    /// The threshold must be finite and non-negative. Any other value is
    /// rejected with a warning and the previous threshold is kept.
    pub fn with_running_threshold(mut self, bpm: f64) -> Self {
        if bpm.is_finite() && bpm >= 0.0 {
            self.running_threshold_bpm = bpm;
        } else {
            tracing::warn!(
                "Ignoring running threshold {}; keeping {}",
                bpm,
                self.running_threshold_bpm
            );
        }
        self
    }

    /// Set the repeated-command policy.
    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.stop_policy = policy;
        self
    }

    /// Set the workout parameters.
    pub fn with_workout(mut self, workout: WorkoutConfig) -> Self {
        self.workout = workout;
        self
    }

    /// State machine rules derived from this configuration.
    pub fn rules(&self) -> Rules {
        Rules {
            mode: self.mode,
            running_threshold_bpm: self.running_threshold_bpm,
            stop_policy: self.stop_policy,
        }
    }
}

/// Operator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start button.
    StartRunning,
    /// Stop button.
    StopRunning,
    /// Stop the event loop.
    Shutdown,
}

/// Everything the publisher's inbox carries.
#[derive(Debug, Clone, PartialEq)]
pub enum PublisherInput {
    /// Channel callback.
    Channel(ChannelEvent),
    /// Sensor callback.
    Sensor(SensorEvent),
    /// Operator command.
    Command(Command),
}

impl From<ChannelEvent> for PublisherInput {
    fn from(event: ChannelEvent) -> Self {
        Self::Channel(event)
    }
}

impl From<SensorEvent> for PublisherInput {
    fn from(event: SensorEvent) -> Self {
        Self::Sensor(event)
    }
}

impl From<Command> for PublisherInput {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

/// Cloneable handle for buttons and other threads.
#[derive(Debug, Clone)]
pub struct PublisherHandle {
    inbox: Inbox<PublisherInput>,
}

impl PublisherHandle {
    /// Queue a start press.
    pub fn start_running(&self) -> Result<(), ClientError> {
        self.send(Command::StartRunning)
    }

    /// Queue a stop press.
    pub fn stop_running(&self) -> Result<(), ClientError> {
        self.send(Command::StopRunning)
    }

    /// Ask the event loop to exit.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<(), ClientError> {
        if self.inbox.post(command) {
            Ok(())
        } else {
            Err(ClientError::Shutdown)
        }
    }
}

/// Wrist-side publisher.
///
/// Generic over the channel and sensor feed for testability.
pub struct StateSync<C: Channel, S: SensorFeed> {
    config: PublisherConfig,
    rules: Rules,
    channel: C,
    sensor: S,
    phase: PublisherPhase,
    store: StateStore,
    session: Option<SessionHandle>,
    retired_sessions: HashSet<SessionHandle>,
    stream: Option<StreamHandle>,
    inbox: Inbox<PublisherInput>,
    rx: mpsc::UnboundedReceiver<PublisherInput>,
    shutdown: bool,
}

impl<C: Channel> StateSync<C, NoSensor> {
    /// Create a legacy publisher: buttons only, no sensor, no heart rate.
    pub fn legacy(config: PublisherConfig, channel: C) -> Self {
        Self::new(config.with_mode(PublisherMode::Legacy), channel, NoSensor)
    }
}

impl<C: Channel, S: SensorFeed> StateSync<C, S> {
    /// Create a publisher and register its inbox with the channel and sensor.
    pub fn new(config: PublisherConfig, channel: C, sensor: S) -> Self {
        let (inbox, rx) = Inbox::channel();
        channel.set_delegate(Arc::new(inbox.clone()));
        sensor.set_delegate(Arc::new(inbox.clone()));

        let rules = config.rules();
        Self {
            phase: PublisherPhase::new(config.mode),
            config,
            rules,
            channel,
            sensor,
            store: StateStore::new(),
            session: None,
            retired_sessions: HashSet::new(),
            stream: None,
            inbox,
            rx,
            shutdown: false,
        }
    }

    /// Activate the channel and request sensor authorization.
    ///
    /// Activation failure is logged and otherwise ignored. Denied
    /// authorization makes the publisher inert for its lifetime.
    pub async fn start(&mut self) {
        activate_logged(&self.channel).await;

        if !self.config.mode.uses_sensor() {
            return;
        }

        match self.sensor.request_authorization().await {
            Ok(()) => {
                tracing::info!("Heart-rate authorization granted");
                self.dispatch(PublisherEvent::AuthorizationGranted).await;
            }
            Err(e) => {
                tracing::warn!("Heart-rate authorization failed: {}", e);
                self.dispatch(PublisherEvent::AuthorizationDenied).await;
            }
        }
    }

    /// Handle for posting commands from elsewhere.
    pub fn handle(&self) -> PublisherHandle {
        PublisherHandle {
            inbox: self.inbox.clone(),
        }
    }

    /// Start button, applied immediately.
    pub async fn start_running(&mut self) {
        self.dispatch(PublisherEvent::StartRequested).await;
    }

    /// Stop button, applied immediately.
    pub async fn stop_running(&mut self) {
        self.dispatch(PublisherEvent::StopRequested).await;
    }

    /// Apply every queued event without waiting. Returns how many were
    /// applied.
    pub async fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(input) = self.rx.try_recv() {
            self.handle_input(input).await;
            processed += 1;
        }
        processed
    }

    /// Apply events until a shutdown command arrives, then release the
    /// stream and session.
    pub async fn run(&mut self) {
        while !self.shutdown {
            match self.rx.recv().await {
                Some(input) => self.handle_input(input).await,
                None => break,
            }
        }
        self.release().await;
    }

    /// Whether a shutdown command has been applied.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown
    }

    /// Current local state.
    pub fn state(&self) -> ActivityState {
        self.store.get()
    }

    /// Number of committed changes.
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Register a listener called after every local commit.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ActivityState) + Send + 'static,
    {
        self.store.subscribe(listener)
    }

    /// Remove a listener.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Current state machine phase.
    pub fn phase(&self) -> &PublisherPhase {
        &self.phase
    }

    /// Publisher configuration.
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Get a reference to the channel (for testing).
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Get a reference to the sensor feed (for testing).
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    async fn handle_input(&mut self, input: PublisherInput) {
        match input {
            PublisherInput::Channel(ChannelEvent::Message(payload)) => {
                tracing::debug!("Ignoring {} byte inbound message", payload.len());
            }
            PublisherInput::Channel(ChannelEvent::BecameInactive) => {
                tracing::info!("Channel became inactive");
            }
            PublisherInput::Channel(ChannelEvent::Deactivated) => {
                tracing::info!("Channel deactivated, re-activating");
                activate_logged(&self.channel).await;
            }
            PublisherInput::Channel(ChannelEvent::ReachabilityChanged(reachable)) => {
                tracing::debug!("Peer reachable: {}", reachable);
            }
            PublisherInput::Sensor(SensorEvent::Samples(samples)) => {
                for sample in samples {
                    self.dispatch(PublisherEvent::HeartRateSample { bpm: sample.bpm })
                        .await;
                }
            }
            PublisherInput::Sensor(SensorEvent::SessionChanged { session, phase }) => {
                // Callbacks for a session we already closed arrive late
                if self.retired_sessions.contains(&session) {
                    tracing::debug!("Ignoring {:?} for closed session {:?}", phase, session);
                    // A terminal phase is the last callback a session delivers
                    if matches!(
                        phase,
                        SessionPhase::Ended | SessionPhase::Stopped | SessionPhase::Failed(_)
                    ) {
                        self.retired_sessions.remove(&session);
                    }
                    return;
                }
                tracing::debug!("Session {:?} phase: {:?}", session, phase);
                self.dispatch(PublisherEvent::SessionPhaseChanged(phase))
                    .await;
            }
            PublisherInput::Command(Command::StartRunning) => self.start_running().await,
            PublisherInput::Command(Command::StopRunning) => self.stop_running().await,
            PublisherInput::Command(Command::Shutdown) => {
                tracing::info!("Publisher shutting down");
                self.shutdown = true;
            }
        }
    }

    /// Feed an event through the state machine and execute its actions.
    ///
    /// Follow-up events produced by actions are queued and processed after
    /// the current batch.
    async fn dispatch(&mut self, event: PublisherEvent) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let previous = std::mem::take(&mut self.phase);
            let was_running = previous.is_running();
            let was_inert = previous.is_inert();
            let (next, actions) = previous.on_event(&self.rules, event);

            if next.is_inert() && !was_inert {
                tracing::warn!("Publisher is inert; no state will be sent");
            } else if next.is_running() != was_running {
                tracing::info!(
                    "Activity state changed: {}",
                    if next.is_running() { "running" } else { "standing" }
                );
            }
            self.phase = next;

            for action in actions {
                if let Some(follow_up) = self.execute(action).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&mut self, action: PublisherAction) -> Option<PublisherEvent> {
        match action {
            PublisherAction::BeginSession => {
                match self.sensor.begin_session(&self.config.workout).await {
                    Ok(session) => {
                        tracing::info!("Activity session began: {:?}", session);
                        self.session = Some(session);
                        Some(PublisherEvent::SessionBegan)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to begin activity session: {}", e);
                        Some(PublisherEvent::SessionBeginFailed {
                            error: e.to_string(),
                        })
                    }
                }
            }
            PublisherAction::EndSession => {
                if let Some(session) = self.session.take() {
                    self.retired_sessions.insert(session);
                    if let Err(e) = self.sensor.end_session(session).await {
                        tracing::warn!("Failed to end activity session: {}", e);
                    }
                }
                None
            }
            PublisherAction::StartHeartRateStream => {
                if let Some(stream) = self.stream.take() {
                    self.sensor.stop_heart_rate_stream(stream);
                }
                match self.sensor.start_heart_rate_stream() {
                    Ok(stream) => self.stream = Some(stream),
                    Err(e) => tracing::warn!("Failed to start heart-rate stream: {}", e),
                }
                None
            }
            PublisherAction::StopHeartRateStream => {
                if let Some(stream) = self.stream.take() {
                    self.sensor.stop_heart_rate_stream(stream);
                }
                None
            }
            PublisherAction::Send(message) => {
                match send_message(&self.channel, &message).await {
                    Ok(()) => tracing::debug!("Sent {}", message.action),
                    Err(ClientError::Channel(ChannelError::NotReachable)) => {
                        tracing::debug!("Peer not reachable, dropping {}", message.action);
                    }
                    Err(e) => tracing::warn!("Failed to send {}: {}", message.action, e),
                }
                None
            }
            PublisherAction::Publish(state) => {
                self.store.commit(state);
                None
            }
        }
    }

    async fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.sensor.stop_heart_rate_stream(stream);
        }
        if let Some(session) = self.session.take() {
            self.retired_sessions.insert(session);
            if let Err(e) = self.sensor.end_session(session).await {
                tracing::warn!("Failed to end activity session: {}", e);
            }
        }
    }
}

impl<C: Channel, S: SensorFeed> std::fmt::Debug for StateSync<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateSync")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("session", &self.session)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}
