//! Sensor feed abstraction for stride-sync.
//!
//! Wraps the platform's biometric store and activity-session API. Like the
//! channel, the real implementation is an external collaborator and the
//! publisher relies only on this contract.
//!
//! Samples reach the delegate through background delivery whether or not a
//! live stream is open; the live stream raises the delivery rate while the
//! wearer is running.

mod mock;

pub use mock::MockSensorFeed;

use async_trait::async_trait;
use std::sync::Arc;
use stride_sync_core::SessionPhase;
use thiserror::Error;

/// Sensor feed errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The user (or platform) refused heart-rate access.
    #[error("authorization denied")]
    AuthorizationDenied,

    /// The activity session could not be created.
    #[error("session creation failed: {0}")]
    SessionCreateFailed(String),

    /// The activity session reported a fault.
    #[error("session error: {0}")]
    SessionError(String),

    /// The live heart-rate stream could not be started.
    #[error("heart-rate stream failed: {0}")]
    StreamFailed(String),
}

/// A single heart-rate reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartRateSample {
    /// Sample time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Beats per minute.
    pub bpm: f64,
}

impl HeartRateSample {
    /// Create a sample.
    pub fn new(timestamp_ms: u64, bpm: f64) -> Self {
        Self { timestamp_ms, bpm }
    }
}

/// Opaque handle to an open activity session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u64);

/// Opaque handle to a live heart-rate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub u64);

/// Kind of activity a session records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkoutActivity {
    /// Running.
    #[default]
    Running,
}

/// Where the activity takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkoutLocation {
    /// Outdoors.
    #[default]
    Outdoor,
    /// Indoors.
    Indoor,
}

/// Parameters for a new activity session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkoutConfig {
    /// Kind of activity.
    pub activity: WorkoutActivity,
    /// Location type.
    pub location: WorkoutLocation,
}

/// Receives sensor events. Called from arbitrary threads.
pub trait SensorDelegate: Send + Sync {
    /// New heart-rate samples arrived, oldest first.
    fn did_receive_samples(&self, samples: Vec<HeartRateSample>);

    /// An activity session changed phase. Sessions the publisher did not
    /// open (e.g. started from another app) are reported too.
    fn session_did_change(&self, session: SessionHandle, phase: SessionPhase);
}

/// Sensor feed trait.
#[async_trait]
pub trait SensorFeed: Send + Sync {
    /// Register the delegate that receives samples and session changes.
    fn set_delegate(&self, delegate: Arc<dyn SensorDelegate>);

    /// Ask for read access to heart-rate data.
    async fn request_authorization(&self) -> Result<(), SensorError>;

    /// Open an activity session. Its phases arrive on the delegate.
    async fn begin_session(&self, config: &WorkoutConfig) -> Result<SessionHandle, SensorError>;

    /// Close an activity session.
    async fn end_session(&self, session: SessionHandle) -> Result<(), SensorError>;

    /// Start delivering live heart-rate samples to the delegate.
    fn start_heart_rate_stream(&self) -> Result<StreamHandle, SensorError>;

    /// Stop a live heart-rate stream. Unknown handles are ignored.
    fn stop_heart_rate_stream(&self, stream: StreamHandle);
}

/// Sensor feed for devices without a biometric sensor.
///
/// Used by legacy publishers; authorization is always denied and nothing is
/// ever delivered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensor;

#[async_trait]
impl SensorFeed for NoSensor {
    fn set_delegate(&self, _delegate: Arc<dyn SensorDelegate>) {}

    async fn request_authorization(&self) -> Result<(), SensorError> {
        Err(SensorError::AuthorizationDenied)
    }

    async fn begin_session(&self, _config: &WorkoutConfig) -> Result<SessionHandle, SensorError> {
        Err(SensorError::SessionCreateFailed("no sensor".into()))
    }

    async fn end_session(&self, _session: SessionHandle) -> Result<(), SensorError> {
        Ok(())
    }

    fn start_heart_rate_stream(&self) -> Result<StreamHandle, SensorError> {
        Err(SensorError::StreamFailed("no sensor".into()))
    }

    fn stop_heart_rate_stream(&self, _stream: StreamHandle) {}
}
