//! Mock sensor feed for testing.
//!
//! Samples and session phases are pushed by the test through the emit
//! helpers and land on the registered delegate, the same way platform
//! callbacks would.

use super::{
    HeartRateSample, SensorDelegate, SensorError, SensorFeed, SessionHandle, StreamHandle,
    WorkoutConfig,
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use stride_sync_core::SessionPhase;

/// Mock sensor feed for testing.
///
/// Clones share state.
#[derive(Default)]
pub struct MockSensorFeed {
    inner: Arc<Mutex<MockSensorInner>>,
}

#[derive(Default)]
struct MockSensorInner {
    delegate: Option<Arc<dyn SensorDelegate>>,
    deny_authorization: bool,
    authorization_requests: usize,
    fail_next_begin_session: Option<String>,
    fail_next_end_session: Option<String>,
    fail_next_stream: Option<String>,
    next_handle: u64,
    open_sessions: BTreeSet<u64>,
    ended_sessions: usize,
    active_streams: BTreeSet<u64>,
    streams_started: usize,
    last_workout: Option<WorkoutConfig>,
    clock_ms: u64,
}

impl MockSensorFeed {
    /// Create a mock that grants authorization.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every authorization request fail.
    pub fn deny_authorization(&self) {
        self.inner.lock().unwrap().deny_authorization = true;
    }

    /// Cause the next begin_session() to fail with the given error.
    pub fn fail_next_begin_session(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_begin_session = Some(error.to_string());
    }

    /// Cause the next end_session() to fail with the given error.
    pub fn fail_next_end_session(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_end_session = Some(error.to_string());
    }

    /// Cause the next start_heart_rate_stream() to fail with the given error.
    pub fn fail_next_stream(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_stream = Some(error.to_string());
    }

    /// Deliver one sample to the delegate.
    pub fn emit_heart_rate(&self, bpm: f64) {
        self.emit_samples(&[bpm]);
    }

    /// Deliver a batch of samples to the delegate in one callback.
    pub fn emit_samples(&self, bpms: &[f64]) {
        let (delegate, samples) = {
            let mut inner = self.inner.lock().unwrap();
            let samples = bpms
                .iter()
                .map(|&bpm| {
                    inner.clock_ms += 1_000;
                    HeartRateSample::new(inner.clock_ms, bpm)
                })
                .collect::<Vec<_>>();
            (inner.delegate.clone(), samples)
        };
        if let Some(delegate) = delegate {
            delegate.did_receive_samples(samples);
        }
    }

    /// Report a session phase change to the delegate.
    ///
    /// The change is attributed to the most recent open session, or to a
    /// fresh external session if none is open.
    pub fn emit_session_phase(&self, phase: SessionPhase) {
        let (delegate, session) = {
            let mut inner = self.inner.lock().unwrap();
            let latest = inner.open_sessions.iter().next_back().copied();
            let id = match latest {
                Some(id) => id,
                None => {
                    inner.next_handle += 1;
                    inner.next_handle
                }
            };
            (inner.delegate.clone(), SessionHandle(id))
        };
        if let Some(delegate) = delegate {
            delegate.session_did_change(session, phase);
        }
    }

    /// Number of streams currently running.
    pub fn active_streams(&self) -> usize {
        self.inner.lock().unwrap().active_streams.len()
    }

    /// Total number of streams ever started.
    pub fn streams_started(&self) -> usize {
        self.inner.lock().unwrap().streams_started
    }

    /// Number of sessions begun and not yet ended.
    pub fn open_sessions(&self) -> usize {
        self.inner.lock().unwrap().open_sessions.len()
    }

    /// Number of sessions successfully ended.
    pub fn ended_sessions(&self) -> usize {
        self.inner.lock().unwrap().ended_sessions
    }

    /// Number of authorization requests received.
    pub fn authorization_requests(&self) -> usize {
        self.inner.lock().unwrap().authorization_requests
    }

    /// Workout configuration of the most recent session.
    pub fn last_workout(&self) -> Option<WorkoutConfig> {
        self.inner.lock().unwrap().last_workout
    }

    /// Whether a delegate has been registered.
    pub fn has_delegate(&self) -> bool {
        self.inner.lock().unwrap().delegate.is_some()
    }
}

impl Clone for MockSensorFeed {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for MockSensorFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("MockSensorFeed")
            .field("deny_authorization", &inner.deny_authorization)
            .field("open_sessions", &inner.open_sessions.len())
            .field("active_streams", &inner.active_streams.len())
            .finish()
    }
}

#[async_trait]
impl SensorFeed for MockSensorFeed {
    fn set_delegate(&self, delegate: Arc<dyn SensorDelegate>) {
        self.inner.lock().unwrap().delegate = Some(delegate);
    }

    async fn request_authorization(&self) -> Result<(), SensorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.authorization_requests += 1;
        if inner.deny_authorization {
            Err(SensorError::AuthorizationDenied)
        } else {
            Ok(())
        }
    }

    async fn begin_session(&self, config: &WorkoutConfig) -> Result<SessionHandle, SensorError> {
        let (handle, delegate) = {
            let mut inner = self.inner.lock().unwrap();

            // Check for forced failure
            if let Some(error) = inner.fail_next_begin_session.take() {
                return Err(SensorError::SessionCreateFailed(error));
            }

            inner.next_handle += 1;
            let id = inner.next_handle;
            inner.open_sessions.insert(id);
            inner.last_workout = Some(*config);
            (SessionHandle(id), inner.delegate.clone())
        };

        if let Some(delegate) = delegate {
            delegate.session_did_change(handle, SessionPhase::Starting);
            delegate.session_did_change(handle, SessionPhase::Running);
        }
        Ok(handle)
    }

    async fn end_session(&self, session: SessionHandle) -> Result<(), SensorError> {
        let delegate = {
            let mut inner = self.inner.lock().unwrap();

            if let Some(error) = inner.fail_next_end_session.take() {
                return Err(SensorError::SessionError(error));
            }
            if !inner.open_sessions.remove(&session.0) {
                return Err(SensorError::SessionError(format!(
                    "unknown session {}",
                    session.0
                )));
            }
            inner.ended_sessions += 1;
            inner.delegate.clone()
        };

        if let Some(delegate) = delegate {
            delegate.session_did_change(session, SessionPhase::Ended);
        }
        Ok(())
    }

    fn start_heart_rate_stream(&self) -> Result<StreamHandle, SensorError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_stream.take() {
            return Err(SensorError::StreamFailed(error));
        }

        inner.next_handle += 1;
        let id = inner.next_handle;
        inner.active_streams.insert(id);
        inner.streams_started += 1;
        Ok(StreamHandle(id))
    }

    fn stop_heart_rate_stream(&self, stream: StreamHandle) {
        self.inner.lock().unwrap().active_streams.remove(&stream.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        samples: Mutex<Vec<HeartRateSample>>,
        phases: Mutex<Vec<(SessionHandle, SessionPhase)>>,
    }

    impl SensorDelegate for Recorder {
        fn did_receive_samples(&self, samples: Vec<HeartRateSample>) {
            self.samples.lock().unwrap().extend(samples);
        }

        fn session_did_change(&self, session: SessionHandle, phase: SessionPhase) {
            self.phases.lock().unwrap().push((session, phase));
        }
    }

    #[tokio::test]
    async fn authorization_granted_by_default() {
        let sensor = MockSensorFeed::new();
        assert!(sensor.request_authorization().await.is_ok());
        assert_eq!(sensor.authorization_requests(), 1);
    }

    #[tokio::test]
    async fn authorization_can_be_denied() {
        let sensor = MockSensorFeed::new();
        sensor.deny_authorization();
        assert_eq!(
            sensor.request_authorization().await,
            Err(SensorError::AuthorizationDenied)
        );
    }

    #[test]
    fn samples_reach_delegate_in_order() {
        let sensor = MockSensorFeed::new();
        let recorder = Arc::new(Recorder::default());
        sensor.set_delegate(recorder.clone());

        sensor.emit_samples(&[70.0, 85.0]);
        sensor.emit_heart_rate(105.0);

        let samples = recorder.samples.lock().unwrap();
        let bpms: Vec<f64> = samples.iter().map(|s| s.bpm).collect();
        assert_eq!(bpms, vec![70.0, 85.0, 105.0]);
        assert!(samples[0].timestamp_ms < samples[2].timestamp_ms);
    }

    #[tokio::test]
    async fn session_lifecycle_reports_phases() {
        let sensor = MockSensorFeed::new();
        let recorder = Arc::new(Recorder::default());
        sensor.set_delegate(recorder.clone());

        let session = sensor
            .begin_session(&WorkoutConfig::default())
            .await
            .unwrap();
        assert_eq!(sensor.open_sessions(), 1);
        sensor.end_session(session).await.unwrap();

        assert_eq!(sensor.open_sessions(), 0);
        assert_eq!(sensor.ended_sessions(), 1);
        assert_eq!(
            *recorder.phases.lock().unwrap(),
            vec![
                (session, SessionPhase::Starting),
                (session, SessionPhase::Running),
                (session, SessionPhase::Ended)
            ]
        );
    }

    #[tokio::test]
    async fn emitted_phases_target_open_session_or_external() {
        let sensor = MockSensorFeed::new();
        let recorder = Arc::new(Recorder::default());
        sensor.set_delegate(recorder.clone());

        sensor.emit_session_phase(SessionPhase::Running);
        let session = sensor
            .begin_session(&WorkoutConfig::default())
            .await
            .unwrap();
        sensor.emit_session_phase(SessionPhase::Stopped);

        let phases = recorder.phases.lock().unwrap();
        assert_ne!(phases[0].0, session);
        assert_eq!(phases.last(), Some(&(session, SessionPhase::Stopped)));
    }

    #[tokio::test]
    async fn failed_begin_session_is_one_shot() {
        let sensor = MockSensorFeed::new();
        sensor.fail_next_begin_session("busy");

        assert!(matches!(
            sensor.begin_session(&WorkoutConfig::default()).await,
            Err(SensorError::SessionCreateFailed(_))
        ));
        assert!(sensor
            .begin_session(&WorkoutConfig::default())
            .await
            .is_ok());
    }

    #[test]
    fn streams_are_tracked() {
        let sensor = MockSensorFeed::new();

        let a = sensor.start_heart_rate_stream().unwrap();
        let b = sensor.start_heart_rate_stream().unwrap();
        sensor.stop_heart_rate_stream(a);
        sensor.stop_heart_rate_stream(a);

        assert_eq!(sensor.active_streams(), 1);
        assert_eq!(sensor.streams_started(), 2);
        sensor.stop_heart_rate_stream(b);
        assert_eq!(sensor.active_streams(), 0);
    }
}
