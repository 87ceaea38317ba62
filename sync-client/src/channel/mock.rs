//! Mock channel for testing.
//!
//! Captures sent payloads, lets tests flip reachability, and can be paired
//! with a second mock so that one side's sends land on the other side's
//! delegate.

use super::{ActivationState, Channel, ChannelDelegate, ChannelError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, Weak};
use stride_sync_types::SyncMessage;

/// Mock channel for testing.
///
/// Clones share state, so a test can keep a clone to inspect what the
/// component under test sent.
#[derive(Default)]
pub struct MockChannel {
    inner: Arc<Mutex<MockChannelInner>>,
}

struct MockChannelInner {
    activation: ActivationState,
    reachable: bool,
    delegate: Option<Arc<dyn ChannelDelegate>>,
    peer: Option<Weak<Mutex<MockChannelInner>>>,
    sent_messages: Vec<Vec<u8>>,
    send_calls: usize,
    activate_calls: usize,
    fail_next_activate: Option<String>,
    fail_next_send: Option<String>,
}

impl Default for MockChannelInner {
    fn default() -> Self {
        Self {
            activation: ActivationState::NotActivated,
            reachable: true,
            delegate: None,
            peer: None,
            sent_messages: Vec::new(),
            send_calls: 0,
            activate_calls: 0,
            fail_next_activate: None,
            fail_next_send: None,
        }
    }
}

impl MockChannel {
    /// Create a new mock channel. The peer starts reachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create two linked channels, e.g. wrist and phone.
    ///
    /// A successful `send` on one side delivers the payload to the other
    /// side's delegate.
    pub fn pair() -> (Self, Self) {
        let a = Self::new();
        let b = Self::new();
        a.inner.lock().unwrap().peer = Some(Arc::downgrade(&b.inner));
        b.inner.lock().unwrap().peer = Some(Arc::downgrade(&a.inner));
        (a, b)
    }

    /// Set peer reachability and notify the delegate if it changed.
    pub fn set_reachable(&self, reachable: bool) {
        let delegate = {
            let mut inner = self.inner.lock().unwrap();
            if inner.reachable == reachable {
                return;
            }
            inner.reachable = reachable;
            inner.delegate.clone()
        };
        if let Some(delegate) = delegate {
            delegate.reachability_did_change(reachable);
        }
    }

    /// Get all payloads that were accepted for sending.
    pub fn sent_messages(&self) -> Vec<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.sent_messages.clone()
    }

    /// Sent payloads decoded as messages. Undecodable payloads are skipped.
    pub fn sent_decoded(&self) -> Vec<SyncMessage> {
        self.sent_messages()
            .iter()
            .filter_map(|bytes| SyncMessage::from_bytes(bytes).ok())
            .collect()
    }

    /// Get the last payload that was sent.
    pub fn last_sent(&self) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.sent_messages.last().cloned()
    }

    /// Number of times `send()` reached the transport, successful or not.
    pub fn send_calls(&self) -> usize {
        self.inner.lock().unwrap().send_calls
    }

    /// Number of times `activate()` was called.
    pub fn activate_calls(&self) -> usize {
        self.inner.lock().unwrap().activate_calls
    }

    /// Cause the next activate() to fail with the given error.
    pub fn fail_next_activate(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_activate = Some(error.to_string());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Deliver raw bytes to this channel's delegate as if the peer sent them.
    pub fn deliver(&self, payload: Vec<u8>) {
        let delegate = self.inner.lock().unwrap().delegate.clone();
        if let Some(delegate) = delegate {
            delegate.did_receive_message(payload);
        }
    }

    /// Encode and deliver a message to this channel's delegate.
    pub fn deliver_message(&self, message: &SyncMessage) {
        if let Ok(bytes) = message.to_bytes() {
            self.deliver(bytes);
        }
    }

    /// Tear the session down and notify the delegate.
    pub fn deactivate(&self) {
        let delegate = {
            let mut inner = self.inner.lock().unwrap();
            inner.activation = ActivationState::NotActivated;
            inner.delegate.clone()
        };
        if let Some(delegate) = delegate {
            delegate.did_become_inactive();
            delegate.did_deactivate();
        }
    }

    /// Whether a delegate has been registered.
    pub fn has_delegate(&self) -> bool {
        self.inner.lock().unwrap().delegate.is_some()
    }

    /// Clear recorded sends and counters. Delegate and peer link are kept.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.sent_messages.clear();
        inner.send_calls = 0;
        inner.activate_calls = 0;
        inner.fail_next_activate = None;
        inner.fail_next_send = None;
    }
}

impl Clone for MockChannel {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("MockChannel")
            .field("activation", &inner.activation)
            .field("reachable", &inner.reachable)
            .field("has_delegate", &inner.delegate.is_some())
            .field("paired", &inner.peer.is_some())
            .field("sent", &inner.sent_messages.len())
            .finish()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn set_delegate(&self, delegate: Arc<dyn ChannelDelegate>) {
        let mut inner = self.inner.lock().unwrap();
        inner.delegate = Some(delegate);
    }

    async fn activate(&self) -> Result<ActivationState, ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        inner.activate_calls += 1;

        // Check for forced failure
        if let Some(error) = inner.fail_next_activate.take() {
            return Err(ChannelError::ActivationFailed(error));
        }

        inner.activation = ActivationState::Activated;
        Ok(inner.activation)
    }

    fn activation_state(&self) -> ActivationState {
        self.inner.lock().unwrap().activation
    }

    fn is_reachable(&self) -> bool {
        self.inner.lock().unwrap().reachable
    }

    async fn send(&self, data: &[u8]) -> Result<(), ChannelError> {
        let peer = {
            let mut inner = self.inner.lock().unwrap();
            inner.send_calls += 1;

            if inner.activation != ActivationState::Activated {
                return Err(ChannelError::NotActivated);
            }
            if !inner.reachable {
                return Err(ChannelError::NotReachable);
            }

            // Check for forced failure
            if let Some(error) = inner.fail_next_send.take() {
                return Err(ChannelError::DeliveryFailed(error));
            }

            inner.sent_messages.push(data.to_vec());
            inner.peer.as_ref().and_then(Weak::upgrade)
        };

        // Own lock is released before touching the peer.
        if let Some(peer) = peer {
            let delegate = peer.lock().unwrap().delegate.clone();
            if let Some(delegate) = delegate {
                delegate.did_receive_message(data.to_vec());
            }
        }
        Ok(())
    }
}
