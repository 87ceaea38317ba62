//! Marshaling of platform callbacks onto the owning loop.
//!
//! Channel and sensor callbacks may fire on any thread. They never touch
//! component state; they post an event to an [`Inbox`] and the component
//! applies it from its own task.

use stride_sync_core::SessionPhase;
use tokio::sync::mpsc;

use crate::channel::ChannelDelegate;
use crate::sensor::{HeartRateSample, SensorDelegate, SessionHandle};

/// Channel callback, as posted to the owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Raw payload from the peer.
    Message(Vec<u8>),
    /// Session is about to stop carrying messages.
    BecameInactive,
    /// Session was torn down.
    Deactivated,
    /// Peer reachability flipped.
    ReachabilityChanged(bool),
}

/// Sensor callback, as posted to the owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    /// Batch of samples, oldest first.
    Samples(Vec<HeartRateSample>),
    /// Activity session changed phase.
    SessionChanged {
        /// Session the change belongs to.
        session: SessionHandle,
        /// New phase.
        phase: SessionPhase,
    },
}

/// Sending half of a component's event queue.
///
/// Registered as the delegate of the channel and the sensor. Holding an
/// inbox does not keep the component alive: once the receiving half is
/// dropped, posts are discarded.
#[derive(Debug)]
pub struct Inbox<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Inbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + 'static> Inbox<T> {
    /// Create an inbox and the receiver the owner drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Post an event. Returns false if the owner is gone.
    pub fn post(&self, event: impl Into<T>) -> bool {
        if self.tx.send(event.into()).is_err() {
            tracing::debug!("Inbox closed, dropping event");
            return false;
        }
        true
    }

    /// Whether the owner has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> ChannelDelegate for Inbox<T>
where
    T: From<ChannelEvent> + Send + 'static,
{
    fn did_receive_message(&self, payload: Vec<u8>) {
        self.post(ChannelEvent::Message(payload));
    }

    fn did_become_inactive(&self) {
        self.post(ChannelEvent::BecameInactive);
    }

    fn did_deactivate(&self) {
        self.post(ChannelEvent::Deactivated);
    }

    fn reachability_did_change(&self, reachable: bool) {
        self.post(ChannelEvent::ReachabilityChanged(reachable));
    }
}

impl<T> SensorDelegate for Inbox<T>
where
    T: From<SensorEvent> + Send + 'static,
{
    fn did_receive_samples(&self, samples: Vec<HeartRateSample>) {
        self.post(SensorEvent::Samples(samples));
    }

    fn session_did_change(&self, session: SessionHandle, phase: SessionPhase) {
        self.post(SensorEvent::SessionChanged { session, phase });
    }
}
