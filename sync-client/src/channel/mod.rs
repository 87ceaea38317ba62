//! Channel abstraction for stride-sync.
//!
//! This module abstracts the platform's wrist/phone session transport
//! (mock for testing). The real transport is an external collaborator; the
//! core only relies on the contract below.
//!
//! # Design
//!
//! The channel is session-oriented and best-effort:
//! - `activate()` starts the session (idempotent, never fatal)
//! - `is_reachable()` is a momentary sample taken at send time
//! - `send()` is fire-and-forget: no acknowledgement, no retry queue
//! - inbound events arrive on a [`ChannelDelegate`], on any thread
//!
//! Exactly one channel instance exists per process. It is constructed by the
//! process bootstrap and handed to the one component that owns it.

mod mock;

pub use mock::MockChannel;

use async_trait::async_trait;
use std::sync::Arc;
use stride_sync_types::SyncMessage;
use thiserror::Error;

use crate::error::ClientError;

/// Channel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Peer is not reachable; the send was not attempted.
    #[error("peer not reachable")]
    NotReachable,

    /// Session has not been activated.
    #[error("session not activated")]
    NotActivated,

    /// The transport attempted delivery and failed.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// The session could not be activated.
    #[error("activation failed: {0}")]
    ActivationFailed(String),
}

/// Session activation state reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationState {
    /// Session has not been activated (or was deactivated).
    #[default]
    NotActivated,
    /// Session is winding down, e.g. while switching paired devices.
    Inactive,
    /// Session is active and can carry messages.
    Activated,
}

/// Receives channel events, one method per event.
///
/// Implementations are called from arbitrary threads and must not touch
/// UI-owned state directly. See [`Inbox`](crate::Inbox).
pub trait ChannelDelegate: Send + Sync {
    /// A message from the peer was delivered.
    fn did_receive_message(&self, payload: Vec<u8>);

    /// The session is about to stop carrying messages.
    fn did_become_inactive(&self);

    /// The session was torn down. The owner should re-activate.
    fn did_deactivate(&self);

    /// Peer reachability flipped.
    fn reachability_did_change(&self, reachable: bool);
}

/// Channel trait for the wrist/phone session.
///
/// Implementations wrap the platform transport (or a mock).
#[async_trait]
pub trait Channel: Send + Sync {
    /// Register the delegate that receives inbound events.
    ///
    /// Replaces any previously registered delegate.
    fn set_delegate(&self, delegate: Arc<dyn ChannelDelegate>);

    /// Activate the session. Calling it again while active is harmless.
    async fn activate(&self) -> Result<ActivationState, ChannelError>;

    /// Current activation state.
    fn activation_state(&self) -> ActivationState;

    /// Whether the peer is connectable right now.
    fn is_reachable(&self) -> bool;

    /// Send bytes to the peer.
    ///
    /// Success only means the transport accepted the payload; the peer never
    /// confirms delivery.
    async fn send(&self, data: &[u8]) -> Result<(), ChannelError>;
}

/// Encode and send a message, gated on reachability.
///
/// An unreachable peer short-circuits with [`ChannelError::NotReachable`]
/// before the transport is touched.
pub async fn send_message<C>(channel: &C, message: &SyncMessage) -> Result<(), ClientError>
where
    C: Channel + ?Sized,
{
    if !channel.is_reachable() {
        return Err(ChannelError::NotReachable.into());
    }

    let bytes = message
        .to_bytes()
        .map_err(|e| ClientError::Serialization(e.to_string()))?;
    channel.send(&bytes).await?;
    Ok(())
}

/// Activate the channel and log the outcome.
///
/// Activation failures are never fatal and never retried here; the platform
/// retries on its own.
pub async fn activate_logged<C>(channel: &C) -> Option<ActivationState>
where
    C: Channel + ?Sized,
{
    match channel.activate().await {
        Ok(state) => {
            tracing::info!("Channel activation complete: {:?}", state);
            Some(state)
        }
        Err(e) => {
            tracing::warn!("Channel activation failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_message_skips_transport_when_unreachable() {
        let channel = MockChannel::new();
        channel.activate().await.unwrap();
        channel.set_reachable(false);

        let result = send_message(&channel, &SyncMessage::running(120.0)).await;

        assert!(matches!(
            result,
            Err(ClientError::Channel(ChannelError::NotReachable))
        ));
        assert_eq!(channel.send_calls(), 0);
        assert!(channel.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn send_message_encodes_payload() {
        let channel = MockChannel::new();
        channel.activate().await.unwrap();

        send_message(&channel, &SyncMessage::standing(0.0))
            .await
            .unwrap();

        let sent = channel.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            SyncMessage::from_bytes(&sent[0]).unwrap(),
            SyncMessage::standing(0.0)
        );
    }

    #[tokio::test]
    async fn send_message_surfaces_delivery_failure() {
        let channel = MockChannel::new();
        channel.activate().await.unwrap();
        channel.fail_next_send("radio off");

        let result = send_message(&channel, &SyncMessage::running(99.0)).await;

        assert!(matches!(
            result,
            Err(ClientError::Channel(ChannelError::DeliveryFailed(_)))
        ));
    }

    #[tokio::test]
    async fn activate_logged_swallows_failure() {
        let channel = MockChannel::new();
        channel.fail_next_activate("no paired device");

        assert_eq!(activate_logged(&channel).await, None);
        assert_eq!(
            activate_logged(&channel).await,
            Some(ActivationState::Activated)
        );
    }
}
