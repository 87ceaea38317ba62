//! StateReceiver - the phone-side mirror.
//!
//! The receiver never sends. Each inbound payload is decoded, folded into
//! the mirrored [`ActivityState`] with [`reduce`], and committed to the
//! store; the last message applied wins.

use std::sync::Arc;

use stride_sync_core::{reduce, StateStore, SubscriptionId};
use stride_sync_types::{ActivityState, SyncMessage};
use tokio::sync::{mpsc, oneshot, watch};

use crate::channel::{activate_logged, Channel};
use crate::inbox::{ChannelEvent, Inbox};

/// Phone-side receiver. Generic over the channel for testability.
pub struct StateReceiver<C: Channel> {
    channel: C,
    store: StateStore,
    watch_tx: watch::Sender<ActivityState>,
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl<C: Channel> StateReceiver<C> {
    /// Create a receiver and register its inbox with the channel.
    pub fn new(channel: C) -> Self {
        let (inbox, rx) = Inbox::<ChannelEvent>::channel();
        channel.set_delegate(Arc::new(inbox));
        let (watch_tx, _) = watch::channel(ActivityState::default());

        Self {
            channel,
            store: StateStore::new(),
            watch_tx,
            rx,
        }
    }

    /// Activate the channel. Failure is logged and otherwise ignored.
    pub async fn start(&mut self) {
        activate_logged(&self.channel).await;
    }

    /// Apply every queued event without waiting. Returns how many were
    /// applied.
    pub async fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event).await;
            processed += 1;
        }
        processed
    }

    /// Apply events until `shutdown` fires or the channel goes away.
    ///
    /// Returns the last mirrored state.
    pub async fn run(&mut self, mut shutdown: oneshot::Receiver<()>) -> ActivityState {
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Receiver shutting down");
                    break;
                }
                event = self.rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        tracing::debug!("Receiver inbox closed");
                        break;
                    }
                },
            }
        }
        self.store.get()
    }

    /// Fold one message into the mirrored state and commit it.
    pub fn apply_message(&mut self, message: &SyncMessage) {
        let next = reduce(&self.store.get(), message);
        if next.is_running != self.store.get().is_running {
            tracing::info!("Peer is now {}", message.sync_action());
        }
        self.store.commit(next);
        self.watch_tx.send_replace(next);
    }

    /// Current mirrored state.
    pub fn state(&self) -> ActivityState {
        self.store.get()
    }

    /// Number of messages applied.
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Register a listener called synchronously after every commit.
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

    /// Observe the mirrored state from another task.
    pub fn watch(&self) -> watch::Receiver<ActivityState> {
        self.watch_tx.subscribe()
    }

    /// Get a reference to the channel (for testing).
    pub fn channel(&self) -> &C {
        &self.channel
    }

    async fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(payload) => match SyncMessage::from_bytes(&payload) {
                Ok(message) => self.apply_message(&message),
                Err(e) => tracing::warn!("Dropping undecodable message: {}", e),
            },
            ChannelEvent::BecameInactive => tracing::info!("Channel became inactive"),
            ChannelEvent::Deactivated => {
                tracing::info!("Channel deactivated, re-activating");
                activate_logged(&self.channel).await;
            }
            ChannelEvent::ReachabilityChanged(reachable) => {
                tracing::debug!("Peer reachable: {}", reachable);
            }
        }
    }
}

impl<C: Channel> std::fmt::Debug for StateReceiver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReceiver")
            .field("state", &self.store.get())
            .field("revision", &self.store.revision())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;

    async fn started() -> (MockChannel, StateReceiver<MockChannel>) {
        let channel = MockChannel::new();
        let mut receiver = StateReceiver::new(channel.clone());
        receiver.start().await;
        (channel, receiver)
    }

    #[tokio::test]
    async fn initial_state_is_standing() {
        let (channel, receiver) = started().await;

        assert_eq!(receiver.state(), ActivityState::standing());
        assert_eq!(receiver.revision(), 0);
        assert!(channel.has_delegate());
    }

    #[tokio::test]
    async fn messages_are_mirrored_in_order() {
        let (channel, mut receiver) = started().await;

        channel.deliver_message(&SyncMessage::running(120.0));
        channel.deliver_message(&SyncMessage::running(135.0));
        assert_eq!(receiver.process_pending().await, 2);

        assert_eq!(receiver.state(), ActivityState::running(135.0));
        assert_eq!(receiver.revision(), 2);
    }

    #[tokio::test]
    async fn legacy_message_keeps_rate() {
        let (channel, mut receiver) = started().await;

        channel.deliver_message(&SyncMessage::running(140.0));
        channel.deliver_message(&SyncMessage::legacy(
            stride_sync_types::SyncAction::Running,
        ));
        receiver.process_pending().await;

        assert_eq!(receiver.state(), ActivityState::running(140.0));
    }

    #[tokio::test]
    async fn garbage_is_dropped() {
        let (channel, mut receiver) = started().await;
        channel.deliver_message(&SyncMessage::running(120.0));

        channel.deliver(vec![0xc1, 0x00, 0xff]);
        receiver.process_pending().await;

        assert_eq!(receiver.state(), ActivityState::running(120.0));
        assert_eq!(receiver.revision(), 1);
    }

    #[tokio::test]
    async fn receiver_never_sends() {
        let (channel, mut receiver) = started().await;

        channel.deliver_message(&SyncMessage::running(120.0));
        receiver.process_pending().await;

        assert_eq!(channel.send_calls(), 0);
    }

    #[tokio::test]
    async fn watch_sees_commits() {
        let (channel, mut receiver) = started().await;
        let mut watcher = receiver.watch();

        channel.deliver_message(&SyncMessage::running(101.0));
        receiver.process_pending().await;

        assert!(watcher.has_changed().unwrap());
        assert_eq!(*watcher.borrow_and_update(), ActivityState::running(101.0));
    }

    #[tokio::test]
    async fn listeners_fire_per_commit() {
        let (channel, mut receiver) = started().await;
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = count.clone();
        receiver.subscribe(move |_| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        channel.deliver_message(&SyncMessage::standing(0.0));
        channel.deliver_message(&SyncMessage::standing(0.0));
        receiver.process_pending().await;

        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn deactivation_triggers_reactivation() {
        let (channel, mut receiver) = started().await;

        channel.deactivate();
        receiver.process_pending().await;

        assert_eq!(channel.activate_calls(), 2);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (channel, mut receiver) = started().await;
        let mut watcher = receiver.watch();
        let (tx, rx) = oneshot::channel();

        let task = tokio::spawn(async move { receiver.run(rx).await });
        channel.deliver_message(&SyncMessage::running(110.0));
        watcher.changed().await.unwrap();
        tx.send(()).unwrap();

        let last = task.await.unwrap();
        assert_eq!(last, ActivityState::running(110.0));
    }
}
