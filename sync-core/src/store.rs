//! Observable holder for a process's [`ActivityState`].
//!
//! The store is the only place the state is mutated. Every committed change
//! bumps the revision and notifies listeners synchronously, on the caller's
//! thread, in subscription order. Readers get copies; there is no mutable
//! accessor.

use stride_sync_types::ActivityState;

type Listener = Box<dyn FnMut(&ActivityState) + Send>;

/// Handle returned by [`StateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Owned state plus its listeners.
#[derive(Default)]
pub struct StateStore {
    state: ActivityState,
    revision: u64,
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl StateStore {
    /// Create a store holding the default (standing) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn get(&self) -> ActivityState {
        self.state
    }

    /// Number of committed mutations so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Register a listener called after every commit.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ActivityState) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Replace the state and notify every listener.
    ///
    /// Listeners run even if the value is unchanged: a commit is a field
    /// mutation, and observers are told about every one.
    pub fn commit(&mut self, state: ActivityState) {
        self.state = state;
        self.revision += 1;
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &self.state)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
