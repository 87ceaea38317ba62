//! # sync-core
//!
//! Pure logic for stride-sync (no I/O, instant tests).
//!
//! This crate implements the wrist-side publisher state machine, the
//! phone-side reducer and the observable state holder without any channel
//! or sensor I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (channel sends, sensor sessions) is performed by
//! `sync-client`, which interprets the actions produced by these state
//! machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod mirror;
pub mod state;
pub mod store;

pub use mirror::reduce;
pub use state::{
    PublisherAction, PublisherEvent, PublisherMode, PublisherPhase, Rules, SessionPhase,
    StopPolicy, DEFAULT_RUNNING_THRESHOLD_BPM,
};
pub use store::{StateStore, SubscriptionId};
