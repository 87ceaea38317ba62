//! # sync-types
//!
//! Wire format types for the stride-sync activity protocol.
//!
//! This crate provides the foundational types shared by the wrist publisher
//! and the phone receiver:
//! - [`ActivityState`] - The synchronized `{ is_running, heart_rate }` fact
//! - [`SyncMessage`] - The channel payload (`{ action, heartRate? }`)
//! - [`SyncAction`] - Typed view of the `action` string
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod activity;
mod error;
mod messages;

pub use activity::ActivityState;
pub use error::SyncError;
pub use messages::{SyncAction, SyncMessage, ACTION_RUNNING, ACTION_STANDING};
