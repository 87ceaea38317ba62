//! Phone-side reconciliation.
//!
//! The receiver mirrors whatever the wrist announced last. Messages are
//! applied strictly in delivery order: no deduplication, no sequence numbers,
//! no conflict detection. A message that arrives late overwrites a newer one
//! and nothing here can tell.

use stride_sync_types::{ActivityState, SyncMessage};

/// Apply a received message on top of the current state.
///
/// `is_running` always follows the message. `heart_rate` is only replaced
/// when the message carries a usable value; the legacy `{ action }` shape
/// keeps the previous rate.
pub fn reduce(current: &ActivityState, message: &SyncMessage) -> ActivityState {
    ActivityState {
        is_running: message.is_running(),
        heart_rate: message.valid_heart_rate().unwrap_or(current.heart_rate),
    }
}
