//! Error types for sync-client.

use thiserror::Error;

use crate::channel::ChannelError;

/// Client errors.
///
/// None of these ever reach the peer or the UI; they are logged where they
/// occur.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Channel error.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The component's event loop has shut down.
    #[error("event loop has shut down")]
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_errors_convert() {
        let err: ClientError = ChannelError::NotReachable.into();
        assert!(matches!(err, ClientError::Channel(ChannelError::NotReachable)));
        assert_eq!(err.to_string(), "channel error: peer not reachable");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
