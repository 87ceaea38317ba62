//! # sync-client
//!
//! Wrist publisher and phone receiver for the stride-sync protocol.
//!
//! This is the library the two peer processes embed. The wrist runs a
//! [`StateSync`] that turns heart-rate samples and button presses into
//! pushes; the phone runs a [`StateReceiver`] that mirrors them.
//!
//! ## Features
//!
//! - **Capability traits**: [`Channel`] and [`SensorFeed`] abstract the
//!   platform transport and biometric sensor (mocks included)
//! - **Explicit marshaling**: delegate callbacks only post to an [`Inbox`];
//!   state is mutated solely by the owning component's loop
//! - **Pure State Machine**: Uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use stride_sync_client::{MockChannel, MockSensorFeed, PublisherConfig, StateReceiver, StateSync};
//!
//! let (wrist, phone) = MockChannel::pair();
//! let mut receiver = StateReceiver::new(phone);
//! let mut publisher = StateSync::new(PublisherConfig::default(), wrist, MockSensorFeed::new());
//!
//! receiver.start().await;
//! publisher.start().await;
//!
//! publisher.sensor().emit_heart_rate(128.0);
//! publisher.process_pending().await;
//! receiver.process_pending().await;
//! assert!(receiver.state().is_running);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod inbox;
pub mod presentation;
pub mod publisher;
pub mod receiver;
pub mod sensor;

pub use channel::{
    activate_logged, send_message, ActivationState, Channel, ChannelDelegate, ChannelError,
    MockChannel,
};
pub use error::ClientError;
pub use inbox::{ChannelEvent, Inbox, SensorEvent};
pub use presentation::{HeartPulse, PhoneScene, WristStatus};
pub use publisher::{Command, PublisherConfig, PublisherHandle, PublisherInput, StateSync};
pub use receiver::StateReceiver;
pub use sensor::{
    HeartRateSample, MockSensorFeed, NoSensor, SensorDelegate, SensorError, SensorFeed,
    SessionHandle, StreamHandle, WorkoutActivity, WorkoutConfig, WorkoutLocation,
};

pub use stride_sync_core::{PublisherMode, SessionPhase, StopPolicy};
pub use stride_sync_types::{ActivityState, SyncMessage};
