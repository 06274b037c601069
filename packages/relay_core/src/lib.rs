#![cfg_attr(not(test), no_std)]

pub mod connection;
pub mod event_bus;
pub mod mqtt;
pub mod payload;
pub mod queue;
pub mod store;
pub mod tasks;
pub mod telemetry;

pub use connection::{
    ConnectError, ConnectPolicy, ConnectionController, ConnectionState, NetworkStack,
    MAX_RETRIES_DEFAULT,
};
pub use event_bus::{BusError, EventBus, EventNamespace, NetEvent, Subscription};
pub use payload::{Payload, PayloadError, Reading, PAYLOAD_MAX, SAMPLE_BATCH_MAX};
pub use queue::{QueueError, QueuePolicy, TransferQueue};
pub use tasks::{Acquisition, MessageId, PublishLoop, PublishTiming, Publisher, Sampler};
