//! Wi-Fi connection lifecycle: link bring-up, bounded flat retry and a
//! single-resolution wait for the outcome.

mod controller;
mod engine;
mod machine;
mod signal;
mod types;

pub use controller::{ConnectError, ConnectionController, NetworkStack};
pub use types::{ConnectPolicy, ConnectionState, Resolution, MAX_RETRIES_CEILING, MAX_RETRIES_DEFAULT};
