//! Acquisition and publish workers. Both run forever once spawned; the
//! transfer queue is the only thing they share.

mod acquisition;
mod publish;

pub use acquisition::{AcquireError, Acquisition, Sampler};
pub use publish::{MessageId, PublishError, PublishLoop, PublishStep, PublishTiming, Publisher};

#[cfg(test)]
mod tests;
