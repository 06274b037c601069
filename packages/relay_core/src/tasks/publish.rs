use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};

use crate::queue::TransferQueue;
use crate::telemetry;

pub type MessageId = u16;

/// The publish-protocol client. Connection management, if any, is the
/// implementor's business.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    type Error: fmt::Debug;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, Self::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublishTiming {
    pub dequeue_wait: Duration,
    pub idle_sleep: Duration,
}

impl Default for PublishTiming {
    fn default() -> Self {
        Self::defaults()
    }
}

impl PublishTiming {
    pub const fn defaults() -> Self {
        Self {
            dequeue_wait: Duration::from_millis(1_000),
            idle_sleep: Duration::from_millis(100),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishStep {
    Idle,
    Sent { message_id: MessageId, len: usize },
}

/// A transmit that failed. The payload is already gone; there is no retry.
#[derive(Debug, PartialEq, Eq)]
pub struct PublishError<E> {
    pub error: E,
    pub dropped_len: usize,
}

pub struct PublishLoop<'q, M: RawMutex, P: Publisher, const N: usize> {
    queue: &'q TransferQueue<M, N>,
    publisher: P,
    topic: &'static str,
    timing: PublishTiming,
}

impl<'q, M: RawMutex, P: Publisher, const N: usize> PublishLoop<'q, M, P, N> {
    pub fn new(
        queue: &'q TransferQueue<M, N>,
        publisher: P,
        topic: &'static str,
        timing: PublishTiming,
    ) -> Self {
        Self {
            queue,
            publisher,
            topic,
            timing,
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub async fn publish_once(&mut self) -> Result<PublishStep, PublishError<P::Error>> {
        let Some(payload) = self.queue.dequeue(self.timing.dequeue_wait).await else {
            return Ok(PublishStep::Idle);
        };

        let len = payload.len();
        match self.publisher.publish(self.topic, &payload).await {
            Ok(message_id) => {
                telemetry::record_publish_success(len);
                Ok(PublishStep::Sent { message_id, len })
            }
            Err(error) => {
                telemetry::record_publish_failure();
                Err(PublishError {
                    error,
                    dropped_len: len,
                })
            }
        }
    }

    pub async fn run(mut self) {
        log::info!("publish: started topic={}", self.topic);
        loop {
            match self.publish_once().await {
                Ok(PublishStep::Idle) => Timer::after(self.timing.idle_sleep).await,
                Ok(PublishStep::Sent { message_id, len }) => {
                    log::debug!("publish: sent msg_id={} len={}", message_id, len);
                }
                Err(err) => {
                    log::warn!(
                        "publish: transmit failed len={} err={:?}",
                        err.dropped_len,
                        err.error
                    );
                }
            }
        }
    }
}
