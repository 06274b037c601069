//! Bounded FIFO between the acquisition and publish workers.

use core::fmt;
use core::future::poll_fn;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_time::{with_deadline, with_timeout, Duration, Instant};

use crate::payload::Payload;
use crate::telemetry;

/// What `enqueue` does when the queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueuePolicy {
    Block,
    Deadline(Duration),
}

#[derive(Debug, PartialEq, Eq)]
pub enum QueueError {
    /// A non-waiting enqueue found the queue full.
    Full(Payload),
    /// The deadline passed while the queue stayed full.
    Timeout(Payload),
}

impl QueueError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full(_) => "full",
            Self::Timeout(_) => "timeout",
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Self::Full(payload) | Self::Timeout(payload) => payload,
        }
    }

    pub fn into_payload(self) -> Payload {
        match self {
            Self::Full(payload) | Self::Timeout(payload) => payload,
        }
    }
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} len={}", self.as_str(), self.payload().len())
    }
}

pub struct TransferQueue<M: RawMutex, const N: usize> {
    channel: Channel<M, Payload, N>,
    policy: QueuePolicy,
}

impl<M: RawMutex, const N: usize> TransferQueue<M, N> {
    pub const fn new(policy: QueuePolicy) -> Self {
        assert!(N > 0, "transfer queue capacity must be non-zero");
        Self {
            channel: Channel::new(),
            policy,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.channel.is_full()
    }

    /// Appends at the tail, waiting for space while the queue is full.
    pub async fn enqueue(&self, payload: Payload) -> Result<(), QueueError> {
        let mut payload = match self.try_enqueue(payload) {
            Ok(()) => return Ok(()),
            Err(err) => err.into_payload(),
        };

        telemetry::record_queue_backpressure();
        log::debug!("queue: full depth={} waiting", self.channel.len());

        let deadline = match self.policy {
            QueuePolicy::Block => None,
            QueuePolicy::Deadline(limit) => Some(Instant::now() + limit),
        };

        loop {
            let ready = poll_fn(|cx| self.channel.poll_ready_to_send(cx));
            match deadline {
                None => ready.await,
                Some(at) => {
                    if with_deadline(at, ready).await.is_err() {
                        telemetry::record_queue_deadline_miss();
                        return Err(QueueError::Timeout(payload));
                    }
                }
            }

            payload = match self.try_enqueue(payload) {
                Ok(()) => return Ok(()),
                Err(err) => err.into_payload(),
            };
        }
    }

    /// Appends without waiting; a full queue hands the payload back.
    pub fn try_enqueue(&self, payload: Payload) -> Result<(), QueueError> {
        match self.channel.try_send(payload) {
            Ok(()) => {
                telemetry::record_queue_enqueued(self.channel.len());
                Ok(())
            }
            Err(TrySendError::Full(payload)) => Err(QueueError::Full(payload)),
        }
    }

    /// Removes the head, waiting at most `timeout`. `None` means nothing
    /// arrived in time.
    pub async fn dequeue(&self, timeout: Duration) -> Option<Payload> {
        let payload = with_timeout(timeout, self.channel.receive()).await.ok()?;
        telemetry::record_queue_dequeued();
        Some(payload)
    }

    pub fn try_dequeue(&self) -> Option<Payload> {
        let payload = self.channel.try_receive().ok()?;
        telemetry::record_queue_dequeued();
        Some(payload)
    }
}
