use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant, Timer};

use crate::payload::{PayloadError, Reading};
use crate::queue::{QueueError, TransferQueue};
use crate::telemetry;

pub trait Sampler {
    type Error: fmt::Debug;

    fn sample(&mut self) -> Result<Reading, Self::Error>;
}

#[derive(Debug, PartialEq, Eq)]
pub enum AcquireError<E> {
    Sample(E),
    Encode(PayloadError),
    Queue(QueueError),
}

impl<E> AcquireError<E> {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sample(_) => "sample",
            Self::Encode(_) => "encode",
            Self::Queue(_) => "queue",
        }
    }
}

impl<E: fmt::Debug> fmt::Display for AcquireError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sample(err) => write!(f, "sample: {:?}", err),
            Self::Encode(err) => write!(f, "encode: {}", err),
            Self::Queue(err) => write!(f, "queue: {}", err),
        }
    }
}

pub struct Acquisition<'q, M: RawMutex, S: Sampler, const N: usize> {
    queue: &'q TransferQueue<M, N>,
    sampler: S,
    seq: u32,
}

impl<'q, M: RawMutex, S: Sampler, const N: usize> Acquisition<'q, M, S, N> {
    pub fn new(queue: &'q TransferQueue<M, N>, sampler: S) -> Self {
        Self {
            queue,
            sampler,
            seq: 0,
        }
    }

    pub fn next_seq(&self) -> u32 {
        self.seq
    }

    /// Samples once and enqueues the serialized reading. A full queue
    /// suspends here until the publisher catches up.
    pub async fn acquire_once(&mut self, uptime_ms: u64) -> Result<(), AcquireError<S::Error>> {
        let reading = self.sampler.sample().map_err(AcquireError::Sample)?;
        let payload = reading
            .encode(self.seq, uptime_ms)
            .map_err(AcquireError::Encode)?;
        self.queue
            .enqueue(payload)
            .await
            .map_err(AcquireError::Queue)?;
        self.seq = self.seq.wrapping_add(1);
        Ok(())
    }

    pub async fn run(mut self, period: Duration) {
        log::info!(
            "acquire: started period_ms={} queue_capacity={}",
            period.as_millis(),
            self.queue.capacity()
        );
        let mut deadline = Instant::now();
        loop {
            let uptime_ms = Instant::now().as_millis();
            match self.acquire_once(uptime_ms).await {
                Ok(()) => log::debug!("acquire: queued seq={}", self.seq.wrapping_sub(1)),
                Err(err) => {
                    if matches!(err, AcquireError::Sample(_)) {
                        telemetry::record_sample_failure();
                    }
                    log::warn!("acquire: tick failed seq={} err={}", self.seq, err);
                }
            }
            deadline = next_deadline(deadline, period, Instant::now());
            Timer::at(deadline).await;
        }
    }
}

/// Next tick on the `previous + k * period` grid that has not already passed.
/// Ticks missed while the queue held the producer back are dropped rather
/// than fired back to back.
pub(super) fn next_deadline(previous: Instant, period: Duration, now: Instant) -> Instant {
    let next = previous + period;
    if next >= now || period.as_ticks() == 0 {
        return next.max(now);
    }
    let behind = now.as_ticks() - next.as_ticks();
    let skipped = behind.div_ceil(period.as_ticks());
    log::debug!("acquire: overran period skipped_ticks={}", skipped);
    next + Duration::from_ticks(period.as_ticks() * skipped)
}
