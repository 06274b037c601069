use std::cell::RefCell;

use embassy_futures::join::join;
use embassy_futures::select::{select, Either};
use embassy_futures::{block_on, yield_now};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant, Timer};

use super::acquisition::next_deadline;
use super::*;
use crate::payload::Reading;
use crate::queue::{QueuePolicy, TransferQueue};

const TOPIC: &str = "/topic/test";

type Queue<const N: usize> = TransferQueue<CriticalSectionRawMutex, N>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SensorFault;

struct CountingSampler {
    next: u16,
    fail_every: Option<u16>,
}

impl CountingSampler {
    fn new() -> Self {
        Self {
            next: 0,
            fail_every: None,
        }
    }
}

impl Sampler for CountingSampler {
    type Error = SensorFault;

    fn sample(&mut self) -> Result<Reading, SensorFault> {
        let value = self.next;
        self.next += 1;
        if self.fail_every.is_some_and(|every| value % every == every - 1) {
            return Err(SensorFault);
        }
        Ok(Reading::from_samples(&[value, value + 100]).unwrap())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LinkDown;

struct RecordingPublisher<'a> {
    sent: &'a RefCell<Vec<(String, Vec<u8>)>>,
    fail_next: bool,
    next_id: MessageId,
}

impl<'a> RecordingPublisher<'a> {
    fn new(sent: &'a RefCell<Vec<(String, Vec<u8>)>>) -> Self {
        Self {
            sent,
            fail_next: false,
            next_id: 0,
        }
    }
}

impl Publisher for RecordingPublisher<'_> {
    type Error = LinkDown;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, LinkDown> {
        yield_now().await;
        if core::mem::take(&mut self.fail_next) {
            return Err(LinkDown);
        }
        self.sent
            .borrow_mut()
            .push((topic.to_owned(), payload.to_vec()));
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        Ok(id)
    }
}

fn fast_timing() -> PublishTiming {
    PublishTiming {
        dequeue_wait: Duration::from_millis(5),
        idle_sleep: Duration::from_millis(1),
    }
}

fn seq_of(payload: &[u8]) -> u32 {
    let text = core::str::from_utf8(payload).unwrap();
    let start = text.find("\"seq\":").unwrap() + "\"seq\":".len();
    let end = start + text[start..].find(',').unwrap();
    text[start..end].parse().unwrap()
}

fn uptime_of(payload: &[u8]) -> u64 {
    let text = core::str::from_utf8(payload).unwrap();
    let start = text.find("\"uptime_ms\":").unwrap() + "\"uptime_ms\":".len();
    let end = start + text[start..].find(',').unwrap();
    text[start..end].parse().unwrap()
}

#[test]
fn acquire_once_enqueues_sequenced_readings() {
    let queue = Queue::<4>::new(QueuePolicy::Block);
    let mut acquisition = Acquisition::new(&queue, CountingSampler::new());

    block_on(async {
        acquisition.acquire_once(10).await.unwrap();
        acquisition.acquire_once(20).await.unwrap();
    });

    assert_eq!(acquisition.next_seq(), 2);
    let first = queue.try_dequeue().unwrap();
    assert_eq!(
        first.as_bytes(),
        br#"{"seq":0,"uptime_ms":10,"samples":[0,100]}"#
    );
    let second = queue.try_dequeue().unwrap();
    assert_eq!(seq_of(&second), 1);
}

#[test]
fn sample_failure_skips_tick_without_enqueueing() {
    let queue = Queue::<4>::new(QueuePolicy::Block);
    let mut sampler = CountingSampler::new();
    sampler.fail_every = Some(1);
    let mut acquisition = Acquisition::new(&queue, sampler);

    let result = block_on(acquisition.acquire_once(0));

    assert_eq!(result, Err(AcquireError::Sample(SensorFault)));
    assert_eq!(result.unwrap_err().as_str(), "sample");
    assert_eq!(acquisition.next_seq(), 0);
    assert!(queue.is_empty());
}

#[test]
fn acquisition_waits_for_space_instead_of_dropping() {
    let queue = Queue::<2>::new(QueuePolicy::Block);
    let mut acquisition = Acquisition::new(&queue, CountingSampler::new());

    let producer = async {
        for tick in 0..5u64 {
            acquisition.acquire_once(tick).await.unwrap();
        }
    };
    let consumer = async {
        let mut seqs = Vec::new();
        while seqs.len() < 5 {
            yield_now().await;
            if let Some(payload) = queue.dequeue(Duration::from_millis(50)).await {
                seqs.push(seq_of(&payload));
            }
        }
        seqs
    };

    let ((), seqs) = block_on(join(producer, consumer));
    assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
}

#[test]
fn publish_once_reports_idle_on_empty_queue() {
    let queue = Queue::<2>::new(QueuePolicy::Block);
    let sent = RefCell::new(Vec::new());
    let mut worker = PublishLoop::new(&queue, RecordingPublisher::new(&sent), TOPIC, fast_timing());

    assert_eq!(block_on(worker.publish_once()), Ok(PublishStep::Idle));
    assert!(sent.borrow().is_empty());
}

#[test]
fn publish_once_forwards_payload_to_fixed_topic() {
    let queue = Queue::<2>::new(QueuePolicy::Block);
    queue
        .try_enqueue(crate::payload::Payload::from_slice(b"abc").unwrap())
        .unwrap();
    let sent = RefCell::new(Vec::new());
    let mut worker = PublishLoop::new(&queue, RecordingPublisher::new(&sent), TOPIC, fast_timing());

    let step = block_on(worker.publish_once());

    assert_eq!(
        step,
        Ok(PublishStep::Sent {
            message_id: 0,
            len: 3
        })
    );
    assert_eq!(
        sent.borrow().as_slice(),
        &[(TOPIC.to_owned(), b"abc".to_vec())]
    );
}

#[test]
fn failed_transmit_is_reported_and_not_retried() {
    let queue = Queue::<2>::new(QueuePolicy::Block);
    queue
        .try_enqueue(crate::payload::Payload::from_slice(b"lost").unwrap())
        .unwrap();
    let sent = RefCell::new(Vec::new());
    let mut publisher = RecordingPublisher::new(&sent);
    publisher.fail_next = true;
    let mut worker = PublishLoop::new(&queue, publisher, TOPIC, fast_timing());

    let first = block_on(worker.publish_once());
    assert_eq!(
        first,
        Err(PublishError {
            error: LinkDown,
            dropped_len: 4
        })
    );

    assert_eq!(block_on(worker.publish_once()), Ok(PublishStep::Idle));
    assert!(sent.borrow().is_empty());
}

#[test]
fn running_workers_relay_readings_in_order() {
    let queue = Queue::<3>::new(QueuePolicy::Block);
    let sent = RefCell::new(Vec::new());
    let acquisition = Acquisition::new(&queue, CountingSampler::new());
    let worker = PublishLoop::new(&queue, RecordingPublisher::new(&sent), TOPIC, fast_timing());

    let workers = join(
        acquisition.run(Duration::from_millis(2)),
        worker.run(),
    );
    let stop = async {
        while sent.borrow().len() < 6 {
            Timer::after(Duration::from_millis(1)).await;
        }
    };
    match block_on(select(workers, stop)) {
        Either::First(_) => unreachable!("workers never return"),
        Either::Second(()) => {}
    }

    let sent = sent.borrow();
    let seqs: Vec<u32> = sent.iter().map(|(_, payload)| seq_of(payload)).collect();
    assert_eq!(&seqs[..6], &[0, 1, 2, 3, 4, 5]);
    assert!(sent.iter().all(|(topic, _)| topic == TOPIC));
}

#[test]
fn next_deadline_skips_ticks_that_already_passed() {
    let period = Duration::from_millis(100);
    let previous = Instant::from_millis(1_000);

    assert_eq!(
        next_deadline(previous, period, Instant::from_millis(1_050)),
        Instant::from_millis(1_100)
    );
    assert_eq!(
        next_deadline(previous, period, Instant::from_millis(1_100)),
        Instant::from_millis(1_100)
    );
    assert_eq!(
        next_deadline(previous, period, Instant::from_millis(1_350)),
        Instant::from_millis(1_400)
    );
    assert_eq!(
        next_deadline(previous, period, Instant::from_millis(1_200)),
        Instant::from_millis(1_200)
    );
}

#[test]
fn stalled_consumer_does_not_bunch_later_samples() {
    const PERIOD_MS: u64 = 20;
    let queue = Queue::<1>::new(QueuePolicy::Block);
    let acquisition = Acquisition::new(&queue, CountingSampler::new());

    let consumer = async {
        Timer::after(Duration::from_millis(PERIOD_MS * 5)).await;
        let mut stamps = Vec::new();
        while stamps.len() < 6 {
            if let Some(payload) = queue.dequeue(Duration::from_millis(PERIOD_MS * 4)).await {
                stamps.push(uptime_of(&payload));
            }
        }
        stamps
    };

    let stamps = match block_on(select(
        acquisition.run(Duration::from_millis(PERIOD_MS)),
        consumer,
    )) {
        Either::First(()) => unreachable!("acquisition never returns"),
        Either::Second(stamps) => stamps,
    };

    for pair in stamps.windows(2) {
        assert!(
            pair[1] - pair[0] >= PERIOD_MS / 2,
            "samples bunched after stall: {:?}",
            stamps
        );
    }
}
