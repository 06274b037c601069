use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use relay_core::{EventBus, QueuePolicy, TransferQueue};

pub(crate) const READING_QUEUE_DEPTH: usize = 8;

pub(crate) static EVENT_BUS: EventBus<CriticalSectionRawMutex> = EventBus::new();
pub(crate) static READINGS: TransferQueue<CriticalSectionRawMutex, READING_QUEUE_DEPTH> =
    TransferQueue::new(QueuePolicy::Block);
