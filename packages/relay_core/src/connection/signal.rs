use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::signal::Signal;

use super::types::Resolution;

pub(super) const CONNECTED_BIT: u8 = 1 << 0;
pub(super) const FAILED_BIT: u8 = 1 << 1;

/// Two mutually exclusive outcome bits for one connect attempt.
///
/// The first assertion wins and wakes the waiter; any later assertion is
/// refused so a waiter can never observe both bits.
pub(super) struct ResolutionSignal<M: RawMutex> {
    resolved: BlockingMutex<M, Cell<Option<Resolution>>>,
    wake: Signal<M, ()>,
}

impl<M: RawMutex> ResolutionSignal<M> {
    pub(super) const fn new() -> Self {
        Self {
            resolved: BlockingMutex::new(Cell::new(None)),
            wake: Signal::new(),
        }
    }

    pub(super) fn assert(&self, resolution: Resolution) -> bool {
        self.resolved.lock(|slot| {
            if slot.get().is_some() {
                return false;
            }
            slot.set(Some(resolution));
            self.wake.signal(());
            true
        })
    }

    pub(super) fn bits(&self) -> u8 {
        match self.resolved.lock(Cell::get) {
            Some(Resolution::Connected(_)) => CONNECTED_BIT,
            Some(Resolution::Failed { .. }) => FAILED_BIT,
            None => 0,
        }
    }

    pub(super) async fn wait(&self) -> Resolution {
        loop {
            if let Some(resolution) = self.resolved.lock(Cell::get) {
                return resolution;
            }
            self.wake.wait().await;
        }
    }
}
