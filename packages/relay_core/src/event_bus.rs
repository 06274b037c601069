//! Process-wide notification bus for network stack events.
//!
//! Every event is stamped with a bus-wide sequence number at publish time so
//! listeners holding more than one namespace subscription can recover the
//! raise order across namespaces (see [`OrderedFeed`]).

use core::cell::Cell;
use core::fmt;
use core::net::Ipv4Addr;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::pubsub::{PubSubChannel, Subscriber, WaitResult};

use crate::telemetry;

pub const BUS_DEPTH: usize = 8;
pub const BUS_SUBSCRIBERS: usize = 4;
const BUS_PUBLISHERS: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventNamespace {
    Link,
    Address,
}

impl EventNamespace {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Address => "address",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetEvent {
    LinkStarted,
    LinkDisconnected { reason: u8 },
    AddressAcquired(Ipv4Addr),
}

impl NetEvent {
    pub const fn namespace(self) -> EventNamespace {
        match self {
            Self::LinkStarted | Self::LinkDisconnected { .. } => EventNamespace::Link,
            Self::AddressAcquired(_) => EventNamespace::Address,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LinkStarted => "link_started",
            Self::LinkDisconnected { .. } => "link_disconnected",
            Self::AddressAcquired(_) => "address_acquired",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stamped {
    pub seq: u32,
    pub event: NetEvent,
}

impl Stamped {
    fn precedes(self, other: Self) -> bool {
        (self.seq.wrapping_sub(other.seq) as i32) < 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusError {
    SubscriberLimit,
}

impl BusError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubscriberLimit => "subscriber_limit",
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type BusChannel<M> = PubSubChannel<M, Stamped, BUS_DEPTH, BUS_SUBSCRIBERS, BUS_PUBLISHERS>;
type BusSubscriber<'a, M> =
    Subscriber<'a, M, Stamped, BUS_DEPTH, BUS_SUBSCRIBERS, BUS_PUBLISHERS>;

pub struct EventBus<M: RawMutex> {
    channel: BusChannel<M>,
    next_seq: BlockingMutex<M, Cell<u32>>,
}

impl<M: RawMutex> Default for EventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> EventBus<M> {
    pub const fn new() -> Self {
        Self {
            channel: PubSubChannel::new(),
            next_seq: BlockingMutex::new(Cell::new(0)),
        }
    }

    /// Publishes without waiting. Slow subscribers lose their oldest pending
    /// event and observe a lag on their next read.
    pub fn publish(&self, event: NetEvent) {
        self.next_seq.lock(|next_seq| {
            let seq = next_seq.get();
            next_seq.set(seq.wrapping_add(1));
            self.channel
                .immediate_publisher()
                .publish_immediate(Stamped { seq, event });
        });
    }

    pub fn subscribe(&self, namespace: EventNamespace) -> Result<Subscription<'_, M>, BusError> {
        self.subscribe_filtered(Some(namespace))
    }

    pub fn subscribe_all(&self) -> Result<Subscription<'_, M>, BusError> {
        self.subscribe_filtered(None)
    }

    fn subscribe_filtered(
        &self,
        namespace: Option<EventNamespace>,
    ) -> Result<Subscription<'_, M>, BusError> {
        let inner = self
            .channel
            .subscriber()
            .map_err(|_| BusError::SubscriberLimit)?;
        Ok(Subscription { inner, namespace })
    }
}

/// A registered listener. Dropping it deregisters from the bus.
pub struct Subscription<'a, M: RawMutex> {
    inner: BusSubscriber<'a, M>,
    namespace: Option<EventNamespace>,
}

impl<M: RawMutex> Subscription<'_, M> {
    pub fn namespace(&self) -> Option<EventNamespace> {
        self.namespace
    }

    fn accepts(&self, stamped: &Stamped) -> bool {
        match self.namespace {
            Some(namespace) => stamped.event.namespace() == namespace,
            None => true,
        }
    }

    fn note_lag(&self, missed: u64) {
        log::warn!(
            "bus: subscriber lagged namespace={} missed={}",
            self.namespace.map_or("all", EventNamespace::as_str),
            missed
        );
        telemetry::record_bus_lag(missed);
    }

    pub async fn next(&mut self) -> Stamped {
        loop {
            match self.inner.next_message().await {
                WaitResult::Message(stamped) if self.accepts(&stamped) => return stamped,
                WaitResult::Message(_) => {}
                WaitResult::Lagged(missed) => self.note_lag(missed),
            }
        }
    }

    pub fn try_next(&mut self) -> Option<Stamped> {
        loop {
            match self.inner.try_next_message()? {
                WaitResult::Message(stamped) if self.accepts(&stamped) => return Some(stamped),
                WaitResult::Message(_) => {}
                WaitResult::Lagged(missed) => self.note_lag(missed),
            }
        }
    }
}

/// Merges a link and an address subscription back into raise order.
pub struct OrderedFeed<'a, M: RawMutex> {
    sources: [Subscription<'a, M>; 2],
    pending: [Option<Stamped>; 2],
}

impl<'a, M: RawMutex> OrderedFeed<'a, M> {
    pub fn new(link: Subscription<'a, M>, address: Subscription<'a, M>) -> Self {
        Self {
            sources: [link, address],
            pending: [None, None],
        }
    }

    fn earliest_pending(&self) -> Option<usize> {
        match self.pending {
            [Some(a), Some(b)] => Some(if b.precedes(a) { 1 } else { 0 }),
            [Some(_), None] => Some(0),
            [None, Some(_)] => Some(1),
            [None, None] => None,
        }
    }

    pub async fn next(&mut self) -> NetEvent {
        loop {
            for (source, slot) in self.sources.iter_mut().zip(self.pending.iter_mut()) {
                if slot.is_none() {
                    *slot = source.try_next();
                }
            }

            if let Some(stamped) = self
                .earliest_pending()
                .and_then(|index| self.pending[index].take())
            {
                return stamped.event;
            }

            let [link, address] = &mut self.sources;
            match select(link.next(), address.next()).await {
                Either::First(stamped) => self.pending[0] = Some(stamped),
                Either::Second(stamped) => self.pending[1] = Some(stamped),
            }
        }
    }
}
