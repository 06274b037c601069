use core::convert::Infallible;
use core::fmt;
use core::net::Ipv4Addr;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::event_bus::{BusError, EventBus, EventNamespace, OrderedFeed};
use crate::telemetry;

use super::engine::LinkEngine;
use super::machine::{ControllerAction, LinkCommand};
use super::signal::ResolutionSignal;
use super::types::{ConnectPolicy, ConnectionState, Resolution};

/// Radio operations the controller drives. Both calls only issue a request;
/// progress is reported back through the event bus.
pub trait NetworkStack {
    type Error: fmt::Debug;

    fn start_link(&mut self) -> Result<(), Self::Error>;
    fn request_connect(&mut self) -> Result<(), Self::Error>;
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConnectError<E> {
    Subscribe(BusError),
    LinkStart(E),
    RetriesExhausted { retries: u8 },
}

impl<E> ConnectError<E> {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Subscribe(_) => "subscribe",
            Self::LinkStart(_) => "link_start",
            Self::RetriesExhausted { .. } => "retries_exhausted",
        }
    }

    /// Link start and subscription failures are collaborator faults rather
    /// than a network outcome.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::RetriesExhausted { .. })
    }
}

impl<E: fmt::Debug> fmt::Display for ConnectError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribe(err) => write!(f, "subscribe: {}", err),
            Self::LinkStart(err) => write!(f, "link_start: {:?}", err),
            Self::RetriesExhausted { retries } => {
                write!(f, "retries_exhausted retries={}", retries)
            }
        }
    }
}

pub struct ConnectionController<'a, M: RawMutex, S: NetworkStack> {
    bus: &'a EventBus<M>,
    stack: S,
    policy: ConnectPolicy,
    engine: LinkEngine,
}

impl<'a, M: RawMutex, S: NetworkStack> ConnectionController<'a, M, S> {
    pub fn new(bus: &'a EventBus<M>, stack: S, policy: ConnectPolicy) -> Self {
        let policy = policy.sanitized();
        Self {
            bus,
            stack,
            policy,
            engine: LinkEngine::new(policy),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.engine.state()
    }

    pub fn retries(&self) -> u8 {
        self.engine.retries()
    }

    pub fn policy(&self) -> ConnectPolicy {
        self.policy
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn into_stack(self) -> S {
        self.stack
    }

    /// Starts the link and suspends until the attempt resolves.
    ///
    /// Both bus subscriptions live only for the duration of this call.
    pub async fn connect(&mut self) -> Result<Ipv4Addr, ConnectError<S::Error>> {
        self.engine = LinkEngine::new(self.policy);

        let link = self
            .bus
            .subscribe(EventNamespace::Link)
            .map_err(ConnectError::Subscribe)?;
        let address = self
            .bus
            .subscribe(EventNamespace::Address)
            .map_err(ConnectError::Subscribe)?;
        let mut feed = OrderedFeed::new(link, address);
        let signal = ResolutionSignal::<M>::new();

        telemetry::record_wifi_connect_begin();
        log::info!(
            "link: connect begin max_retries={}",
            self.policy.max_retries
        );

        if let ControllerAction::StartLink = self.engine.apply(LinkCommand::Begin) {
            if let Err(err) = self.stack.start_link() {
                log::error!("link: start failed err={:?}", err);
                self.engine = LinkEngine::new(self.policy);
                return Err(ConnectError::LinkStart(err));
            }
        }

        let resolution = match select(self.dispatch(&mut feed, &signal), signal.wait()).await {
            Either::First(never) => match never {},
            Either::Second(resolution) => resolution,
        };
        drop(feed);

        match resolution {
            Resolution::Connected(ip) => {
                telemetry::record_wifi_connect_success(ip.octets());
                log::info!("link: connected ip={} state={}", ip, self.state().as_str());
                Ok(ip)
            }
            Resolution::Failed { retries } => {
                telemetry::record_wifi_connect_failure();
                log::warn!("link: failed retries={} state={}", retries, self.state().as_str());
                Err(ConnectError::RetriesExhausted { retries })
            }
        }
    }

    async fn dispatch(
        &mut self,
        feed: &mut OrderedFeed<'_, M>,
        signal: &ResolutionSignal<M>,
    ) -> Infallible {
        loop {
            let event = feed.next().await;
            let action = self.engine.apply(LinkCommand::Net(event));
            log::debug!(
                "link: event={} state={} retries={}",
                event.as_str(),
                self.engine.state().as_str(),
                self.engine.retries()
            );
            self.perform(action, signal);
        }
    }

    fn perform(&mut self, action: ControllerAction, signal: &ResolutionSignal<M>) {
        let mut pending = Some(action);
        while let Some(action) = pending.take() {
            match action {
                ControllerAction::None
                | ControllerAction::Ignored
                | ControllerAction::StartLink => {}
                ControllerAction::RequestConnect { attempt } => {
                    if attempt > 0 {
                        telemetry::record_wifi_connect_retry();
                        log::info!(
                            "link: retry attempt={}/{}",
                            attempt,
                            self.policy.max_retries
                        );
                    }
                    let result = self.stack.request_connect();
                    telemetry::record_wifi_connect_request(result.is_ok());
                    if let Err(err) = result {
                        log::warn!(
                            "link: connect request refused attempt={} err={:?}",
                            attempt,
                            err
                        );
                        pending = Some(self.engine.apply(LinkCommand::RequestRefused));
                    }
                }
                ControllerAction::Resolve(resolution) => {
                    if !signal.assert(resolution) {
                        log::error!("link: resolution refused bits={:#04b}", signal.bits());
                    }
                }
            }
        }
    }
}
