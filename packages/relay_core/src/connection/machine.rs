use statig::prelude::*;

use crate::event_bus::NetEvent;

use super::types::{ConnectionState, Resolution};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum LinkCommand {
    Begin,
    Net(NetEvent),
    /// The stack rejected a connect request outright; no driver event follows.
    RequestRefused,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ControllerAction {
    None,
    Ignored,
    StartLink,
    RequestConnect { attempt: u8 },
    Resolve(Resolution),
}

#[derive(Clone, Copy, Debug)]
pub(super) struct DispatchContext {
    pub(super) action: ControllerAction,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            action: ControllerAction::None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(super) struct LinkMachine {
    pub(super) state: ConnectionState,
    pub(super) retries: u8,
    max_retries: u8,
    first_request_issued: bool,
}

impl LinkMachine {
    pub(super) fn new(max_retries: u8) -> Self {
        Self {
            state: ConnectionState::Idle,
            retries: 0,
            max_retries,
            first_request_issued: false,
        }
    }
}

#[state_machine(initial = "State::idle()")]
impl LinkMachine {
    #[state]
    fn idle(&mut self, context: &mut DispatchContext, event: &LinkCommand) -> Outcome<State> {
        match event {
            LinkCommand::Begin => {
                self.retries = 0;
                self.first_request_issued = false;
                self.state = ConnectionState::Connecting;
                context.action = ControllerAction::StartLink;
                Transition(State::connecting())
            }
            _ => {
                context.action = ControllerAction::Ignored;
                Handled
            }
        }
    }

    #[state]
    fn connecting(
        &mut self,
        context: &mut DispatchContext,
        event: &LinkCommand,
    ) -> Outcome<State> {
        match event {
            LinkCommand::Begin => {
                context.action = ControllerAction::Ignored;
                Handled
            }
            LinkCommand::Net(NetEvent::LinkStarted) => {
                if self.first_request_issued {
                    context.action = ControllerAction::Ignored;
                } else {
                    self.first_request_issued = true;
                    context.action = ControllerAction::RequestConnect { attempt: 0 };
                }
                Handled
            }
            LinkCommand::Net(NetEvent::LinkDisconnected { .. }) | LinkCommand::RequestRefused => {
                if self.retries < self.max_retries {
                    self.retries += 1;
                    context.action = ControllerAction::RequestConnect {
                        attempt: self.retries,
                    };
                    Handled
                } else {
                    self.state = ConnectionState::Failed;
                    context.action = ControllerAction::Resolve(Resolution::Failed {
                        retries: self.retries,
                    });
                    Transition(State::failed())
                }
            }
            LinkCommand::Net(NetEvent::AddressAcquired(ip)) => {
                self.retries = 0;
                self.state = ConnectionState::Connected;
                context.action = ControllerAction::Resolve(Resolution::Connected(*ip));
                Transition(State::connected())
            }
        }
    }

    #[state]
    fn connected(&mut self, context: &mut DispatchContext, event: &LinkCommand) -> Outcome<State> {
        log::debug!("link: ignoring command={:?} state=connected", event);
        context.action = ControllerAction::Ignored;
        Handled
    }

    #[state]
    fn failed(&mut self, context: &mut DispatchContext, event: &LinkCommand) -> Outcome<State> {
        log::debug!("link: ignoring command={:?} state=failed", event);
        context.action = ControllerAction::Ignored;
        Handled
    }
}
