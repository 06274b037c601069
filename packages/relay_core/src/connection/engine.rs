use statig::blocking::IntoStateMachineExt as _;

use super::machine::{ControllerAction, DispatchContext, LinkCommand, LinkMachine};
use super::types::{ConnectPolicy, ConnectionState};

pub(super) struct LinkEngine {
    machine: statig::blocking::StateMachine<LinkMachine>,
}

impl LinkEngine {
    pub(super) fn new(policy: ConnectPolicy) -> Self {
        let policy = policy.sanitized();
        Self {
            machine: LinkMachine::new(policy.max_retries).state_machine(),
        }
    }

    pub(super) fn state(&self) -> ConnectionState {
        self.machine.inner().state
    }

    pub(super) fn retries(&self) -> u8 {
        self.machine.inner().retries
    }

    pub(super) fn apply(&mut self, command: LinkCommand) -> ControllerAction {
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&command, &mut context);
        context.action
    }
}
