use core::sync::atomic::{AtomicBool, Ordering};

use embassy_net::Stack;
use esp_radio::wifi::event::{self, EventExt};
use relay_core::NetEvent;

use super::super::config::EVENT_BUS;

static EVENT_BRIDGE_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Forwards driver callbacks onto the event bus. Runs in the radio's event
/// context, so the handlers only publish.
pub(crate) fn install_event_bridge() {
    if EVENT_BRIDGE_INSTALLED.swap(true, Ordering::Relaxed) {
        return;
    }

    event::StaStart::update_handler(|_| {
        EVENT_BUS.publish(NetEvent::LinkStarted);
    });

    event::StaDisconnected::update_handler(|event| {
        EVENT_BUS.publish(NetEvent::LinkDisconnected {
            reason: event.reason(),
        });
    });
}

/// Publishes `AddressAcquired` each time DHCP configures the interface.
pub(crate) async fn watch_addresses(stack: Stack<'static>) {
    loop {
        stack.wait_config_up().await;
        match stack.config_v4() {
            Some(config) => {
                let address = config.address.address();
                log::info!("wifi: dhcp bound ip={}", address);
                EVENT_BUS.publish(NetEvent::AddressAcquired(address));
            }
            None => log::warn!("wifi: config up without ipv4"),
        }
        stack.wait_config_down().await;
        log::info!("wifi: dhcp lease lost");
    }
}
