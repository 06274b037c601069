use esp_println::println;
use relay_core::{telemetry, NetEvent};

use super::super::config::EVENT_BUS;
use super::EspStation;

/// Logs link events for the lifetime of the firmware. Nothing here reconnects;
/// holding the station keeps the radio driver alive.
pub(crate) async fn run_link_monitor(_station: EspStation) {
    let mut events = match EVENT_BUS.subscribe_all() {
        Ok(events) => events,
        Err(err) => {
            println!("wifi: link monitor disabled err={}", err);
            core::future::pending::<()>().await;
            return;
        }
    };

    loop {
        let stamped = events.next().await;
        match stamped.event {
            NetEvent::LinkStarted => println!("wifi: event sta_start seq={}", stamped.seq),
            NetEvent::LinkDisconnected { reason } => {
                telemetry::record_wifi_link_drop();
                println!(
                    "wifi: event sta_disconnected reason={} ({}) seq={}",
                    reason,
                    disconnect_reason_label(reason),
                    stamped.seq
                );
            }
            NetEvent::AddressAcquired(ip) => {
                println!("wifi: event address_acquired ip={} seq={}", ip, stamped.seq)
            }
        }
    }
}

fn disconnect_reason_label(reason: u8) -> &'static str {
    match reason {
        2 => "auth_expire",
        8 => "assoc_leave",
        15 => "4way_handshake_timeout",
        200 => "beacon_timeout",
        201 => "no_ap_found",
        202 => "auth_fail",
        203 => "assoc_fail",
        204 => "handshake_timeout",
        205 => "connection_fail",
        210 => "no_ap_found_compatible_security",
        211 => "no_ap_found_authmode_threshold",
        212 => "no_ap_found_rssi_threshold",
        _ => "other",
    }
}
