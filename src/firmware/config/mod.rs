mod channels;

use core::net::Ipv4Addr;

use embassy_time::Duration;
use relay_core::{ConnectPolicy, PublishTiming};

pub(crate) use channels::{EVENT_BUS, READINGS};

pub(crate) const DESTINATION_TOPIC: &str = "/topic/tcc-iot";

pub(crate) const MQTT_BROKER_HOST_DEFAULT: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 9);
pub(crate) const MQTT_BROKER_PORT_DEFAULT: u16 = 1883;
pub(crate) const MQTT_CLIENT_ID: &str = "sensor-relay";
pub(crate) const MQTT_KEEP_ALIVE_SECS: u16 = 60;
pub(crate) const MQTT_SOCKET_TIMEOUT_SECS: u64 = 10;

pub(crate) const ACQUISITION_PERIOD_MS: u64 = 5_000;
pub(crate) const SAMPLES_PER_READING: usize = 16;
pub(crate) const PUBLISH_DEQUEUE_WAIT_MS: u64 = 1_000;
pub(crate) const PUBLISH_IDLE_SLEEP_MS: u64 = 100;
pub(crate) const STATUS_INTERVAL_SECONDS: u64 = 60;

pub(crate) const RECLAIMED_HEAP_BYTES: usize = 64 * 1024;
pub(crate) const HEAP_BYTES: usize = 36 * 1024;

pub(crate) fn connect_policy() -> ConnectPolicy {
    ConnectPolicy::defaults()
}

pub(crate) fn publish_timing() -> PublishTiming {
    PublishTiming {
        dequeue_wait: Duration::from_millis(PUBLISH_DEQUEUE_WAIT_MS),
        idle_sleep: Duration::from_millis(PUBLISH_IDLE_SLEEP_MS),
    }
}

pub(crate) fn wifi_credentials() -> Option<(&'static str, &'static str)> {
    let ssid = option_env!("RELAY_WIFI_SSID").or(option_env!("SSID"))?;
    let password = option_env!("RELAY_WIFI_PASSWORD")
        .or(option_env!("PASSWORD"))
        .unwrap_or("");
    Some((ssid, password))
}

/// Broker address from `RELAY_MQTT_HOST` / `RELAY_MQTT_PORT`. Unparseable
/// overrides fall back to the defaults with a log line.
pub(crate) fn broker_endpoint() -> (Ipv4Addr, u16) {
    let host = match option_env!("RELAY_MQTT_HOST").map(str::parse::<Ipv4Addr>) {
        Some(Ok(host)) => host,
        Some(Err(_)) => {
            log::warn!("config: RELAY_MQTT_HOST is not an IPv4 address; using default");
            MQTT_BROKER_HOST_DEFAULT
        }
        None => MQTT_BROKER_HOST_DEFAULT,
    };
    let port = match option_env!("RELAY_MQTT_PORT").map(str::parse::<u16>) {
        Some(Ok(port)) if port != 0 => port,
        Some(_) => {
            log::warn!("config: RELAY_MQTT_PORT is invalid; using default");
            MQTT_BROKER_PORT_DEFAULT
        }
        None => MQTT_BROKER_PORT_DEFAULT,
    };
    (host, port)
}
