use embassy_time::{Duration, Ticker};
use esp_println::println;
use relay_core::telemetry;

use super::super::config::{READINGS, STATUS_INTERVAL_SECONDS};

pub(super) async fn run_status_log() {
    let mut ticker = Ticker::every(Duration::from_secs(STATUS_INTERVAL_SECONDS));
    loop {
        ticker.next().await;
        let snapshot = telemetry::snapshot();
        println!(
            "relay: status link={} ip={:?} connect_requests={} retries={} drops={} queue_depth={} queue_hwm={} enqueued={} backpressure={} published={} publish_failures={} sample_failures={} bus_lag={}",
            snapshot.wifi_link_connected,
            snapshot.wifi_ipv4,
            snapshot.wifi_connect_requests,
            snapshot.wifi_connect_retries,
            snapshot.wifi_link_drops,
            READINGS.len(),
            snapshot.queue_high_water,
            snapshot.queue_enqueued,
            snapshot.queue_backpressure_waits,
            snapshot.publish_successes,
            snapshot.publish_failures,
            snapshot.sample_failures,
            snapshot.bus_lagged_events,
        );
    }
}
