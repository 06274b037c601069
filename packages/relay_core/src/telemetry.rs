use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

static WIFI_CONNECT_BEGINS: AtomicU32 = AtomicU32::new(0);
static WIFI_CONNECT_REQUESTS: AtomicU32 = AtomicU32::new(0);
static WIFI_CONNECT_REQUEST_ERRORS: AtomicU32 = AtomicU32::new(0);
static WIFI_CONNECT_RETRIES: AtomicU32 = AtomicU32::new(0);
static WIFI_CONNECT_SUCCESSES: AtomicU32 = AtomicU32::new(0);
static WIFI_CONNECT_FAILURES: AtomicU32 = AtomicU32::new(0);
static WIFI_LINK_DROPS: AtomicU32 = AtomicU32::new(0);
static BUS_LAGGED_EVENTS: AtomicU32 = AtomicU32::new(0);
static QUEUE_ENQUEUED: AtomicU32 = AtomicU32::new(0);
static QUEUE_DEQUEUED: AtomicU32 = AtomicU32::new(0);
static QUEUE_BACKPRESSURE_WAITS: AtomicU32 = AtomicU32::new(0);
static QUEUE_DEADLINE_MISSES: AtomicU32 = AtomicU32::new(0);
static QUEUE_HIGH_WATER: AtomicU32 = AtomicU32::new(0);
static SAMPLE_FAILURES: AtomicU32 = AtomicU32::new(0);
static PUBLISH_SUCCESSES: AtomicU32 = AtomicU32::new(0);
static PUBLISH_FAILURES: AtomicU32 = AtomicU32::new(0);
static PUBLISH_BYTES: AtomicU32 = AtomicU32::new(0);
static WIFI_LINK_CONNECTED: AtomicBool = AtomicBool::new(false);
static WIFI_IPV4: AtomicU32 = AtomicU32::new(0);

#[derive(Clone, Copy, Debug, Default)]
pub struct Snapshot {
    pub wifi_connect_begins: u32,
    pub wifi_connect_requests: u32,
    pub wifi_connect_request_errors: u32,
    pub wifi_connect_retries: u32,
    pub wifi_connect_successes: u32,
    pub wifi_connect_failures: u32,
    pub wifi_link_drops: u32,
    pub wifi_link_connected: bool,
    pub wifi_ipv4: Option<[u8; 4]>,
    pub bus_lagged_events: u32,
    pub queue_enqueued: u32,
    pub queue_dequeued: u32,
    pub queue_backpressure_waits: u32,
    pub queue_deadline_misses: u32,
    pub queue_high_water: u32,
    pub sample_failures: u32,
    pub publish_successes: u32,
    pub publish_failures: u32,
    pub publish_bytes: u32,
}

pub fn snapshot() -> Snapshot {
    let ipv4_raw = WIFI_IPV4.load(Ordering::Relaxed);
    let wifi_ipv4 = if ipv4_raw == 0 {
        None
    } else {
        Some(ipv4_raw.to_be_bytes())
    };
    Snapshot {
        wifi_connect_begins: WIFI_CONNECT_BEGINS.load(Ordering::Relaxed),
        wifi_connect_requests: WIFI_CONNECT_REQUESTS.load(Ordering::Relaxed),
        wifi_connect_request_errors: WIFI_CONNECT_REQUEST_ERRORS.load(Ordering::Relaxed),
        wifi_connect_retries: WIFI_CONNECT_RETRIES.load(Ordering::Relaxed),
        wifi_connect_successes: WIFI_CONNECT_SUCCESSES.load(Ordering::Relaxed),
        wifi_connect_failures: WIFI_CONNECT_FAILURES.load(Ordering::Relaxed),
        wifi_link_drops: WIFI_LINK_DROPS.load(Ordering::Relaxed),
        wifi_link_connected: WIFI_LINK_CONNECTED.load(Ordering::Relaxed),
        wifi_ipv4,
        bus_lagged_events: BUS_LAGGED_EVENTS.load(Ordering::Relaxed),
        queue_enqueued: QUEUE_ENQUEUED.load(Ordering::Relaxed),
        queue_dequeued: QUEUE_DEQUEUED.load(Ordering::Relaxed),
        queue_backpressure_waits: QUEUE_BACKPRESSURE_WAITS.load(Ordering::Relaxed),
        queue_deadline_misses: QUEUE_DEADLINE_MISSES.load(Ordering::Relaxed),
        queue_high_water: QUEUE_HIGH_WATER.load(Ordering::Relaxed),
        sample_failures: SAMPLE_FAILURES.load(Ordering::Relaxed),
        publish_successes: PUBLISH_SUCCESSES.load(Ordering::Relaxed),
        publish_failures: PUBLISH_FAILURES.load(Ordering::Relaxed),
        publish_bytes: PUBLISH_BYTES.load(Ordering::Relaxed),
    }
}

pub fn record_wifi_connect_begin() {
    WIFI_CONNECT_BEGINS.fetch_add(1, Ordering::Relaxed);
    WIFI_LINK_CONNECTED.store(false, Ordering::Relaxed);
}

pub fn record_wifi_connect_request(ok: bool) {
    WIFI_CONNECT_REQUESTS.fetch_add(1, Ordering::Relaxed);
    if !ok {
        WIFI_CONNECT_REQUEST_ERRORS.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_wifi_connect_retry() {
    WIFI_CONNECT_RETRIES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_wifi_connect_success(ipv4: [u8; 4]) {
    WIFI_CONNECT_SUCCESSES.fetch_add(1, Ordering::Relaxed);
    WIFI_LINK_CONNECTED.store(true, Ordering::Relaxed);
    WIFI_IPV4.store(u32::from_be_bytes(ipv4), Ordering::Relaxed);
}

pub fn record_wifi_connect_failure() {
    WIFI_CONNECT_FAILURES.fetch_add(1, Ordering::Relaxed);
    WIFI_LINK_CONNECTED.store(false, Ordering::Relaxed);
}

pub fn record_wifi_link_drop() {
    WIFI_LINK_DROPS.fetch_add(1, Ordering::Relaxed);
    WIFI_LINK_CONNECTED.store(false, Ordering::Relaxed);
    WIFI_IPV4.store(0, Ordering::Relaxed);
}

pub fn record_bus_lag(missed: u64) {
    let missed = missed.min(u32::MAX as u64) as u32;
    BUS_LAGGED_EVENTS.fetch_add(missed, Ordering::Relaxed);
}

pub fn record_queue_enqueued(depth: usize) {
    QUEUE_ENQUEUED.fetch_add(1, Ordering::Relaxed);
    QUEUE_HIGH_WATER.fetch_max(depth.min(u32::MAX as usize) as u32, Ordering::Relaxed);
}

pub fn record_queue_dequeued() {
    QUEUE_DEQUEUED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_queue_backpressure() {
    QUEUE_BACKPRESSURE_WAITS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_queue_deadline_miss() {
    QUEUE_DEADLINE_MISSES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_sample_failure() {
    SAMPLE_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_publish_success(bytes: usize) {
    PUBLISH_SUCCESSES.fetch_add(1, Ordering::Relaxed);
    PUBLISH_BYTES.fetch_add(bytes.min(u32::MAX as usize) as u32, Ordering::Relaxed);
}

pub fn record_publish_failure() {
    PUBLISH_FAILURES.fetch_add(1, Ordering::Relaxed);
}
