mod diag;
mod driver;
mod events;

use embassy_net::{Runner, Stack, StackResources};
use esp_hal::rng::Rng;
use esp_println::println;
use esp_radio::wifi::{Config as WifiRuntimeConfig, InternalWifiError, WifiDevice, WifiError};
use static_cell::StaticCell;

pub(crate) use diag::run_link_monitor;
pub(crate) use driver::EspStation;
pub(crate) use events::{install_event_bridge, watch_addresses};

const WIFI_RX_QUEUE_SIZE: usize = 3;
const WIFI_TX_QUEUE_SIZE: usize = 2;
const WIFI_STATIC_RX_BUF_NUM: u8 = 4;
const WIFI_DYNAMIC_RX_BUF_NUM: u16 = 8;
const WIFI_DYNAMIC_TX_BUF_NUM: u16 = 8;

pub(crate) struct RadioRuntime {
    pub(crate) station: EspStation,
    pub(crate) net_runner: Runner<'static, WifiDevice<'static>>,
    pub(crate) stack: Stack<'static>,
}

pub(crate) fn setup(wifi: esp_hal::peripherals::WIFI<'static>) -> Result<RadioRuntime, &'static str> {
    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static STACK_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

    let radio_ctrl = esp_radio::init().map_err(|err| {
        println!("wifi: esp_radio::init err={:?}", err);
        "wifi: esp_radio::init failed"
    })?;
    let radio_ctrl = RADIO_CTRL.init(radio_ctrl);
    let (controller, ifaces) =
        esp_radio::wifi::new(radio_ctrl, wifi, runtime_config()).map_err(|err| match err {
            WifiError::InvalidArguments => "wifi: init failed invalid_args",
            WifiError::Unsupported => "wifi: init failed unsupported",
            WifiError::NotInitialized => "wifi: init failed not_initialized",
            WifiError::InternalError(InternalWifiError::NoMem) => "wifi: init failed no_mem",
            _ => "wifi: init failed other",
        })?;

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let (stack, net_runner) = embassy_net::new(
        ifaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        STACK_RESOURCES.init(StackResources::<3>::new()),
        seed,
    );

    Ok(RadioRuntime {
        station: EspStation::new(controller),
        net_runner,
        stack,
    })
}

fn runtime_config() -> WifiRuntimeConfig {
    WifiRuntimeConfig::default()
        .with_rx_queue_size(WIFI_RX_QUEUE_SIZE)
        .with_tx_queue_size(WIFI_TX_QUEUE_SIZE)
        .with_static_rx_buf_num(WIFI_STATIC_RX_BUF_NUM)
        .with_dynamic_rx_buf_num(WIFI_DYNAMIC_RX_BUF_NUM)
        .with_dynamic_tx_buf_num(WIFI_DYNAMIC_TX_BUF_NUM)
}
