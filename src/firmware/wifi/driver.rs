use esp_println::println;
use esp_radio::wifi::{AuthMethod, ClientConfig, ModeConfig, ScanMethod, WifiController, WifiError};
use relay_core::{NetEvent, NetworkStack};

use super::super::config::{wifi_credentials, EVENT_BUS};

/// Station-mode radio behind the connection controller. Calls return as soon
/// as the driver accepted the request; outcomes arrive as driver events.
pub(crate) struct EspStation {
    controller: WifiController<'static>,
    configured: bool,
}

#[derive(Debug)]
pub(crate) enum StationError {
    MissingCredentials,
    Radio(WifiError),
}

impl EspStation {
    pub(super) fn new(controller: WifiController<'static>) -> Self {
        Self {
            controller,
            configured: false,
        }
    }

    fn apply_station_config(&mut self) -> Result<(), StationError> {
        if self.configured {
            return Ok(());
        }
        let (ssid, password) = wifi_credentials().ok_or(StationError::MissingCredentials)?;
        self.controller
            .set_config(&station_config(ssid, password))
            .map_err(StationError::Radio)?;
        println!("wifi: station config applied ssid={}", ssid);
        self.configured = true;
        Ok(())
    }
}

impl NetworkStack for EspStation {
    type Error = StationError;

    fn start_link(&mut self) -> Result<(), StationError> {
        self.apply_station_config()?;
        if matches!(self.controller.is_started(), Ok(true)) {
            EVENT_BUS.publish(NetEvent::LinkStarted);
            return Ok(());
        }
        self.controller.start().map_err(StationError::Radio)
    }

    fn request_connect(&mut self) -> Result<(), StationError> {
        self.controller.connect().map_err(StationError::Radio)
    }
}

fn station_config(ssid: &str, password: &str) -> ModeConfig {
    let auth_method = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::Wpa2Personal
    };
    ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(ssid.into())
            .with_password(password.into())
            .with_auth_method(auth_method)
            .with_scan_method(ScanMethod::AllChannels),
    )
}
