//! WiFi station link for ESP32.
//!
//! Unlike a blocking connect, association here is started by
//! [`Network::connect`] and observed through [`Network::is_connected`], so
//! the refresh loop can poll it in short slices and keep feeding the
//! watchdog.
//!
//! # Example
//!
//! ```ignore
//! use rs_departures::hal::esp32::Esp32Wifi;
//! use rs_departures::config::WifiConfig;
//! use rs_departures::traits::Network;
//!
//! let config = WifiConfig::default()
//!     .with_ssid("MyNetwork")
//!     .with_password("secret123");
//!
//! let mut wifi = Esp32Wifi::new(modem, sysloop, Some(nvs), &config)?;
//! wifi.connect()?;
//! while !wifi.is_connected() {
//!     // feed watchdog, sleep a slice
//! }
//! ```

use crate::config::WifiConfig;
use crate::traits::Network;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi};
use esp_idf_sys::EspError;
use std::net::Ipv4Addr;

/// WiFi station for ESP32.
///
/// The driver is configured and started on construction; association is
/// left to [`Network::connect`].
pub struct Esp32Wifi<'a> {
    wifi: EspWifi<'a>,
}

impl<'a> Esp32Wifi<'a> {
    /// Initializes the driver in station mode with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot be created, configured or started.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> Result<Self, EspError> {
        let mut wifi = EspWifi::new(modem, sysloop, nvs)?;

        // esp-idf expects fixed-capacity strings
        let mut ssid_buf: heapless::String<32> = heapless::String::new();
        let _ = ssid_buf.push_str(config.ssid.as_str());

        let mut pass_buf: heapless::String<64> = heapless::String::new();
        let _ = pass_buf.push_str(config.password.as_str());

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: ssid_buf,
            password: pass_buf,
            ..Default::default()
        }))?;

        log::info!("[WiFi] Starting station for '{}'", config.ssid);
        wifi.start()?;

        Ok(Self { wifi })
    }

    /// Current IP address, if the interface is up.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }
}

impl Network for Esp32Wifi<'_> {
    type Error = EspError;

    fn is_connected(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    fn connect(&mut self) -> Result<(), EspError> {
        // a stale attempt blocks a new one
        let _ = self.wifi.disconnect();
        self.wifi.connect()
    }
}
