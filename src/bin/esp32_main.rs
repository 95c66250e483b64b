//! ESP32-S3 departure board firmware.
//!
//! Brings up the watchdog, the ST7789 panel, WiFi, SNTP and the HTTPS
//! departure source, then hands everything to the interaction loop. The
//! loop only returns if a reboot request did not reset the chip.
//!
//! # Hardware Setup
//!
//! See [`rs_departures::hal::esp32::pins`] for the wiring.
//!
//! # Build
//!
//! ```bash
//! WIFI_SSID=MyNetwork WIFI_PASSWORD=secret \
//!     cargo build --release --bin esp32_main --features esp32-board
//! espflash flash --monitor target/xtensa-esp32s3-espidf/release/esp32_main
//! ```

use esp_idf_hal::delay::Delay;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriverConfig};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::{ColorInversion, Orientation, Rotation};
use rs_departures::hal::esp32::{
    Esp32Buttons, Esp32Delay, Esp32Display, Esp32HttpSource, Esp32Sntp, Esp32Watchdog, Esp32Wifi,
};
use rs_departures::traits::Watchdog;
use rs_departures::{BoardHardware, Config, InteractionLoop, WifiConfig};

/// SPI clock for the panel.
const TFT_SPI_MHZ: u32 = 40;

/// Backlight PWM frequency.
const BACKLIGHT_PWM_KHZ: u32 = 5;

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("[BOOT] rs-departures {}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Configuration
    // =========================================================================
    let config = Config::default().with_wifi(
        WifiConfig::default()
            .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
            .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
    );
    config.validate()?;
    if !config.wifi.is_configured() {
        log::warn!("[BOOT] WiFi not configured (set WIFI_SSID/WIFI_PASSWORD at build time)");
    }

    // The watchdog covers everything from here on, including panel init.
    let mut watchdog = Esp32Watchdog::new(config.board.watchdog_timeout_ms)?;
    watchdog.feed();

    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Display (ST7789 on SPI2, backlight on LEDC channel 0)
    // =========================================================================
    let spi = SpiDeviceDriver::new_single(
        peripherals.spi2,
        peripherals.pins.gpio12,
        peripherals.pins.gpio11,
        Option::<AnyIOPin>::None,
        Some(peripherals.pins.gpio10),
        &SpiDriverConfig::new(),
        &SpiConfig::new().baudrate(TFT_SPI_MHZ.MHz().into()),
    )?;
    let dc = PinDriver::output(peripherals.pins.gpio9)?;
    let rst = PinDriver::output(peripherals.pins.gpio8)?;

    let mut buffer = [0u8; 512];
    let interface = SpiInterface::new(spi, dc, &mut buffer);
    let panel = mipidsi::Builder::new(ST7789, interface)
        .display_size(240, 320)
        .orientation(Orientation::new().rotate(Rotation::Deg90))
        .invert_colors(ColorInversion::Inverted)
        .reset_pin(rst)
        .init(&mut Delay::new_default())
        .map_err(|e| anyhow::anyhow!("Display init failed: {:?}", e))?;

    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default().frequency(BACKLIGHT_PWM_KHZ.kHz().into()),
    )?;
    let backlight = LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio13)?;
    let display = Esp32Display::new(panel, backlight);
    watchdog.feed();
    log::info!("[BOOT] Display ready");

    // =========================================================================
    // Network, time and data source
    // =========================================================================
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let network = Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &config.wifi)?;
    let time = Esp32Sntp::new(&config.time);
    let source = Esp32HttpSource::new(&config.source);
    watchdog.feed();

    // =========================================================================
    // Buttons
    // =========================================================================
    let input = Esp32Buttons::new(
        peripherals.pins.gpio4.into(),
        peripherals.pins.gpio5.into(),
        peripherals.pins.gpio6.into(),
        peripherals.pins.gpio7.into(),
    )?;

    let hw = BoardHardware {
        display,
        network,
        source,
        input,
        watchdog,
        time,
        delay: Esp32Delay::new(),
    };

    let mut board = InteractionLoop::new(hw, &config);
    let exit = board.run();

    anyhow::bail!("board loop exited: {:?}", exit)
}
