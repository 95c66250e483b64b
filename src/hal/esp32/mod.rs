//! ESP32-S3 hardware abstraction layer for the departure board.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-S3 (Xtensa 240MHz, 8MB Flash)
//! - **Display**: ST7789 320x240 TFT on SPI2, backlight on an LEDC channel
//! - **Buttons**: four momentary buttons to GND (A, X, Y refresh; B brightness)
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments.

mod buttons;
mod delay;
mod watchdog;

pub use buttons::Esp32Buttons;
pub use delay::Esp32Delay;
pub use watchdog::Esp32Watchdog;

#[cfg(feature = "display")]
mod display;
#[cfg(feature = "display")]
pub use display::{Esp32Display, Esp32DisplayError};

#[cfg(feature = "wifi")]
mod sntp;
#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use sntp::Esp32Sntp;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Wifi;

#[cfg(feature = "esp32-http")]
mod http;
#[cfg(feature = "esp32-http")]
pub use http::Esp32HttpSource;

/// Pin assignments for the ESP32-S3 board.
pub mod pins {
    // =========================================================================
    // TFT Display (ST7789, SPI2)
    // =========================================================================

    /// SPI clock
    pub const TFT_SCLK: i32 = 12;

    /// SPI data out
    pub const TFT_MOSI: i32 = 11;

    /// Chip select
    pub const TFT_CS: i32 = 10;

    /// Data/command select
    pub const TFT_DC: i32 = 9;

    /// Panel reset (active low)
    pub const TFT_RST: i32 = 8;

    /// Backlight PWM (LEDC channel 0)
    pub const TFT_BL: i32 = 13;

    // =========================================================================
    // Buttons (active low, internal pull-up)
    // =========================================================================

    /// Button A: refresh
    pub const BUTTON_A: i32 = 4;

    /// Button B: cycle brightness
    pub const BUTTON_B: i32 = 5;

    /// Button X: refresh
    pub const BUTTON_X: i32 = 6;

    /// Button Y: refresh
    pub const BUTTON_Y: i32 = 7;
}
