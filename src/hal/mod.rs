//! Board capabilities, twice over.
//!
//! [`mock`] backs every trait in [`crate::traits`] with scripted, clock-driven
//! doubles so the full refresh loop runs in `cargo test` and the desktop demo.
//! `esp32` is the real board: ST7789 panel with PWM backlight, four buttons,
//! station WiFi, SNTP, an HTTPS departure source and the task watchdog. It
//! only builds with the `esp32` feature (plus `display`, `wifi` and
//! `esp32-http` for the respective parts).

pub mod mock;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use mock::*;

#[cfg(feature = "esp32")]
pub use esp32::*;
