//! Capability traits the board logic is written against.
//!
//! Everything that touches hardware or the network sits behind one of these
//! traits so the refresh loop can run on the ESP32 and in desktop tests with
//! the same code.
//!
//! # Submodules
//!
//! - `display`: bitmap display and backlight
//! - `network`: WiFi association and wall-clock sync
//! - `source`: departure data retrieval
//! - `hardware`: buttons, watchdog, blocking delay
//!
//! # Capabilities
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`BoardDisplay`] | Draw primitives on a 320x240 RGB canvas |
//! | [`Network`] | Check and start network association |
//! | [`TimeSync`] | Set and read the UTC wall clock |
//! | [`DepartureSource`] | Fetch raw departure records |
//! | [`InputSource`] | Poll the refresh and brightness buttons |
//! | [`Watchdog`] | Feed the hardware watchdog, force a restart |
//! | [`Delay`] | Blocking sleep in short slices |

pub mod display;
pub mod hardware;
pub mod network;
pub mod source;

pub use display::*;
pub use hardware::*;
pub use network::*;
pub use source::*;
