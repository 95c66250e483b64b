//! # rs-departures
//!
//! A departure board for a single public-transit connection: it fetches
//! upcoming departures from an HTTP endpoint, converts their UTC timestamps
//! to local time, and shows them on a 320x240 display. It is built to run
//! unattended for months on a microcontroller.
//!
//! ## Features
//!
//! - **Fault-tolerant refresh**: failures keep the last good data on screen,
//!   retry at a shorter interval, and escalate to a reboot after a run of
//!   consecutive errors
//! - **Watchdog discipline**: every blocking step is bounded and bracketed by
//!   watchdog feeds
//! - **EU daylight saving**: UTC to CET/CEST without a timezone database
//! - **Hardware abstraction**: runs on ESP32 or on desktop with mocks
//!
//! ## Architecture
//!
//! - `civil_time` - UTC to local civil time, EU DST rule
//! - `departure` - raw records, parsing, duration compaction
//! - `refresh` - the refresh state machine (connect, fetch, count, reboot)
//! - `presenter` - board state to draw commands
//! - `interaction` - wait window, buttons, the top-level loop
//! - `traits` - capabilities (display, network, source, input, watchdog)
//! - `hal` - implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_departures::{
//!     config::Config,
//!     departure::RawDeparture,
//!     hal::{MockDelay, MockDisplay, MockInput, MockNetwork, MockSource, MockTimeSync, MockWatchdog},
//!     interaction::{BoardHardware, InteractionLoop},
//! };
//!
//! let mut source = MockSource::new();
//! source.push_ok(vec![RawDeparture::new("2026-01-11T12:09:20.000Z").with_delay(2)]);
//!
//! let hw = BoardHardware {
//!     display: MockDisplay::new(),
//!     network: MockNetwork::online(),
//!     source,
//!     input: MockInput::new(),
//!     watchdog: MockWatchdog::new(),
//!     time: MockTimeSync::new(1_768_133_360),
//!     delay: MockDelay::new(),
//! };
//!
//! let mut board = InteractionLoop::new(hw, &Config::default());
//! board.boot();
//! board.run_iteration();
//!
//! assert!(board.hardware().display.has_text("13:09"));
//! assert!(board.hardware().display.has_text("+2"));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// UTC to local civil time conversion with the EU daylight-saving rule.
pub mod civil_time;
/// Shared configuration system for desktop and ESP32.
pub mod config;
/// Departure records and parsing.
pub mod departure;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Wait window, buttons and the top-level loop.
pub mod interaction;
/// Projection of board state onto draw commands.
pub mod presenter;
/// The fault-tolerant refresh state machine.
pub mod refresh;
/// Capability traits for display, network, data source and hardware.
pub mod traits;

// Re-exports for convenience
pub use civil_time::{to_local, utc_offset_seconds, CivilTime, UtcSeconds};
pub use config::{BoardConfig, Config, ConfigError, SourceConfig, TimeConfig, WifiConfig};
pub use departure::{parse, parse_batch, Departure, ParseError, RawDeparture};
pub use interaction::{BoardHardware, BrightnessCycler, InteractionLoop, LoopExit, WaitWindow};
pub use presenter::{DrawCommand, Frame};
pub use refresh::{
    BoardState, CycleFault, CycleOutcome, DisplayMode, RefreshPolicy, RefreshState,
    RefreshSupervisor,
};
pub use traits::{
    BoardDisplay, Delay, DepartureSource, FetchError, InputSource, Network, Rgb, TimeSync,
    Watchdog,
};

#[cfg(feature = "json")]
pub use departure::{decode_payload, raw_from_value};
