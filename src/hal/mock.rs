//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for every capability trait, so the
//! whole refresh loop runs on desktop.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockDisplay`] | [`BoardDisplay`] | Records draw calls and backlight changes |
//! | [`MockNetwork`] | [`Network`] | Scripted association behaviour |
//! | [`MockTimeSync`] | [`TimeSync`] | Scripted sync results, clock-driven time |
//! | [`MockSource`] | [`DepartureSource`] | Queued fetch results |
//! | [`MockInput`] | [`InputSource`] | Queued button levels per sample |
//! | [`MockWatchdog`] | [`Watchdog`] | Counts feeds and reboots, measures feed gaps |
//! | [`MockDelay`] | [`Delay`] | Advances a shared [`MockClock`] instead of sleeping |
//!
//! # Shared time
//!
//! [`MockDelay`], [`MockWatchdog`], [`MockSource`] and [`MockTimeSync`] can
//! share one [`MockClock`]. Sleeping and slow fetches then advance simulated
//! time, and the watchdog can report the longest gap between two feeds.
//!
//! ```rust
//! use rs_departures::hal::{MockClock, MockDelay, MockWatchdog};
//! use rs_departures::traits::{Delay, Watchdog};
//!
//! let clock = MockClock::new();
//! let mut delay = MockDelay::with_clock(clock.clone());
//! let mut watchdog = MockWatchdog::with_clock(clock.clone());
//!
//! watchdog.feed();
//! delay.delay_ms(250);
//! watchdog.feed();
//!
//! assert_eq!(clock.now_ms(), 250);
//! assert_eq!(watchdog.longest_gap_ms, 250);
//! ```
//!
//! [`BoardDisplay`]: crate::traits::BoardDisplay
//! [`Network`]: crate::traits::Network
//! [`TimeSync`]: crate::traits::TimeSync
//! [`DepartureSource`]: crate::traits::DepartureSource
//! [`InputSource`]: crate::traits::InputSource
//! [`Watchdog`]: crate::traits::Watchdog
//! [`Delay`]: crate::traits::Delay

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::civil_time::UtcSeconds;
use crate::departure::RawDeparture;
use crate::presenter::DrawCommand;
use crate::traits::{
    BoardDisplay, Delay, DepartureSource, FetchError, InputSource, Network, Rgb, TimeSync,
    Watchdog,
};

// ============================================================================
// Simulated time
// ============================================================================

/// Shared simulated millisecond clock.
///
/// Clones observe and advance the same time.
#[derive(Clone, Debug, Default)]
pub struct MockClock {
    now: Rc<Cell<u64>>,
}

impl MockClock {
    /// Creates a clock at 0 ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    pub fn now_ms(&self) -> u64 {
        self.now.get()
    }

    /// Moves simulated time forward.
    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

/// Mock delay that advances a [`MockClock`].
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Clock advanced by each delay.
    pub clock: MockClock,
    /// Number of `delay_ms` calls.
    pub calls: u32,
    /// Longest single delay requested.
    pub longest_ms: u32,
}

impl MockDelay {
    /// Creates a delay with its own clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a delay advancing a shared clock.
    pub fn with_clock(clock: MockClock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    /// Total simulated time slept.
    pub fn total_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

impl Delay for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls += 1;
        self.longest_ms = self.longest_ms.max(ms);
        self.clock.advance(ms as u64);
    }
}

// ============================================================================
// Watchdog
// ============================================================================

/// Mock watchdog.
///
/// Counts feeds and reboots. With a clock attached it also tracks the
/// longest interval between two consecutive feeds (or between creation and
/// the first feed).
#[derive(Debug, Default)]
pub struct MockWatchdog {
    /// Number of `feed` calls.
    pub feeds: u32,
    /// Number of `reboot` calls.
    pub reboots: u32,
    /// Longest observed gap between feeds, in milliseconds.
    pub longest_gap_ms: u64,
    clock: Option<MockClock>,
    last_feed_ms: u64,
}

impl MockWatchdog {
    /// Creates a watchdog without time tracking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a watchdog that measures feed gaps on `clock`.
    pub fn with_clock(clock: MockClock) -> Self {
        let last_feed_ms = clock.now_ms();
        Self {
            clock: Some(clock),
            last_feed_ms,
            ..Self::default()
        }
    }

    /// Time since the last feed, if a clock is attached.
    pub fn since_last_feed_ms(&self) -> Option<u64> {
        self.clock
            .as_ref()
            .map(|c| c.now_ms().saturating_sub(self.last_feed_ms))
    }
}

impl Watchdog for MockWatchdog {
    fn feed(&mut self) {
        self.feeds += 1;
        if let Some(gap) = self.since_last_feed_ms() {
            self.longest_gap_ms = self.longest_gap_ms.max(gap);
        }
        if let Some(clock) = &self.clock {
            self.last_feed_ms = clock.now_ms();
        }
    }

    fn reboot(&mut self) {
        self.reboots += 1;
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock network link.
///
/// # Example
///
/// ```rust
/// use rs_departures::hal::MockNetwork;
/// use rs_departures::traits::Network;
///
/// let mut net = MockNetwork::connects_after(2);
/// assert!(!net.is_connected());
/// net.connect().unwrap();
/// assert!(!net.is_connected());
/// assert!(!net.is_connected());
/// assert!(net.is_connected());
/// ```
#[derive(Debug, Default)]
pub struct MockNetwork {
    /// Current link state.
    pub connected: bool,
    /// Number of `connect` calls.
    pub connect_calls: u32,
    /// Polls after `connect` before the link comes up; `None` never connects.
    pub polls_until_up: Option<u32>,
    /// Make `connect` itself fail.
    pub fail_connect: bool,
    pending: Option<u32>,
}

impl MockNetwork {
    /// Creates a link that never comes up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a link that is already up.
    pub fn online() -> Self {
        Self {
            connected: true,
            polls_until_up: Some(0),
            ..Self::default()
        }
    }

    /// Creates a link that comes up after `polls` polls following `connect`.
    pub fn connects_after(polls: u32) -> Self {
        Self {
            polls_until_up: Some(polls),
            ..Self::default()
        }
    }

    /// Drops the link. It comes back only through `connect`.
    pub fn drop_link(&mut self) {
        self.connected = false;
        self.pending = None;
    }
}

impl Network for MockNetwork {
    type Error = ();

    fn is_connected(&mut self) -> bool {
        if !self.connected {
            match self.pending {
                Some(0) => {
                    self.connected = true;
                    self.pending = None;
                }
                Some(n) => self.pending = Some(n - 1),
                None => {}
            }
        }
        self.connected
    }

    fn connect(&mut self) -> Result<(), ()> {
        self.connect_calls += 1;
        if self.fail_connect {
            return Err(());
        }
        self.pending = self.polls_until_up;
        Ok(())
    }
}

/// Mock time source.
///
/// Before a successful sync `utc_now` is `None`. Afterwards it returns
/// `utc_base` plus the elapsed time of the attached clock.
#[derive(Debug, Default)]
pub struct MockTimeSync {
    /// UTC time at clock zero.
    pub utc_base: UtcSeconds,
    /// Whether the clock has been set.
    pub synced: bool,
    /// Results for upcoming `sync` calls; empty means succeed.
    pub results: VecDeque<bool>,
    /// Number of `sync` calls.
    pub sync_calls: u32,
    clock: Option<MockClock>,
}

impl MockTimeSync {
    /// Creates an unsynced source that syncs to `utc_base` on first try.
    pub fn new(utc_base: UtcSeconds) -> Self {
        Self {
            utc_base,
            ..Self::default()
        }
    }

    /// Lets time advance with a shared clock.
    pub fn with_clock(mut self, clock: MockClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Queues the result of the next `sync` call.
    pub fn push_result(&mut self, ok: bool) {
        self.results.push_back(ok);
    }
}

impl TimeSync for MockTimeSync {
    fn sync(&mut self) -> bool {
        self.sync_calls += 1;
        let ok = self.results.pop_front().unwrap_or(true);
        self.synced |= ok;
        ok
    }

    fn utc_now(&self) -> Option<UtcSeconds> {
        if !self.synced {
            return None;
        }
        let elapsed = self.clock.as_ref().map_or(0, |c| c.now_ms() / 1_000);
        Some(self.utc_base + elapsed as i64)
    }
}

// ============================================================================
// Data Source
// ============================================================================

/// Mock departure source with queued results.
///
/// When the queue is empty, fetches fail with [`FetchError::Transport`].
#[derive(Debug, Default)]
pub struct MockSource {
    /// Results returned by upcoming fetches, in order.
    pub responses: VecDeque<Result<Vec<RawDeparture>, FetchError>>,
    /// Number of `fetch` calls.
    pub fetch_count: u32,
    /// Simulated request duration.
    pub latency_ms: u64,
    clock: Option<MockClock>,
}

impl MockSource {
    /// Creates a source with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes each fetch advance `clock` by `ms`.
    pub fn with_latency(mut self, clock: MockClock, ms: u64) -> Self {
        self.clock = Some(clock);
        self.latency_ms = ms;
        self
    }

    /// Queues a successful response.
    pub fn push_ok(&mut self, departures: Vec<RawDeparture>) {
        self.responses.push_back(Ok(departures));
    }

    /// Queues a failed response.
    pub fn push_err(&mut self, err: FetchError) {
        self.responses.push_back(Err(err));
    }
}

impl DepartureSource for MockSource {
    fn fetch(&mut self) -> Result<Vec<RawDeparture>, FetchError> {
        self.fetch_count += 1;
        if let Some(clock) = &self.clock {
            clock.advance(self.latency_ms);
        }
        self.responses
            .pop_front()
            .unwrap_or(Err(FetchError::Transport))
    }
}

// ============================================================================
// Input
// ============================================================================

/// Mock buttons.
///
/// Each poll pops the next queued level for that button; an empty queue
/// reads as released.
///
/// # Example
///
/// ```rust
/// use rs_departures::hal::MockInput;
/// use rs_departures::traits::InputSource;
///
/// let mut input = MockInput::new();
/// input.press_refresh_after(1);
///
/// assert!(!input.is_refresh_requested());
/// assert!(input.is_refresh_requested());
/// assert!(!input.is_refresh_requested()); // released
/// ```
#[derive(Debug, Default)]
pub struct MockInput {
    /// Upcoming refresh button levels.
    pub refresh: VecDeque<bool>,
    /// Upcoming brightness button levels.
    pub brightness: VecDeque<bool>,
    /// Number of refresh polls.
    pub polls: u32,
}

impl MockInput {
    /// Creates input with all buttons released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh button reads pressed on the poll after `idle` released polls.
    pub fn press_refresh_after(&mut self, idle: usize) {
        self.refresh.extend(core::iter::repeat(false).take(idle));
        self.refresh.push_back(true);
    }

    /// Brightness button reads pressed on the poll after `idle` released polls.
    pub fn press_brightness_after(&mut self, idle: usize) {
        self.brightness.extend(core::iter::repeat(false).take(idle));
        self.brightness.push_back(true);
    }
}

impl InputSource for MockInput {
    fn is_refresh_requested(&mut self) -> bool {
        self.polls += 1;
        self.refresh.pop_front().unwrap_or(false)
    }

    fn is_brightness_toggle_requested(&mut self) -> bool {
        self.brightness.pop_front().unwrap_or(false)
    }
}

// ============================================================================
// Display
// ============================================================================

/// Mock display.
///
/// Records every draw call as a [`DrawCommand`] and every backlight level.
#[derive(Debug, Default)]
pub struct MockDisplay {
    /// Draw calls since creation or the last [`take_commands`](Self::take_commands).
    pub commands: Vec<DrawCommand>,
    /// Backlight levels in the order they were set.
    pub backlight_history: Vec<f32>,
    /// Number of `present` calls.
    pub presents: u32,
}

impl MockDisplay {
    /// Creates an empty display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current backlight level, if ever set.
    pub fn backlight(&self) -> Option<f32> {
        self.backlight_history.last().copied()
    }

    /// Drains the recorded draw calls.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        core::mem::take(&mut self.commands)
    }

    /// All text drawn so far, in order.
    pub fn texts(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// True if any drawn text equals `needle`.
    pub fn has_text(&self, needle: &str) -> bool {
        self.commands
            .iter()
            .any(|cmd| matches!(cmd, DrawCommand::Text { text, .. } if text == needle))
    }
}

impl BoardDisplay for MockDisplay {
    type Error = ();

    fn clear(&mut self, color: Rgb) -> Result<(), ()> {
        self.commands.push(DrawCommand::Clear(color));
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        max_width: u32,
        scale: u8,
        color: Rgb,
    ) -> Result<(), ()> {
        self.commands.push(DrawCommand::Text {
            text: String::from(text),
            x,
            y,
            max_width,
            scale,
            color,
        });
        Ok(())
    }

    fn draw_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: Rgb) -> Result<(), ()> {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            color,
        });
        Ok(())
    }

    fn set_backlight(&mut self, level: f32) -> Result<(), ()> {
        self.backlight_history.push(level);
        Ok(())
    }

    fn present(&mut self) -> Result<(), ()> {
        self.presents += 1;
        self.commands.push(DrawCommand::Present);
        Ok(())
    }
}
