//! Buttons, watchdog and blocking delay.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`InputSource`] | Momentary buttons, sampled at a fixed rate |
//! | [`Watchdog`] | Liveness timer and hard restart |
//! | [`Delay`] | Blocking sleep |

/// Physical buttons.
///
/// The board has four momentary buttons: three of them request a refresh
/// (any one is enough) and one cycles the backlight. Both methods report the
/// level at the moment of the call; debouncing is done by the caller pausing
/// after it acts on a press.
pub trait InputSource {
    /// Returns true while any refresh button is held.
    fn is_refresh_requested(&mut self) -> bool;

    /// Returns true while the brightness button is held.
    fn is_brightness_toggle_requested(&mut self) -> bool;
}

/// Hardware watchdog.
///
/// `feed` must be called at least once per watchdog period or the hardware
/// restarts the device. That restart is an accepted outcome of a stuck
/// state, not an error.
pub trait Watchdog {
    /// Resets the watchdog countdown.
    fn feed(&mut self);

    /// Restarts the device unconditionally.
    ///
    /// Hardware implementations never return. Test doubles record the call
    /// and return so the caller can observe it.
    fn reboot(&mut self);
}

/// Blocking delay.
///
/// Callers keep each call shorter than the watchdog period.
pub trait Delay {
    /// Blocks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}
