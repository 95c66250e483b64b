//! Network association and wall-clock synchronization.
//!
//! Both traits are synchronous and must not block for long: the caller
//! polls [`Network::is_connected`] in short slices so it can keep feeding the
//! watchdog, and [`TimeSync::sync`] is expected to carry its own bound.

use crate::civil_time::UtcSeconds;

/// Station-mode network link (WiFi on the board).
///
/// # Implementation Notes
///
/// - `connect` starts association and returns without waiting for it
/// - calling `connect` while a previous attempt is still running is allowed
///   and should restart the attempt
/// - the link may drop at any time; `is_connected` must reflect that
pub trait Network {
    /// Error type for starting association.
    type Error: core::fmt::Debug;

    /// Returns true if the link is up and has an address.
    fn is_connected(&mut self) -> bool;

    /// Begins association with the configured access point.
    fn connect(&mut self) -> Result<(), Self::Error>;
}

/// Wall-clock source (SNTP on the board).
pub trait TimeSync {
    /// Synchronizes the clock with a time server. Returns true on success.
    fn sync(&mut self) -> bool;

    /// Current UTC time, or `None` before the first successful sync.
    fn utc_now(&self) -> Option<UtcSeconds>;
}
