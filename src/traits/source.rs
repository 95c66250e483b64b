//! Departure data retrieval.

use alloc::vec::Vec;
use core::fmt;

use crate::departure::RawDeparture;

/// Why a fetch produced no data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, TLS, or read failure.
    Transport,
    /// The server answered with a non-success HTTP status.
    Status(u16),
    /// The body was not a valid departure payload.
    Decode,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport => write!(f, "transport failure"),
            FetchError::Status(code) => write!(f, "HTTP status {}", code),
            FetchError::Decode => write!(f, "invalid payload"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FetchError {}

/// Remote source of upcoming departures.
///
/// One call is one request. Implementations bound their own duration (the
/// caller feeds the watchdog immediately before and after) and never retry
/// internally; retry cadence belongs to the refresh loop.
///
/// A response without a `departures` list is `Ok(vec![])`, not an error.
pub trait DepartureSource {
    /// Fetches the current departure list.
    fn fetch(&mut self) -> Result<Vec<RawDeparture>, FetchError>;
}
