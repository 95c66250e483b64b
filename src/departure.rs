//! Departure records: the wire format and the normalized value the board shows.
//!
//! The upstream endpoint returns a JSON object with a `departures` array.
//! Each element is a [`RawDeparture`]; [`parse`] turns it into a [`Departure`].
//!
//! Only fixed-width slices of the origin timestamp are read:
//!
//! ```text
//! 2026-01-11T12:09:20.000Z
//! ^^^^ ^^ ^^ ^^ ^^
//! 0..4 5..7 8..10 11..13 14..16
//! ```
//!
//! Anything non-numeric in those slots is [`ParseError::MalformedTimestamp`].
//! [`parse_batch`] recovers from that per record by showing `??` instead of a
//! time, so one bad record never hides the others.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

use heapless::String as HString;

use crate::civil_time::{days_in_month, to_local, unix_from_civil, CivilTime, UtcSeconds};

/// Display value used in place of `HH:MM` when the timestamp is unusable.
pub const MALFORMED_TIME: &str = "??";

/// Unit suffix the source uses for trip durations.
pub const DURATION_SUFFIX: &str = " min";

/// Compact replacement for [`DURATION_SUFFIX`].
pub const DURATION_COMPACT_SUFFIX: &str = "m";

const YEAR: Range<usize> = 0..4;
const MONTH: Range<usize> = 5..7;
const DAY: Range<usize> = 8..10;
const HOUR: Range<usize> = 11..13;
const MINUTE: Range<usize> = 14..16;

/// A departure record exactly as delivered by the source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawDeparture {
    /// Origin timestamp, UTC, e.g. `2026-01-11T12:09:20.000Z`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub departure: String,
    /// Delay in minutes.
    #[cfg_attr(feature = "serde", serde(default))]
    pub delay: Option<i64>,
    /// Number of intermediate stops.
    #[cfg_attr(feature = "serde", serde(default))]
    pub transfers: Option<i64>,
    /// Trip duration, already formatted (e.g. `12 min`).
    #[cfg_attr(feature = "serde", serde(default))]
    pub duration: Option<String>,
    /// Arrival timestamp at the destination stop.
    #[cfg_attr(feature = "serde", serde(default))]
    pub arrival: Option<String>,
    /// Line identifier.
    #[cfg_attr(feature = "serde", serde(default))]
    pub line: Option<String>,
    /// Destination stop name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub destination: Option<String>,
}

impl RawDeparture {
    /// Creates a record with only the origin timestamp set.
    pub fn new(departure: &str) -> Self {
        Self {
            departure: String::from(departure),
            ..Self::default()
        }
    }

    /// Sets the delay.
    pub fn with_delay(mut self, delay: i64) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the stop count.
    pub fn with_transfers(mut self, transfers: i64) -> Self {
        self.transfers = Some(transfers);
        self
    }

    /// Sets the duration label.
    pub fn with_duration(mut self, duration: &str) -> Self {
        self.duration = Some(String::from(duration));
        self
    }
}

/// Top-level response body.
///
/// Records are kept untyped here and converted one by one with
/// [`raw_from_value`], so a record with a wrong field type cannot fail the
/// whole batch.
#[cfg(feature = "json")]
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct DeparturePayload {
    /// Departure list; a missing key is an empty list.
    #[serde(default)]
    pub departures: Vec<serde_json::Value>,
}

/// Reasons a single record cannot be used as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// A timestamp slot is missing, non-numeric, or not a calendar date.
    MalformedTimestamp,
    /// The source reported a negative delay.
    NegativeDelay,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedTimestamp => write!(f, "malformed departure timestamp"),
            ParseError::NegativeDelay => write!(f, "negative delay"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

/// A normalized departure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Departure {
    /// Origin instant, or `None` if the timestamp could not be read.
    pub departure_utc: Option<UtcSeconds>,
    /// Local `HH:MM`, or `??` when `departure_utc` is `None`.
    pub local_time: HString<5>,
    /// Delay in minutes.
    pub delay_minutes: u32,
    /// Number of intermediate stops, if reported.
    pub transfer_count: Option<u32>,
    /// Source-formatted trip duration.
    pub duration_label: Option<String>,
}

impl Departure {
    /// True when the departure is running late.
    #[inline]
    pub fn is_delayed(&self) -> bool {
        self.delay_minutes > 0
    }

    /// Duration label in compact display form (`12 min` -> `12m`).
    pub fn compact_duration(&self) -> Option<String> {
        self.duration_label.as_deref().map(compact_duration)
    }
}

/// Strips the space and shortens the unit of a ` min` duration label.
///
/// Labels without that suffix are returned unchanged.
pub fn compact_duration(label: &str) -> String {
    match label.strip_suffix(DURATION_SUFFIX) {
        Some(value) => {
            let mut out = String::with_capacity(value.len() + 1);
            out.push_str(value);
            out.push_str(DURATION_COMPACT_SUFFIX);
            out
        }
        None => String::from(label),
    }
}

fn numeric_slot(ts: &str, range: Range<usize>) -> Result<u32, ParseError> {
    let slot = ts.get(range).ok_or(ParseError::MalformedTimestamp)?;
    if !slot.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::MalformedTimestamp);
    }
    slot.parse().map_err(|_| ParseError::MalformedTimestamp)
}

/// Reads year, month, day, hour and minute from the fixed-width slots.
///
/// Seconds are ignored and returned as 0. Values that are numeric but not a
/// real date or time of day are rejected.
pub fn parse_timestamp_fields(ts: &str) -> Result<CivilTime, ParseError> {
    let year = numeric_slot(ts, YEAR)? as i32;
    let month = numeric_slot(ts, MONTH)? as u8;
    let day = numeric_slot(ts, DAY)? as u8;
    let hour = numeric_slot(ts, HOUR)? as u8;
    let minute = numeric_slot(ts, MINUTE)? as u8;

    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return Err(ParseError::MalformedTimestamp);
    }
    if hour > 23 || minute > 59 {
        return Err(ParseError::MalformedTimestamp);
    }

    Ok(CivilTime {
        year,
        month,
        day,
        hour,
        minute,
        second: 0,
    })
}

fn parse_utc(ts: &str) -> Result<UtcSeconds, ParseError> {
    let f = parse_timestamp_fields(ts)?;
    Ok(unix_from_civil(f.year, f.month, f.day, f.hour, f.minute, 0))
}

fn build(raw: &RawDeparture, departure_utc: Option<UtcSeconds>) -> Result<Departure, ParseError> {
    let delay = raw.delay.unwrap_or(0);
    if delay < 0 {
        return Err(ParseError::NegativeDelay);
    }
    let local_time = match departure_utc {
        Some(utc) => to_local(utc).hhmm(),
        None => {
            let mut s = HString::new();
            let _ = s.push_str(MALFORMED_TIME);
            s
        }
    };
    Ok(Departure {
        departure_utc,
        local_time,
        delay_minutes: u32::try_from(delay).unwrap_or(u32::MAX),
        transfer_count: raw.transfers.and_then(|t| u32::try_from(t).ok()),
        duration_label: raw.duration.clone(),
    })
}

/// Parses one record, failing on any defect.
pub fn parse(raw: &RawDeparture) -> Result<Departure, ParseError> {
    let utc = parse_utc(&raw.departure)?;
    build(raw, Some(utc))
}

/// Parses one record, substituting `??` for a malformed timestamp.
///
/// Only [`ParseError::NegativeDelay`] is returned.
pub fn parse_lenient(raw: &RawDeparture) -> Result<Departure, ParseError> {
    match parse_utc(&raw.departure) {
        Ok(utc) => build(raw, Some(utc)),
        Err(_) => {
            log::warn!("[API] Unreadable departure timestamp {:?}", raw.departure);
            build(raw, None)
        }
    }
}

/// Parses a batch in order, dropping records with a negative delay.
pub fn parse_batch(raws: &[RawDeparture]) -> Vec<Departure> {
    raws.iter()
        .filter_map(|raw| match parse_lenient(raw) {
            Ok(dep) => Some(dep),
            Err(e) => {
                log::warn!("[API] Dropping departure {:?}: {}", raw.departure, e);
                None
            }
        })
        .collect()
}

#[cfg(feature = "json")]
fn text_field(record: &serde_json::Value, key: &str) -> Option<String> {
    record.get(key)?.as_str().map(String::from)
}

#[cfg(feature = "json")]
fn integer_field(record: &serde_json::Value, key: &str) -> Option<i64> {
    let value = record.get(key)?;
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

/// Converts one JSON record field by field.
///
/// A field of the wrong type reads as absent; a missing or non-string
/// `departure` becomes empty and later renders as `??`. Returns `None` only
/// when the element is not an object at all.
#[cfg(feature = "json")]
pub fn raw_from_value(record: &serde_json::Value) -> Option<RawDeparture> {
    if !record.is_object() {
        return None;
    }
    Some(RawDeparture {
        departure: text_field(record, "departure").unwrap_or_default(),
        delay: integer_field(record, "delay"),
        transfers: integer_field(record, "transfers"),
        duration: text_field(record, "duration"),
        arrival: text_field(record, "arrival"),
        line: text_field(record, "line"),
        destination: text_field(record, "destination"),
    })
}

/// Decodes a response body into raw records.
///
/// Only a body that is not a JSON object with a `departures` array is a
/// [`FetchError::Decode`](crate::traits::FetchError::Decode). Individual
/// records degrade through [`raw_from_value`].
#[cfg(feature = "json")]
pub fn decode_payload(body: &[u8]) -> Result<Vec<RawDeparture>, crate::traits::FetchError> {
    let payload = serde_json::from_slice::<DeparturePayload>(body).map_err(|e| {
        log::warn!("[API] JSON decode failed: {}", e);
        crate::traits::FetchError::Decode
    })?;
    Ok(payload
        .departures
        .iter()
        .filter_map(|record| {
            let raw = raw_from_value(record);
            if raw.is_none() {
                log::warn!("[API] Skipping non-object departure record");
            }
            raw
        })
        .collect())
}
