//! Board configuration, fixed at build time.
//!
//! Uses `heapless` strings and vectors so the same types work with and
//! without `std`. Every field has a default matching the deployed board;
//! builder methods override individual values.
//!
//! # Example
//!
//! ```rust
//! use rs_departures::config::{BoardConfig, Config, WifiConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.board.nominal_interval_secs, 30);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_wifi(WifiConfig::default().with_ssid("station-ap"))
//!     .with_board(BoardConfig::default().with_error_threshold(5));
//! assert!(config.validate().is_ok());
//! ```

use core::fmt;

use heapless::String as HString;
use heapless::Vec as HVec;

/// Maximum length for short config strings (SSIDs, hostnames, labels)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (URLs)
pub const MAX_LONG_STRING: usize = 128;

/// Maximum number of backlight steps
pub const MAX_BACKLIGHT_LEVELS: usize = 8;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

/// Backlight steps, in cycling order
pub type BacklightLevels = HVec<f32, MAX_BACKLIGHT_LEVELS>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    let mut end = 0;
    for (i, c) in s.char_indices() {
        if i + c.len_utf8() > N {
            break;
        }
        end = i + c.len_utf8();
    }
    let _ = hs.push_str(&s[..end]);
    hs
}

/// Create a ShortString from a &str, truncating at a character boundary
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a LongString from a &str, truncating at a character boundary
pub fn long_string(s: &str) -> LongString {
    truncated(s)
}

// ============================================================================
// Errors
// ============================================================================

/// A configuration value that would break the refresh loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A refresh interval is zero.
    ZeroInterval,
    /// The retry interval is longer than the nominal interval.
    RetryExceedsNominal,
    /// The error threshold is zero.
    ZeroThreshold,
    /// The input sampling rate is zero.
    ZeroSampleRate,
    /// The backlight level list is empty.
    NoBacklightLevels,
    /// The initial backlight index is past the end of the list.
    BacklightIndexOutOfRange,
    /// Some blocking slice is not shorter than the watchdog period.
    WatchdogTooShort,
    /// Zero rows to display.
    ZeroRows,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroInterval => write!(f, "refresh interval must be non-zero"),
            ConfigError::RetryExceedsNominal => {
                write!(f, "retry interval must not exceed nominal interval")
            }
            ConfigError::ZeroThreshold => write!(f, "error threshold must be non-zero"),
            ConfigError::ZeroSampleRate => write!(f, "input sample rate must be non-zero"),
            ConfigError::NoBacklightLevels => write!(f, "backlight level list is empty"),
            ConfigError::BacklightIndexOutOfRange => {
                write!(f, "initial backlight index out of range")
            }
            ConfigError::WatchdogTooShort => {
                write!(f, "watchdog period must exceed every blocking slice")
            }
            ConfigError::ZeroRows => write!(f, "at least one row must be shown"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// Refresh loop and display configuration
    pub board: BoardConfig,
    /// Departure endpoint configuration
    pub source: SourceConfig,
    /// Time server configuration
    pub time: TimeConfig,
}

impl Config {
    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set board configuration
    pub fn with_board(mut self, board: BoardConfig) -> Self {
        self.board = board;
        self
    }

    /// Set source configuration
    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    /// Set time configuration
    pub fn with_time(mut self, time: TimeConfig) -> Self {
        self.time = time;
        self
    }

    /// Check the whole configuration, including cross-section constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.board.validate()?;
        let watchdog = self.board.watchdog_timeout_ms;
        if self.wifi.connect_poll_ms == 0 || self.wifi.connect_poll_ms >= watchdog {
            return Err(ConfigError::WatchdogTooShort);
        }
        // fetch and clock sync block between two feeds
        if self.source.request_timeout_ms >= watchdog || self.time.sync_timeout_ms >= watchdog {
            return Err(ConfigError::WatchdogTooShort);
        }
        Ok(())
    }
}

// ============================================================================
// Board Config
// ============================================================================

/// Refresh loop, watchdog and display configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoardConfig {
    /// Wait between refreshes while healthy
    pub nominal_interval_secs: u32,
    /// Wait between refreshes while failures are outstanding
    pub retry_interval_secs: u32,
    /// Consecutive failures that trigger a reboot
    pub error_threshold: u32,
    /// Hardware watchdog period in milliseconds
    pub watchdog_timeout_ms: u32,
    /// Button samples per second during the wait window
    pub input_samples_per_second: u32,
    /// Pause after acting on a button press
    pub debounce_ms: u32,
    /// How long the fatal notice stays up before rebooting
    pub fatal_pause_ms: u32,
    /// Length of the white flash on a forced refresh
    pub flash_ms: u32,
    /// Backlight steps cycled by the brightness button
    pub backlight_levels: BacklightLevels,
    /// Index into `backlight_levels` at boot
    pub initial_backlight_index: usize,
    /// Route label shown in the header
    pub route_label: ShortString,
    /// Maximum departure rows on screen
    pub max_rows: usize,
}

/// Backlight steps of the deployed board.
pub const DEFAULT_BACKLIGHT_LEVELS: [f32; 7] = [0.1, 0.2, 0.35, 0.5, 0.65, 0.8, 1.0];

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            nominal_interval_secs: 30,
            retry_interval_secs: 5,
            error_threshold: 10,
            watchdog_timeout_ms: 8_000,
            input_samples_per_second: 10,
            debounce_ms: 150,
            fatal_pause_ms: 3_000,
            flash_ms: 30,
            backlight_levels: DEFAULT_BACKLIGHT_LEVELS.iter().copied().collect(),
            initial_backlight_index: 3,
            route_label: short_string("Auerberger Mitte -> Koenigstr."),
            max_rows: 4,
        }
    }
}

impl BoardConfig {
    /// Set the nominal refresh interval
    pub fn with_nominal_interval_secs(mut self, secs: u32) -> Self {
        self.nominal_interval_secs = secs;
        self
    }

    /// Set the retry interval
    pub fn with_retry_interval_secs(mut self, secs: u32) -> Self {
        self.retry_interval_secs = secs;
        self
    }

    /// Set the reboot threshold
    pub fn with_error_threshold(mut self, threshold: u32) -> Self {
        self.error_threshold = threshold;
        self
    }

    /// Set the watchdog period
    pub fn with_watchdog_timeout_ms(mut self, ms: u32) -> Self {
        self.watchdog_timeout_ms = ms;
        self
    }

    /// Set the input sampling rate
    pub fn with_input_samples_per_second(mut self, rate: u32) -> Self {
        self.input_samples_per_second = rate;
        self
    }

    /// Set the button debounce pause
    pub fn with_debounce_ms(mut self, ms: u32) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the fatal notice pause
    pub fn with_fatal_pause_ms(mut self, ms: u32) -> Self {
        self.fatal_pause_ms = ms;
        self
    }

    /// Set the backlight steps, keeping at most [`MAX_BACKLIGHT_LEVELS`]
    pub fn with_backlight_levels(mut self, levels: &[f32]) -> Self {
        self.backlight_levels = levels
            .iter()
            .take(MAX_BACKLIGHT_LEVELS)
            .map(|l| l.clamp(0.0, 1.0))
            .collect();
        self
    }

    /// Set the backlight step used at boot
    pub fn with_initial_backlight_index(mut self, index: usize) -> Self {
        self.initial_backlight_index = index;
        self
    }

    /// Set the header route label
    pub fn with_route_label(mut self, label: &str) -> Self {
        self.route_label = short_string(label);
        self
    }

    /// Set the row limit
    pub fn with_max_rows(mut self, rows: usize) -> Self {
        self.max_rows = rows;
        self
    }

    /// Milliseconds between two input samples
    pub fn sample_period_ms(&self) -> u32 {
        1_000 / self.input_samples_per_second.max(1)
    }

    /// Check that the values describe a loop that can run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nominal_interval_secs == 0 || self.retry_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.retry_interval_secs > self.nominal_interval_secs {
            return Err(ConfigError::RetryExceedsNominal);
        }
        if self.error_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.input_samples_per_second == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.backlight_levels.is_empty() {
            return Err(ConfigError::NoBacklightLevels);
        }
        if self.initial_backlight_index >= self.backlight_levels.len() {
            return Err(ConfigError::BacklightIndexOutOfRange);
        }
        if self.max_rows == 0 {
            return Err(ConfigError::ZeroRows);
        }
        let longest_slice = self
            .sample_period_ms()
            .max(self.debounce_ms)
            .max(self.flash_ms);
        if longest_slice >= self.watchdog_timeout_ms {
            return Err(ConfigError::WatchdogTooShort);
        }
        Ok(())
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// Upper bound on one connection attempt in milliseconds
    pub connect_timeout_ms: u32,
    /// Poll interval while waiting for association
    pub connect_poll_ms: u32,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            connect_timeout_ms: 5_000,
            connect_poll_ms: 250,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Set the association poll interval
    pub fn with_connect_poll_ms(mut self, ms: u32) -> Self {
        self.connect_poll_ms = ms;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// Source Config
// ============================================================================

/// Departure endpoint configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceConfig {
    /// URL returning the departure JSON
    pub endpoint: LongString,
    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: long_string("https://fahrplan-oynwk.bunny.run/"),
            request_timeout_ms: 6_000,
        }
    }
}

impl SourceConfig {
    /// Set the endpoint URL
    pub fn with_endpoint(mut self, url: &str) -> Self {
        self.endpoint = long_string(url);
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout_ms(mut self, ms: u32) -> Self {
        self.request_timeout_ms = ms;
        self
    }
}

// ============================================================================
// Time Config
// ============================================================================

/// Time server configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeConfig {
    /// SNTP server hostname
    pub ntp_host: ShortString,
    /// How long one sync attempt may wait for an answer
    pub sync_timeout_ms: u32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            ntp_host: short_string("de.pool.ntp.org"),
            sync_timeout_ms: 3_000,
        }
    }
}

impl TimeConfig {
    /// Set the SNTP server
    pub fn with_ntp_host(mut self, host: &str) -> Self {
        self.ntp_host = short_string(host);
        self
    }

    /// Set the sync timeout
    pub fn with_sync_timeout_ms(mut self, ms: u32) -> Self {
        self.sync_timeout_ms = ms;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.board.nominal_interval_secs, 30);
        assert_eq!(config.board.retry_interval_secs, 5);
        assert_eq!(config.board.error_threshold, 10);
        assert_eq!(config.board.watchdog_timeout_ms, 8_000);
        assert_eq!(config.board.max_rows, 4);
        assert_eq!(config.board.backlight_levels.len(), 7);
        assert_eq!(config.board.backlight_levels[config.board.initial_backlight_index], 0.5);
        assert_eq!(config.time.ntp_host.as_str(), "de.pool.ntp.org");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let input = "ü".repeat(40);
        let s = short_string(&input);
        assert_eq!(s.len(), 64);
        assert_eq!(s.chars().count(), 32);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_wifi(WifiConfig::default().with_ssid("ap").with_password("pw"))
            .with_board(
                BoardConfig::default()
                    .with_route_label("Hbf -> Airport")
                    .with_max_rows(5),
            )
            .with_source(SourceConfig::default().with_endpoint("http://10.0.0.2/"));

        assert!(config.wifi.is_configured());
        assert_eq!(config.board.route_label.as_str(), "Hbf -> Airport");
        assert_eq!(config.board.max_rows, 5);
        assert_eq!(config.source.endpoint.as_str(), "http://10.0.0.2/");
    }

    #[test]
    fn backlight_levels_are_clamped_and_capped() {
        let board = BoardConfig::default()
            .with_backlight_levels(&[1.5, -0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]);
        assert_eq!(board.backlight_levels.len(), MAX_BACKLIGHT_LEVELS);
        assert_eq!(board.backlight_levels[0], 1.0);
        assert_eq!(board.backlight_levels[1], 0.0);
    }

    #[test]
    fn rejects_broken_board_values() {
        let base = BoardConfig::default;
        assert_eq!(
            base().with_retry_interval_secs(0).validate(),
            Err(ConfigError::ZeroInterval)
        );
        assert_eq!(
            base().with_retry_interval_secs(60).validate(),
            Err(ConfigError::RetryExceedsNominal)
        );
        assert_eq!(
            base().with_error_threshold(0).validate(),
            Err(ConfigError::ZeroThreshold)
        );
        assert_eq!(
            base().with_input_samples_per_second(0).validate(),
            Err(ConfigError::ZeroSampleRate)
        );
        assert_eq!(
            base().with_backlight_levels(&[]).validate(),
            Err(ConfigError::NoBacklightLevels)
        );
        assert_eq!(
            base().with_initial_backlight_index(7).validate(),
            Err(ConfigError::BacklightIndexOutOfRange)
        );
        assert_eq!(
            base().with_watchdog_timeout_ms(100).validate(),
            Err(ConfigError::WatchdogTooShort)
        );
        assert_eq!(base().with_max_rows(0).validate(), Err(ConfigError::ZeroRows));
    }

    #[test]
    fn connect_poll_must_fit_watchdog() {
        let config = Config::default().with_wifi(WifiConfig::default().with_connect_poll_ms(9_000));
        assert_eq!(config.validate(), Err(ConfigError::WatchdogTooShort));
    }

    #[test]
    fn sample_period_from_rate() {
        assert_eq!(BoardConfig::default().sample_period_ms(), 100);
    }
}
