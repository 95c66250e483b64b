//! Fault-tolerant refresh supervision.
//!
//! [`RefreshSupervisor`] runs one refresh cycle at a time:
//!
//! ```text
//! Booting -> Connecting -> Fetching -> Displaying(Success)
//!                 |             |
//!                 +-------------+----> Displaying(Degraded)
//!                                             |
//!                          errors >= threshold +--> Rebooting (terminal)
//! ```
//!
//! Every failure (no link, transport error, bad status, bad payload) bumps a
//! consecutive error counter and keeps the last good departures on screen.
//! A success resets the counter. Once the counter reaches the threshold the
//! cycle reports [`CycleOutcome::RebootRequired`]; the caller shows a notice
//! and restarts the device.
//!
//! The next wait window is [`RefreshPolicy::deadline_for`] the current error
//! count: the short retry interval while errors are outstanding, the nominal
//! interval otherwise.
//!
//! All blocking calls are bracketed by watchdog feeds, and association is
//! polled in slices well below the watchdog period.

use alloc::vec::Vec;
use core::fmt;

use crate::config::Config;
use crate::departure::{parse_batch, Departure};
use crate::traits::{Delay, DepartureSource, FetchError, Network, TimeSync, Watchdog};

/// Where the supervisor is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardState {
    /// Created, no cycle run yet.
    Booting,
    /// Checking or establishing the network link.
    Connecting,
    /// Request in flight.
    Fetching,
    /// Cycle finished; showing data.
    Displaying(DisplayMode),
    /// Error threshold reached. Terminal.
    Rebooting,
}

/// Quality of what is on screen after a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    /// The last fetch succeeded.
    Success,
    /// The last cycle failed; cached data or an error message is shown.
    Degraded,
}

/// A failure absorbed by one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleFault {
    /// The network link could not be established in time.
    Connectivity,
    /// The request failed.
    Fetch(FetchError),
}

impl fmt::Display for CycleFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleFault::Connectivity => write!(f, "network unavailable"),
            CycleFault::Fetch(e) => write!(f, "fetch failed: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CycleFault {}

/// Result of one refresh cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New data was fetched.
    Fresh {
        /// Whether the first departure differs from the previous one.
        changed: bool,
    },
    /// The cycle failed below the threshold.
    Degraded(CycleFault),
    /// Too many consecutive failures; the device must restart.
    RebootRequired,
}

/// Retry and timing parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Wait between cycles while healthy.
    pub nominal_interval_secs: u32,
    /// Wait between cycles while failures are outstanding.
    pub retry_interval_secs: u32,
    /// Consecutive failures that require a reboot.
    pub error_threshold: u32,
    /// Upper bound on waiting for association.
    pub connect_timeout_ms: u32,
    /// Poll slice while waiting for association.
    pub connect_poll_ms: u32,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RefreshPolicy {
    /// Takes the policy values out of a full configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            nominal_interval_secs: config.board.nominal_interval_secs,
            retry_interval_secs: config.board.retry_interval_secs,
            error_threshold: config.board.error_threshold,
            connect_timeout_ms: config.wifi.connect_timeout_ms,
            connect_poll_ms: config.wifi.connect_poll_ms,
        }
    }

    /// Wait window length for a given consecutive error count.
    ///
    /// Exactly two levels: retry interval if any error is outstanding,
    /// nominal interval otherwise.
    #[inline]
    pub fn deadline_for(&self, error_count: u32) -> u32 {
        if error_count > 0 {
            self.retry_interval_secs
        } else {
            self.nominal_interval_secs
        }
    }
}

/// Mutable state owned by the supervisor.
#[derive(Clone, Debug, PartialEq)]
pub struct RefreshState {
    /// Result of the most recent successful non-empty fetch.
    pub last_good_departures: Vec<Departure>,
    /// Failures since the last success.
    pub consecutive_error_count: u32,
    /// Length of the upcoming wait window.
    pub cycle_deadline_seconds: u32,
    /// Set by the refresh button, cleared when the next cycle starts.
    pub force_refresh_requested: bool,
    /// The failure of the most recent cycle, `None` after a success.
    pub last_fault: Option<CycleFault>,
    /// Whether the wall clock has been set.
    pub time_synced: bool,
}

impl RefreshState {
    fn new(policy: &RefreshPolicy) -> Self {
        Self {
            last_good_departures: Vec::new(),
            consecutive_error_count: 0,
            cycle_deadline_seconds: policy.nominal_interval_secs,
            force_refresh_requested: false,
            last_fault: None,
            time_synced: false,
        }
    }

    /// True if there is cached data to fall back on.
    pub fn has_data(&self) -> bool {
        !self.last_good_departures.is_empty()
    }
}

/// Receives state transitions while a cycle runs.
///
/// Used to draw progress feedback (the fetch indicator) in the middle of a
/// cycle. Closures taking `(BoardState, &RefreshState)` implement it.
pub trait CycleObserver {
    /// Called on entering `state`.
    fn on_transition(&mut self, state: BoardState, refresh: &RefreshState);
}

impl<F> CycleObserver for F
where
    F: FnMut(BoardState, &RefreshState),
{
    fn on_transition(&mut self, state: BoardState, refresh: &RefreshState) {
        self(state, refresh)
    }
}

/// The refresh state machine.
///
/// # Example
///
/// ```rust
/// use rs_departures::hal::{MockDelay, MockNetwork, MockSource, MockTimeSync, MockWatchdog};
/// use rs_departures::refresh::{BoardState, CycleOutcome, RefreshPolicy, RefreshState, RefreshSupervisor};
/// use rs_departures::departure::RawDeparture;
///
/// let mut supervisor = RefreshSupervisor::new(RefreshPolicy::default());
/// let mut network = MockNetwork::online();
/// let mut source = MockSource::new();
/// source.push_ok(vec![RawDeparture::new("2026-01-11T12:09:20.000Z")]);
///
/// let outcome = supervisor.run_cycle(
///     &mut network,
///     &mut source,
///     &mut MockTimeSync::new(0),
///     &mut MockWatchdog::new(),
///     &mut MockDelay::new(),
///     &mut |_: BoardState, _: &RefreshState| {},
/// );
///
/// assert_eq!(outcome, CycleOutcome::Fresh { changed: true });
/// assert_eq!(supervisor.state().last_good_departures[0].local_time.as_str(), "13:09");
/// ```
#[derive(Clone, Debug)]
pub struct RefreshSupervisor {
    policy: RefreshPolicy,
    state: RefreshState,
    board_state: BoardState,
}

impl RefreshSupervisor {
    /// Creates a supervisor with empty state.
    pub fn new(policy: RefreshPolicy) -> Self {
        Self {
            state: RefreshState::new(&policy),
            policy,
            board_state: BoardState::Booting,
        }
    }

    /// Current refresh state.
    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    /// Current position in the cycle.
    pub fn board_state(&self) -> BoardState {
        self.board_state
    }

    /// Retry and timing parameters.
    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Marks the next cycle as user-requested.
    pub fn request_force_refresh(&mut self) {
        self.state.force_refresh_requested = true;
    }

    fn enter<O: CycleObserver>(&mut self, next: BoardState, observer: &mut O) {
        self.board_state = next;
        observer.on_transition(next, &self.state);
    }

    /// Runs one connect/fetch cycle.
    ///
    /// Never fails: every problem is folded into the returned outcome and
    /// into [`state`](Self::state).
    pub fn run_cycle<N, S, T, W, D, O>(
        &mut self,
        network: &mut N,
        source: &mut S,
        time: &mut T,
        watchdog: &mut W,
        delay: &mut D,
        observer: &mut O,
    ) -> CycleOutcome
    where
        N: Network,
        S: DepartureSource,
        T: TimeSync,
        W: Watchdog,
        D: Delay,
        O: CycleObserver,
    {
        if self.board_state == BoardState::Rebooting {
            return CycleOutcome::RebootRequired;
        }

        self.state.force_refresh_requested = false;
        watchdog.feed();

        self.enter(BoardState::Connecting, observer);
        if !self.ensure_connected(network, watchdog, delay) {
            return self.record_failure(CycleFault::Connectivity, observer);
        }

        if !self.state.time_synced {
            watchdog.feed();
            self.state.time_synced = time.sync();
            watchdog.feed();
            if self.state.time_synced {
                log::info!("[NTP] Clock synchronized");
            } else {
                log::warn!("[NTP] Sync failed, retrying next cycle");
            }
        }

        self.enter(BoardState::Fetching, observer);
        log::debug!("[API] Fetch start");
        watchdog.feed();
        let result = source.fetch();
        watchdog.feed();

        match result {
            Ok(raws) => {
                log::info!("[API] Fetch ok, {} departures", raws.len());
                let departures = parse_batch(&raws);
                self.record_success(departures, observer)
            }
            Err(e) => {
                log::warn!("[API] Fetch failed: {}", e);
                self.record_failure(CycleFault::Fetch(e), observer)
            }
        }
    }

    /// Waits for the link in bounded slices, feeding the watchdog each slice.
    fn ensure_connected<N, W, D>(&mut self, network: &mut N, watchdog: &mut W, delay: &mut D) -> bool
    where
        N: Network,
        W: Watchdog,
        D: Delay,
    {
        if network.is_connected() {
            return true;
        }

        log::info!("[WiFi] Connecting...");
        if let Err(e) = network.connect() {
            log::warn!("[WiFi] Connect failed to start: {:?}", e);
            return false;
        }

        let slice = self.policy.connect_poll_ms.max(1);
        let mut waited = 0u32;
        while waited < self.policy.connect_timeout_ms {
            let step = slice.min(self.policy.connect_timeout_ms - waited);
            watchdog.feed();
            delay.delay_ms(step);
            waited += step;
            if network.is_connected() {
                watchdog.feed();
                log::info!("[WiFi] Connected after {} ms", waited);
                return true;
            }
        }

        watchdog.feed();
        log::warn!("[WiFi] Not connected after {} ms", waited);
        false
    }

    fn record_success<O: CycleObserver>(
        &mut self,
        departures: Vec<Departure>,
        observer: &mut O,
    ) -> CycleOutcome {
        let previous_first = self.state.last_good_departures.first().cloned();
        if departures.is_empty() && self.state.has_data() {
            log::warn!("[API] Empty result, keeping cached departures");
        } else {
            self.state.last_good_departures = departures;
        }

        let changed = self.state.last_good_departures.first() != previous_first.as_ref();
        if changed {
            log::info!("[API] Departures changed");
        }

        self.state.consecutive_error_count = 0;
        self.state.last_fault = None;
        self.state.cycle_deadline_seconds = self.policy.deadline_for(0);
        self.enter(BoardState::Displaying(DisplayMode::Success), observer);
        CycleOutcome::Fresh { changed }
    }

    fn record_failure<O: CycleObserver>(&mut self, fault: CycleFault, observer: &mut O) -> CycleOutcome {
        self.state.consecutive_error_count = self.state.consecutive_error_count.saturating_add(1);
        self.state.last_fault = Some(fault);
        let count = self.state.consecutive_error_count;
        self.state.cycle_deadline_seconds = self.policy.deadline_for(count);

        if count >= self.policy.error_threshold {
            log::error!(
                "[WDT] {} consecutive errors (threshold {}), reboot required",
                count,
                self.policy.error_threshold
            );
            self.enter(BoardState::Rebooting, observer);
            return CycleOutcome::RebootRequired;
        }

        log::warn!(
            "[API] Cycle degraded ({}), error {}/{}, retry in {} s",
            fault,
            count,
            self.policy.error_threshold,
            self.state.cycle_deadline_seconds
        );
        self.enter(BoardState::Displaying(DisplayMode::Degraded), observer);
        CycleOutcome::Degraded(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::departure::RawDeparture;
    use crate::hal::{MockClock, MockDelay, MockNetwork, MockSource, MockTimeSync, MockWatchdog};

    struct Rig {
        network: MockNetwork,
        source: MockSource,
        time: MockTimeSync,
        watchdog: MockWatchdog,
        delay: MockDelay,
        transitions: Vec<BoardState>,
    }

    impl Rig {
        fn new(network: MockNetwork) -> Self {
            let clock = MockClock::new();
            Self {
                network,
                source: MockSource::new(),
                time: MockTimeSync::new(0),
                watchdog: MockWatchdog::with_clock(clock.clone()),
                delay: MockDelay::with_clock(clock),
                transitions: Vec::new(),
            }
        }

        fn cycle(&mut self, sup: &mut RefreshSupervisor) -> CycleOutcome {
            let transitions = &mut self.transitions;
            sup.run_cycle(
                &mut self.network,
                &mut self.source,
                &mut self.time,
                &mut self.watchdog,
                &mut self.delay,
                &mut |s: BoardState, _: &RefreshState| transitions.push(s),
            )
        }
    }

    fn batch(times: &[&str]) -> Vec<RawDeparture> {
        times.iter().map(|t| RawDeparture::new(t)).collect()
    }

    // =========================================================================
    // Backoff policy
    // =========================================================================

    #[test]
    fn deadline_has_two_levels() {
        let policy = RefreshPolicy::default();
        assert_eq!(policy.deadline_for(0), 30);
        assert_eq!(policy.deadline_for(1), 5);
        assert_eq!(policy.deadline_for(9), 5);
        assert_eq!(policy.deadline_for(u32::MAX), 5);
    }

    // =========================================================================
    // Success path
    // =========================================================================

    #[test]
    fn first_success_fills_cache() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        rig.source.push_ok(batch(&["2026-01-11T12:09:20.000Z"]));

        assert_eq!(sup.board_state(), BoardState::Booting);
        assert_eq!(rig.cycle(&mut sup), CycleOutcome::Fresh { changed: true });
        assert_eq!(sup.state().last_good_departures.len(), 1);
        assert_eq!(sup.state().cycle_deadline_seconds, 30);
        assert_eq!(
            rig.transitions,
            [
                BoardState::Connecting,
                BoardState::Fetching,
                BoardState::Displaying(DisplayMode::Success)
            ]
        );
    }

    #[test]
    fn success_resets_error_count() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        for _ in 0..7 {
            rig.source.push_err(FetchError::Transport);
        }
        rig.source.push_ok(batch(&["2026-01-11T12:09:20.000Z"]));

        for _ in 0..7 {
            rig.cycle(&mut sup);
        }
        assert_eq!(sup.state().consecutive_error_count, 7);
        assert_eq!(sup.state().cycle_deadline_seconds, 5);

        rig.cycle(&mut sup);
        assert_eq!(sup.state().consecutive_error_count, 0);
        assert_eq!(sup.state().cycle_deadline_seconds, 30);
        assert_eq!(sup.state().last_fault, None);
    }

    #[test]
    fn unchanged_first_departure_is_reported() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        rig.source.push_ok(batch(&["2026-01-11T12:09:20.000Z", "2026-01-11T12:19:20.000Z"]));
        rig.source.push_ok(batch(&["2026-01-11T12:09:20.000Z"]));
        rig.source.push_ok(batch(&["2026-01-11T12:19:20.000Z"]));

        assert_eq!(rig.cycle(&mut sup), CycleOutcome::Fresh { changed: true });
        assert_eq!(rig.cycle(&mut sup), CycleOutcome::Fresh { changed: false });
        assert_eq!(rig.cycle(&mut sup), CycleOutcome::Fresh { changed: true });
    }

    #[test]
    fn empty_success_keeps_non_empty_cache() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        rig.source.push_ok(batch(&["2026-01-11T12:09:20.000Z"]));
        rig.source.push_err(FetchError::Decode);
        rig.source.push_ok(Vec::new());

        rig.cycle(&mut sup);
        rig.cycle(&mut sup);
        rig.cycle(&mut sup);
        assert_eq!(sup.state().last_good_departures.len(), 1);
        assert_eq!(sup.state().consecutive_error_count, 0);
    }

    #[test]
    fn empty_success_over_cache_is_unchanged() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        rig.source.push_ok(batch(&["2026-01-11T12:09:20.000Z"]));
        rig.source.push_ok(Vec::new());

        assert_eq!(rig.cycle(&mut sup), CycleOutcome::Fresh { changed: true });
        assert_eq!(rig.cycle(&mut sup), CycleOutcome::Fresh { changed: false });
        assert_eq!(sup.state().last_good_departures.len(), 1);
    }

    #[test]
    fn empty_success_without_cache_is_fine() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        rig.source.push_ok(Vec::new());
        assert_eq!(rig.cycle(&mut sup), CycleOutcome::Fresh { changed: false });
        assert!(!sup.state().has_data());
    }

    #[test]
    fn force_flag_cleared_at_cycle_start() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        sup.request_force_refresh();
        assert!(sup.state().force_refresh_requested);
        rig.cycle(&mut sup);
        assert!(!sup.state().force_refresh_requested);
    }

    // =========================================================================
    // Failure path
    // =========================================================================

    #[test]
    fn failure_keeps_last_good_data() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        rig.source.push_ok(batch(&["2026-01-11T12:09:20.000Z"]));
        rig.source.push_err(FetchError::Status(502));

        rig.cycle(&mut sup);
        let cached = sup.state().last_good_departures.clone();
        assert_eq!(
            rig.cycle(&mut sup),
            CycleOutcome::Degraded(CycleFault::Fetch(FetchError::Status(502)))
        );
        assert_eq!(sup.state().last_good_departures, cached);
        assert_eq!(sup.board_state(), BoardState::Displaying(DisplayMode::Degraded));
    }

    #[test]
    fn reboot_exactly_at_threshold() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());

        for n in 1..10 {
            assert_eq!(
                rig.cycle(&mut sup),
                CycleOutcome::Degraded(CycleFault::Fetch(FetchError::Transport)),
                "cycle {}",
                n
            );
        }
        assert_eq!(rig.cycle(&mut sup), CycleOutcome::RebootRequired);
        assert_eq!(sup.board_state(), BoardState::Rebooting);

        // terminal: no further fetches
        let fetches = rig.source.fetch_count;
        assert_eq!(rig.cycle(&mut sup), CycleOutcome::RebootRequired);
        assert_eq!(rig.source.fetch_count, fetches);
    }

    #[test]
    fn connectivity_failure_counts_and_skips_fetch() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::new());

        assert_eq!(
            rig.cycle(&mut sup),
            CycleOutcome::Degraded(CycleFault::Connectivity)
        );
        assert_eq!(rig.source.fetch_count, 0);
        assert_eq!(rig.network.connect_calls, 1);
        assert_eq!(sup.state().consecutive_error_count, 1);
        assert_eq!(rig.delay.total_ms(), 5_000);
    }

    #[test]
    fn connect_failing_to_start_counts() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut net = MockNetwork::new();
        net.fail_connect = true;
        let mut rig = Rig::new(net);
        assert_eq!(
            rig.cycle(&mut sup),
            CycleOutcome::Degraded(CycleFault::Connectivity)
        );
        assert_eq!(rig.delay.total_ms(), 0);
    }

    #[test]
    fn connect_wait_is_sliced_and_fed() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::new());
        rig.cycle(&mut sup);

        assert_eq!(rig.delay.longest_ms, 250);
        assert_eq!(rig.delay.calls, 20);
        assert!(rig.watchdog.longest_gap_ms <= 250);
    }

    #[test]
    fn slow_link_connects_within_bound() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::connects_after(3));
        rig.source.push_ok(batch(&["2026-01-11T12:09:20.000Z"]));

        assert_eq!(rig.cycle(&mut sup), CycleOutcome::Fresh { changed: true });
        assert_eq!(rig.delay.total_ms(), 1_000);
    }

    #[test]
    fn slow_fetch_is_bracketed_by_feeds() {
        let clock = MockClock::new();
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        rig.watchdog = MockWatchdog::with_clock(clock.clone());
        rig.source = MockSource::new().with_latency(clock, 6_000);

        rig.cycle(&mut sup);
        assert_eq!(rig.watchdog.longest_gap_ms, 6_000);
        assert_eq!(rig.watchdog.since_last_feed_ms(), Some(0));
    }

    // =========================================================================
    // Time sync
    // =========================================================================

    #[test]
    fn time_sync_retried_until_success() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::online());
        rig.time.push_result(false);
        rig.source.push_ok(Vec::new());
        rig.source.push_ok(Vec::new());
        rig.source.push_ok(Vec::new());

        rig.cycle(&mut sup);
        assert!(!sup.state().time_synced);
        assert_eq!(sup.state().consecutive_error_count, 0);

        rig.cycle(&mut sup);
        assert!(sup.state().time_synced);

        rig.cycle(&mut sup);
        assert_eq!(rig.time.sync_calls, 2);
    }

    #[test]
    fn no_sync_without_link() {
        let mut sup = RefreshSupervisor::new(RefreshPolicy::default());
        let mut rig = Rig::new(MockNetwork::new());
        rig.cycle(&mut sup);
        assert_eq!(rig.time.sync_calls, 0);
    }

    #[test]
    fn error_count_saturates() {
        let policy = RefreshPolicy {
            error_threshold: u32::MAX,
            ..RefreshPolicy::default()
        };
        let mut sup = RefreshSupervisor::new(policy);
        sup.state.consecutive_error_count = u32::MAX - 1;
        let mut rig = Rig::new(MockNetwork::online());
        assert_eq!(rig.cycle(&mut sup), CycleOutcome::RebootRequired);
        assert_eq!(sup.state().consecutive_error_count, u32::MAX);
    }
}
