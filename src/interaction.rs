//! The outer loop: refresh, render, wait, repeat.
//!
//! Between refresh cycles the board waits `cycle_deadline_seconds`. The wait
//! is a cooperative scheduler: [`WaitWindow::sample`] is called once per
//! input sample (10 per second by default) and says what to do next. At the
//! start of every second the loop feeds the watchdog and redraws the header
//! clock and the progress bar.
//!
//! Buttons:
//!
//! - brightness: steps through the backlight levels, then pauses briefly
//!   (debounce); the wait continues
//! - refresh: ends the wait immediately and marks the next cycle as forced,
//!   which plays a short white flash before fetching
//!
//! When the supervisor asks for a reboot the loop shows a notice, waits a few
//! seconds (still feeding the watchdog) and calls [`Watchdog::reboot`].

use crate::civil_time::{to_local, CivilTime};
use crate::config::{BacklightLevels, BoardConfig, Config};
use crate::presenter::{self, Frame};
use crate::refresh::{BoardState, CycleOutcome, RefreshPolicy, RefreshState, RefreshSupervisor};
use crate::traits::{
    BoardDisplay, Delay, DepartureSource, InputSource, Network, TimeSync, Watchdog,
};

// ============================================================================
// Wait window
// ============================================================================

/// What the loop does after one input sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitAction {
    /// Sleep one sample period and sample again.
    Continue,
    /// Sleep one sample period; a new second starts with the next sample.
    SecondElapsed,
    /// Sleep one sample period, then leave: the window is over.
    Elapsed,
    /// Leave now: the user asked for a refresh.
    ForceRefresh,
}

/// Result of one [`WaitWindow::sample`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitStep {
    /// The brightness button was pressed on this sample.
    pub toggle_brightness: bool,
    /// What to do next.
    pub action: WaitAction,
}

/// Countdown over the wait between two refresh cycles.
///
/// # Example
///
/// ```rust
/// use rs_departures::interaction::{WaitAction, WaitWindow};
///
/// let mut window = WaitWindow::new(2, 10);
/// assert_eq!(window.seconds_remaining(), 2);
///
/// for _ in 0..9 {
///     assert_eq!(window.sample(false, false).action, WaitAction::Continue);
/// }
/// assert_eq!(window.sample(false, false).action, WaitAction::SecondElapsed);
/// assert_eq!(window.seconds_remaining(), 1);
///
/// assert_eq!(window.sample(true, false).action, WaitAction::ForceRefresh);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitWindow {
    total_seconds: u32,
    samples_per_second: u32,
    seconds_remaining: u32,
    sample_in_second: u32,
}

impl WaitWindow {
    /// Starts a window of `total_seconds`, sampled `samples_per_second` times a second.
    pub fn new(total_seconds: u32, samples_per_second: u32) -> Self {
        Self {
            total_seconds,
            samples_per_second: samples_per_second.max(1),
            seconds_remaining: total_seconds,
            sample_in_second: 0,
        }
    }

    /// Whole seconds left, counting the current one.
    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    /// Window length.
    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    /// True once every second has been waited out.
    pub fn is_elapsed(&self) -> bool {
        self.seconds_remaining == 0
    }

    /// True when the next sample is the first of a second.
    pub fn at_second_start(&self) -> bool {
        self.sample_in_second == 0 && !self.is_elapsed()
    }

    /// Feeds one sample of the button levels into the window.
    pub fn sample(&mut self, refresh: bool, brightness: bool) -> WaitStep {
        let action = if self.is_elapsed() {
            WaitAction::Elapsed
        } else if refresh {
            WaitAction::ForceRefresh
        } else {
            self.sample_in_second += 1;
            if self.sample_in_second < self.samples_per_second {
                WaitAction::Continue
            } else {
                self.sample_in_second = 0;
                self.seconds_remaining -= 1;
                if self.seconds_remaining == 0 {
                    WaitAction::Elapsed
                } else {
                    WaitAction::SecondElapsed
                }
            }
        };
        WaitStep {
            toggle_brightness: brightness,
            action,
        }
    }
}

// ============================================================================
// Brightness
// ============================================================================

/// Steps through a fixed list of backlight levels, wrapping around.
#[derive(Clone, Debug)]
pub struct BrightnessCycler {
    levels: BacklightLevels,
    index: usize,
}

impl BrightnessCycler {
    /// Starts at `index`; an out-of-range index starts at the first level.
    pub fn new(levels: BacklightLevels, index: usize) -> Self {
        let index = if index < levels.len() { index } else { 0 };
        Self { levels, index }
    }

    /// Current level, full brightness if the list is empty.
    pub fn current(&self) -> f32 {
        self.levels.get(self.index).copied().unwrap_or(1.0)
    }

    /// Current position in the list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Advances to the next level and returns it.
    pub fn next_level(&mut self) -> f32 {
        if !self.levels.is_empty() {
            self.index = (self.index + 1) % self.levels.len();
        }
        self.current()
    }
}

// ============================================================================
// Loop
// ============================================================================

/// Everything the loop drives.
pub struct BoardHardware<Disp, Net, Src, Inp, Wdt, Tim, Dly> {
    /// Bitmap display.
    pub display: Disp,
    /// Network link.
    pub network: Net,
    /// Departure source.
    pub source: Src,
    /// Buttons.
    pub input: Inp,
    /// Hardware watchdog.
    pub watchdog: Wdt,
    /// Wall clock.
    pub time: Tim,
    /// Blocking delay.
    pub delay: Dly,
}

/// Why [`InteractionLoop::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// A reboot was issued and the watchdog implementation returned.
    Rebooted,
}

/// How a wait window ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitEnd {
    /// The full deadline passed.
    Elapsed,
    /// The refresh button cut it short.
    ForceRefresh,
}

/// The board's top-level loop.
pub struct InteractionLoop<Disp, Net, Src, Inp, Wdt, Tim, Dly> {
    hw: BoardHardware<Disp, Net, Src, Inp, Wdt, Tim, Dly>,
    supervisor: RefreshSupervisor,
    brightness: BrightnessCycler,
    board: BoardConfig,
}

fn show<D: BoardDisplay>(display: &mut D, frame: &Frame) {
    if let Err(e) = presenter::apply_frame(display, frame) {
        log::warn!("[UI] Draw failed: {:?}", e);
    }
}

impl<Disp, Net, Src, Inp, Wdt, Tim, Dly> InteractionLoop<Disp, Net, Src, Inp, Wdt, Tim, Dly>
where
    Disp: BoardDisplay,
    Net: Network,
    Src: DepartureSource,
    Inp: InputSource,
    Wdt: Watchdog,
    Tim: TimeSync,
    Dly: Delay,
{
    /// Creates the loop. Nothing is drawn until [`boot`](Self::boot).
    pub fn new(hw: BoardHardware<Disp, Net, Src, Inp, Wdt, Tim, Dly>, config: &Config) -> Self {
        Self {
            hw,
            supervisor: RefreshSupervisor::new(RefreshPolicy::from_config(config)),
            brightness: BrightnessCycler::new(
                config.board.backlight_levels.clone(),
                config.board.initial_backlight_index,
            ),
            board: config.board.clone(),
        }
    }

    /// The driven hardware.
    pub fn hardware(&self) -> &BoardHardware<Disp, Net, Src, Inp, Wdt, Tim, Dly> {
        &self.hw
    }

    /// The driven hardware, mutably.
    pub fn hardware_mut(&mut self) -> &mut BoardHardware<Disp, Net, Src, Inp, Wdt, Tim, Dly> {
        &mut self.hw
    }

    /// The refresh state machine.
    pub fn supervisor(&self) -> &RefreshSupervisor {
        &self.supervisor
    }

    /// Current backlight step.
    pub fn brightness(&self) -> &BrightnessCycler {
        &self.brightness
    }

    fn local_clock(&self) -> Option<CivilTime> {
        self.hw.time.utc_now().map(to_local)
    }

    /// Sets the initial backlight and shows the splash screen.
    pub fn boot(&mut self) {
        log::info!("[BOOT] Departure board starting");
        self.hw.watchdog.feed();
        if let Err(e) = self.hw.display.set_backlight(self.brightness.current()) {
            log::warn!("[UI] Backlight failed: {:?}", e);
        }
        show(&mut self.hw.display, &presenter::render_splash());
    }

    /// One refresh cycle followed by one wait window.
    ///
    /// Returns `Some` only after a reboot was issued.
    pub fn run_iteration(&mut self) -> Option<LoopExit> {
        if self.supervisor.state().force_refresh_requested {
            self.play_flash();
        }

        let display = &mut self.hw.display;
        let mut observer = |state: BoardState, _: &RefreshState| match state {
            BoardState::Fetching => show(display, &presenter::render_fetch_indicator(true)),
            BoardState::Displaying(_) => show(display, &presenter::render_fetch_indicator(false)),
            _ => {}
        };
        let outcome = self.supervisor.run_cycle(
            &mut self.hw.network,
            &mut self.hw.source,
            &mut self.hw.time,
            &mut self.hw.watchdog,
            &mut self.hw.delay,
            &mut observer,
        );

        if outcome == CycleOutcome::RebootRequired {
            self.reboot();
            return Some(LoopExit::Rebooted);
        }

        let clock = self.local_clock();
        show(
            &mut self.hw.display,
            &presenter::render_board(
                self.supervisor.state(),
                &self.board.route_label,
                clock.as_ref(),
                self.board.max_rows,
            ),
        );

        let deadline = self.supervisor.state().cycle_deadline_seconds;
        if self.wait(deadline) == WaitEnd::ForceRefresh {
            self.supervisor.request_force_refresh();
        }
        None
    }

    /// Runs until a reboot is issued.
    pub fn run(&mut self) -> LoopExit {
        self.boot();
        loop {
            if let Some(exit) = self.run_iteration() {
                return exit;
            }
        }
    }

    /// Waits out `total_seconds`, sampling the buttons.
    pub fn wait(&mut self, total_seconds: u32) -> WaitEnd {
        let period = self.board.sample_period_ms();
        let mut window = WaitWindow::new(total_seconds, self.board.input_samples_per_second);

        while !window.is_elapsed() {
            if window.at_second_start() {
                self.hw.watchdog.feed();
                let clock = self.local_clock();
                show(
                    &mut self.hw.display,
                    &presenter::render_header(&self.board.route_label, clock.as_ref()),
                );
                show(
                    &mut self.hw.display,
                    &presenter::render_progress(window.seconds_remaining(), total_seconds),
                );
            }

            let brightness = self.hw.input.is_brightness_toggle_requested();
            let refresh = self.hw.input.is_refresh_requested();
            let step = window.sample(refresh, brightness);

            if step.toggle_brightness {
                self.toggle_brightness();
            }

            match step.action {
                WaitAction::ForceRefresh => {
                    log::info!("[UI] Manual refresh");
                    self.hw.delay.delay_ms(self.board.debounce_ms);
                    self.hw.watchdog.feed();
                    return WaitEnd::ForceRefresh;
                }
                WaitAction::Continue | WaitAction::SecondElapsed | WaitAction::Elapsed => {
                    self.hw.delay.delay_ms(period);
                }
            }
        }
        self.hw.watchdog.feed();
        WaitEnd::Elapsed
    }

    fn toggle_brightness(&mut self) {
        let level = self.brightness.next_level();
        log::debug!("[UI] Brightness {}", level);
        if let Err(e) = self.hw.display.set_backlight(level) {
            log::warn!("[UI] Backlight failed: {:?}", e);
        }
        self.hw.delay.delay_ms(self.board.debounce_ms);
        self.hw.watchdog.feed();
    }

    fn play_flash(&mut self) {
        show(&mut self.hw.display, &presenter::render_flash());
        self.hw.delay.delay_ms(self.board.flash_ms);
        let clock = self.local_clock();
        show(
            &mut self.hw.display,
            &presenter::render_blank(&self.board.route_label, clock.as_ref()),
        );
    }

    fn reboot(&mut self) {
        let count = self.supervisor.state().consecutive_error_count;
        log::error!("[WDT] Rebooting after {} consecutive errors", count);
        show(&mut self.hw.display, &presenter::render_fatal(count));

        let slice = self.board.sample_period_ms().max(1);
        let mut paused = 0;
        while paused < self.board.fatal_pause_ms {
            let step = slice.min(self.board.fatal_pause_ms - paused);
            self.hw.watchdog.feed();
            self.hw.delay.delay_ms(step);
            paused += step;
        }
        self.hw.watchdog.feed();
        self.hw.watchdog.reboot();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BACKLIGHT_LEVELS;

    fn levels() -> BacklightLevels {
        DEFAULT_BACKLIGHT_LEVELS.iter().copied().collect()
    }

    // =========================================================================
    // WaitWindow
    // =========================================================================

    #[test]
    fn window_counts_down_per_second() {
        let mut window = WaitWindow::new(3, 10);
        let mut seconds = 0;
        let mut samples = 0;
        loop {
            samples += 1;
            match window.sample(false, false).action {
                WaitAction::Continue => {}
                WaitAction::SecondElapsed => seconds += 1,
                WaitAction::Elapsed => break,
                WaitAction::ForceRefresh => unreachable!(),
            }
        }
        assert_eq!(samples, 30);
        assert_eq!(seconds, 2);
        assert!(window.is_elapsed());
        assert!(!window.at_second_start());
    }

    #[test]
    fn second_start_flag() {
        let mut window = WaitWindow::new(2, 2);
        assert!(window.at_second_start());
        window.sample(false, false);
        assert!(!window.at_second_start());
        window.sample(false, false);
        assert!(window.at_second_start());
        assert_eq!(window.seconds_remaining(), 1);
    }

    #[test]
    fn refresh_breaks_without_counting() {
        let mut window = WaitWindow::new(30, 10);
        window.sample(false, false);
        let step = window.sample(true, false);
        assert_eq!(step.action, WaitAction::ForceRefresh);
        assert_eq!(window.seconds_remaining(), 30);
    }

    #[test]
    fn brightness_does_not_break_wait() {
        let mut window = WaitWindow::new(30, 10);
        let step = window.sample(false, true);
        assert!(step.toggle_brightness);
        assert_eq!(step.action, WaitAction::Continue);
    }

    #[test]
    fn zero_window_is_elapsed() {
        let mut window = WaitWindow::new(0, 10);
        assert!(window.is_elapsed());
        assert_eq!(window.sample(true, false).action, WaitAction::Elapsed);
    }

    #[test]
    fn zero_sample_rate_is_clamped() {
        let mut window = WaitWindow::new(1, 0);
        assert_eq!(window.sample(false, false).action, WaitAction::Elapsed);
    }

    // =========================================================================
    // BrightnessCycler
    // =========================================================================

    #[test]
    fn brightness_cycles_and_wraps() {
        let mut cycler = BrightnessCycler::new(levels(), 3);
        assert_eq!(cycler.current(), 0.5);
        assert_eq!(cycler.next_level(), 0.65);
        assert_eq!(cycler.next_level(), 0.8);
        assert_eq!(cycler.next_level(), 1.0);
        assert_eq!(cycler.next_level(), 0.1);
        assert_eq!(cycler.index(), 0);
    }

    #[test]
    fn brightness_bad_index_starts_at_zero() {
        let cycler = BrightnessCycler::new(levels(), 42);
        assert_eq!(cycler.index(), 0);
    }

    #[test]
    fn brightness_empty_list_is_full() {
        let mut cycler = BrightnessCycler::new(BacklightLevels::new(), 0);
        assert_eq!(cycler.current(), 1.0);
        assert_eq!(cycler.next_level(), 1.0);
    }
}
