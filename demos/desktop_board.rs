//! Desktop run of the departure board with simulated hardware.
//!
//! Drives the real interaction loop against mocks: a scripted departure
//! feed, a link that drops once, and a terminal "display" that prints each
//! presented frame as text. Simulated time advances instantly, so the run
//! completes immediately.
//!
//! # Usage
//!
//! ```sh
//! cargo run --example desktop_board
//! ```

use rs_departures::hal::{
    MockClock, MockDelay, MockInput, MockNetwork, MockSource, MockTimeSync, MockWatchdog,
};
use rs_departures::traits::{BoardDisplay, Rgb};
use rs_departures::{BoardConfig, BoardHardware, Config, FetchError, InteractionLoop, RawDeparture};

/// 2026-01-11 12:09:20 UTC
const UTC_BASE: i64 = 1_768_133_360;

/// Prints text draw calls, one block per presented frame.
#[derive(Default)]
struct TerminalDisplay {
    lines: Vec<(i32, i32, String)>,
    backlight: f32,
}

impl BoardDisplay for TerminalDisplay {
    type Error = std::convert::Infallible;

    fn clear(&mut self, _color: Rgb) -> Result<(), Self::Error> {
        self.lines.clear();
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        _max_width: u32,
        _scale: u8,
        _color: Rgb,
    ) -> Result<(), Self::Error> {
        self.lines.retain(|(lx, ly, _)| (*lx, *ly) != (x, y));
        self.lines.push((x, y, text.to_string()));
        Ok(())
    }

    fn draw_rect(&mut self, _: i32, _: i32, _: u32, _: u32, _: Rgb) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_backlight(&mut self, level: f32) -> Result<(), Self::Error> {
        self.backlight = level;
        println!("[backlight {:.0}%]", level * 100.0);
        Ok(())
    }

    fn present(&mut self) -> Result<(), Self::Error> {
        let mut rows = self.lines.clone();
        rows.sort_by_key(|(x, y, _)| (*y, *x));
        println!("+------------------------------------------+");
        for (_, y, text) in rows {
            println!("| {:>3} {:<38}|", y, text);
        }
        println!("+------------------------------------------+");
        Ok(())
    }
}

fn feed() -> Vec<RawDeparture> {
    vec![
        RawDeparture::new("2026-01-11T12:19:00.000Z")
            .with_delay(0)
            .with_transfers(0)
            .with_duration("12 min"),
        RawDeparture::new("2026-01-11T12:29:00.000Z")
            .with_delay(3)
            .with_transfers(1)
            .with_duration("17 min"),
        RawDeparture::new("2026-01-11T12:39:00.000Z").with_delay(0),
        RawDeparture::new("2026-01-11T12:49:00.000Z").with_delay(1),
        RawDeparture::new("2026-01-11T12:59:00.000Z").with_delay(0),
    ]
}

fn main() {
    let clock = MockClock::new();

    let mut source = MockSource::new().with_latency(clock.clone(), 400);
    source.push_ok(feed());
    source.push_err(FetchError::Status(503));
    source.push_ok(feed());

    let mut input = MockInput::new();
    input.press_brightness_after(12);

    let config = Config::default().with_board(
        BoardConfig::default()
            .with_nominal_interval_secs(3)
            .with_retry_interval_secs(1),
    );

    let hw = BoardHardware {
        display: TerminalDisplay::default(),
        network: MockNetwork::online(),
        source,
        input,
        watchdog: MockWatchdog::with_clock(clock.clone()),
        time: MockTimeSync::new(UTC_BASE).with_clock(clock.clone()),
        delay: MockDelay::with_clock(clock.clone()),
    };

    let mut board = InteractionLoop::new(hw, &config);
    board.boot();
    for _ in 0..3 {
        board.run_iteration();
    }

    let hw = board.hardware();
    println!(
        "simulated {} ms, {} fetches, {} watchdog feeds, longest gap {} ms",
        clock.now_ms(),
        hw.source.fetch_count,
        hw.watchdog.feeds,
        hw.watchdog.longest_gap_ms
    );
}
