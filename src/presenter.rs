//! Projection of board state onto draw commands.
//!
//! Every `render_*` function is pure: it returns a [`Frame`] (a list of
//! [`DrawCommand`]s ending in [`DrawCommand::Present`]) and never touches the
//! display. [`apply_frame`] replays a frame on a [`BoardDisplay`].
//!
//! # Layout (320x240)
//!
//! ```text
//! y=0    +----------------------------------------------+
//!        | route label                          HH:MM   |  header, blue
//! y=48   +----------------------------------------------+
//! y=60   | 13:09    +2 H6 D12m                          |  row 1
//! y=95   | 13:19    +0                                  |  row 2
//!  ...   |                                              |
//! y=216  | Legende: +Versp. H=Halte D=Dauer          o  |  legend, fetch icon
//! y=232  |==========================                    |  progress bar
//! y=240  +----------------------------------------------+
//! ```
//!
//! Text is truncated to its column budget using the advance widths of the
//! board's bitmap fonts, so nothing drawn here overflows its box.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::civil_time::CivilTime;
use crate::departure::Departure;
use crate::refresh::{CycleFault, RefreshState};
use crate::traits::{BoardDisplay, Rgb, CANVAS_WIDTH};

/// Header bar height.
pub const HEADER_HEIGHT: u32 = 48;
/// Route label position, width and scale.
pub const LABEL_X: i32 = 6;
/// Route label top.
pub const LABEL_Y: i32 = 10;
/// Route label column budget.
pub const LABEL_WIDTH: u32 = 220;
/// Header clock left edge.
pub const CLOCK_X: i32 = 230;
/// Header clock top.
pub const CLOCK_Y: i32 = 8;
/// Header clock column budget.
pub const CLOCK_WIDTH: u32 = 80;
/// Top of the first departure row.
pub const ROW_START_Y: i32 = 60;
/// Vertical distance between rows.
pub const ROW_STEP: i32 = 35;
/// Departure time left edge.
pub const TIME_X: i32 = 10;
/// Departure time column budget.
pub const TIME_WIDTH: u32 = 300;
/// Delay column left edge.
pub const DELAY_X: i32 = 110;
/// Delay column budget when tags follow the delay.
pub const DELAY_WIDTH_TAGGED: u32 = 200;
/// Delay column budget for a bare delay.
pub const DELAY_WIDTH: u32 = 140;
/// Full-width message position.
pub const MESSAGE_X: i32 = 10;
/// Full-width message budget.
pub const MESSAGE_WIDTH: u32 = 300;
/// Legend top.
pub const LEGEND_Y: i32 = 216;
/// Progress bar top.
pub const PROGRESS_Y: i32 = 232;
/// Progress bar height.
pub const PROGRESS_HEIGHT: u32 = 6;
/// Fetch indicator top-left corner.
pub const FETCH_ICON_X: i32 = 304;
/// Fetch indicator top.
pub const FETCH_ICON_Y: i32 = 224;
/// Fetch indicator edge length.
pub const FETCH_ICON_SIZE: u32 = 10;

/// Legend explaining the row tags.
pub const LEGEND: &str = "Legende: +Versp. H=Halte D=Dauer";
/// Header clock before the wall clock is set.
pub const CLOCK_UNSET: &str = "--:--";

const TIME_SCALE: u8 = 4;
const DETAIL_SCALE: u8 = 3;
const SMALL_SCALE: u8 = 2;

/// One display primitive.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Fill the canvas.
    Clear(Rgb),
    /// Draw clipped text.
    Text {
        /// Text, already truncated to `max_width`.
        text: String,
        /// Left edge.
        x: i32,
        /// Top edge.
        y: i32,
        /// Column budget in pixels.
        max_width: u32,
        /// Font scale.
        scale: u8,
        /// Colour.
        color: Rgb,
    },
    /// Fill a rectangle.
    Rect {
        /// Left edge.
        x: i32,
        /// Top edge.
        y: i32,
        /// Width.
        width: u32,
        /// Height.
        height: u32,
        /// Colour.
        color: Rgb,
    },
    /// Push to the panel.
    Present,
}

/// Ordered draw commands.
pub type Frame = Vec<DrawCommand>;

/// Advance width in pixels of one glyph at `scale` on the board's fonts.
pub const fn glyph_width(scale: u8) -> u32 {
    match scale {
        0..=2 => 6,
        3 => 9,
        _ => 10,
    }
}

/// Longest prefix of `text` that fits in `max_width` pixels at `scale`.
pub fn truncate_to_width(text: &str, max_width: u32, scale: u8) -> &str {
    let max_chars = (max_width / glyph_width(scale)) as usize;
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Filled width of the progress bar.
///
/// `floor(320 * remaining / total)`, with `remaining` capped at `total`.
pub fn progress_width(seconds_remaining: u32, total_seconds: u32) -> u32 {
    if total_seconds == 0 {
        return 0;
    }
    let remaining = seconds_remaining.min(total_seconds) as u64;
    (CANVAS_WIDTH as u64 * remaining / total_seconds as u64) as u32
}

fn text(frame: &mut Frame, s: &str, x: i32, y: i32, max_width: u32, scale: u8, color: Rgb) {
    frame.push(DrawCommand::Text {
        text: String::from(truncate_to_width(s, max_width, scale)),
        x,
        y,
        max_width,
        scale,
        color,
    });
}

fn rect(frame: &mut Frame, x: i32, y: i32, width: u32, height: u32, color: Rgb) {
    frame.push(DrawCommand::Rect {
        x,
        y,
        width,
        height,
        color,
    });
}

fn push_header(frame: &mut Frame, label: &str, clock: Option<&CivilTime>) {
    rect(frame, 0, 0, CANVAS_WIDTH, HEADER_HEIGHT, Rgb::BLUE);
    text(frame, label, LABEL_X, LABEL_Y, LABEL_WIDTH, SMALL_SCALE, Rgb::WHITE);
    match clock {
        Some(t) => text(frame, &t.hhmm(), CLOCK_X, CLOCK_Y, CLOCK_WIDTH, DETAIL_SCALE, Rgb::WHITE),
        None => text(frame, CLOCK_UNSET, CLOCK_X, CLOCK_Y, CLOCK_WIDTH, DETAIL_SCALE, Rgb::WHITE),
    }
}

/// Delay and tag text for one row, e.g. `+2 H6 D12m`.
pub fn delay_text(dep: &Departure) -> String {
    let mut out = format!("+{}", dep.delay_minutes);
    if let Some(stops) = dep.transfer_count {
        out.push_str(&format!(" H{}", stops));
    }
    if let Some(duration) = dep.compact_duration().filter(|d| !d.is_empty()) {
        out.push_str(&format!(" D{}", duration));
    }
    out
}

/// Colour of the delay column.
#[inline]
pub fn delay_color(dep: &Departure) -> Rgb {
    if dep.is_delayed() {
        Rgb::RED
    } else {
        Rgb::GREEN
    }
}

fn push_row(frame: &mut Frame, dep: &Departure, y: i32) {
    text(frame, &dep.local_time, TIME_X, y, TIME_WIDTH, TIME_SCALE, Rgb::WHITE);
    let detail = delay_text(dep);
    let width = if detail.contains(' ') {
        DELAY_WIDTH_TAGGED
    } else {
        DELAY_WIDTH
    };
    text(frame, &detail, DELAY_X, y, width, DETAIL_SCALE, delay_color(dep));
}

fn push_body(frame: &mut Frame, state: &RefreshState, max_rows: usize) {
    if state.has_data() {
        for (i, dep) in state.last_good_departures.iter().take(max_rows).enumerate() {
            push_row(frame, dep, ROW_START_Y + i as i32 * ROW_STEP);
        }
        return;
    }
    let (msg, color) = match state.last_fault {
        Some(CycleFault::Connectivity) => ("WiFi Failed!", Rgb::RED),
        Some(CycleFault::Fetch(_)) => ("Fetch failed", Rgb::RED),
        None => ("No data available", Rgb::WHITE),
    };
    push_message(frame, msg, ROW_START_Y, color);
}

fn push_message(frame: &mut Frame, message: &str, y: i32, color: Rgb) {
    text(frame, message, MESSAGE_X, y, MESSAGE_WIDTH, DETAIL_SCALE, color);
}

/// Full board: header, up to `max_rows` departures (or a message), legend.
pub fn render_board(
    state: &RefreshState,
    label: &str,
    clock: Option<&CivilTime>,
    max_rows: usize,
) -> Frame {
    let mut frame = Frame::new();
    frame.push(DrawCommand::Clear(Rgb::BLACK));
    push_header(&mut frame, label, clock);
    push_body(&mut frame, state, max_rows);
    text(&mut frame, LEGEND, LABEL_X, LEGEND_Y, 310, SMALL_SCALE, Rgb::WHITE);
    frame.push(DrawCommand::Present);
    frame
}

/// Header bar only, redrawn once per second.
pub fn render_header(label: &str, clock: Option<&CivilTime>) -> Frame {
    let mut frame = Frame::new();
    push_header(&mut frame, label, clock);
    frame.push(DrawCommand::Present);
    frame
}

/// Progress bar for the wait window.
pub fn render_progress(seconds_remaining: u32, total_seconds: u32) -> Frame {
    let mut frame = Frame::new();
    rect(&mut frame, 0, PROGRESS_Y, CANVAS_WIDTH, PROGRESS_HEIGHT, Rgb::BLACK);
    let width = progress_width(seconds_remaining, total_seconds);
    if width > 0 {
        rect(&mut frame, 0, PROGRESS_Y, width, PROGRESS_HEIGHT, Rgb::YELLOW);
    }
    frame.push(DrawCommand::Present);
    frame
}

/// Shows or clears the fetch-in-flight indicator.
pub fn render_fetch_indicator(show: bool) -> Frame {
    let mut frame = Frame::new();
    rect(
        &mut frame,
        FETCH_ICON_X - 2,
        FETCH_ICON_Y - 2,
        FETCH_ICON_SIZE + 4,
        FETCH_ICON_SIZE + 4,
        Rgb::BLACK,
    );
    if show {
        rect(
            &mut frame,
            FETCH_ICON_X,
            FETCH_ICON_Y,
            FETCH_ICON_SIZE,
            FETCH_ICON_SIZE,
            Rgb::YELLOW,
        );
    }
    frame.push(DrawCommand::Present);
    frame
}

/// Boot splash.
pub fn render_splash() -> Frame {
    let mut frame = Frame::new();
    frame.push(DrawCommand::Clear(Rgb::BLACK));
    text(&mut frame, "Connecting to WiFi...", MESSAGE_X, 10, 240, DETAIL_SCALE, Rgb::WHITE);
    frame.push(DrawCommand::Present);
    frame
}

/// A single message line over whatever is on screen.
pub fn render_message(message: &str, y: i32, color: Rgb) -> Frame {
    let mut frame = Frame::new();
    push_message(&mut frame, message, y, color);
    frame.push(DrawCommand::Present);
    frame
}

/// Notice shown before a reboot.
pub fn render_fatal(error_count: u32) -> Frame {
    let mut frame = Frame::new();
    frame.push(DrawCommand::Clear(Rgb::BLACK));
    text(
        &mut frame,
        &format!("{} errors in a row", error_count),
        MESSAGE_X,
        ROW_START_Y,
        MESSAGE_WIDTH,
        DETAIL_SCALE,
        Rgb::RED,
    );
    text(
        &mut frame,
        "Rebooting...",
        MESSAGE_X,
        ROW_START_Y + ROW_STEP,
        MESSAGE_WIDTH,
        DETAIL_SCALE,
        Rgb::WHITE,
    );
    frame.push(DrawCommand::Present);
    frame
}

/// White flash acknowledging a forced refresh.
pub fn render_flash() -> Frame {
    let mut frame = Frame::new();
    frame.push(DrawCommand::Clear(Rgb::WHITE));
    frame.push(DrawCommand::Present);
    frame
}

/// Black screen with the header, shown after the flash until data arrives.
pub fn render_blank(label: &str, clock: Option<&CivilTime>) -> Frame {
    let mut frame = Frame::new();
    frame.push(DrawCommand::Clear(Rgb::BLACK));
    push_header(&mut frame, label, clock);
    frame.push(DrawCommand::Present);
    frame
}

/// Replays `frame` on `display`, stopping at the first error.
pub fn apply_frame<D: BoardDisplay>(display: &mut D, frame: &[DrawCommand]) -> Result<(), D::Error> {
    for cmd in frame {
        match cmd {
            DrawCommand::Clear(color) => display.clear(*color)?,
            DrawCommand::Text {
                text,
                x,
                y,
                max_width,
                scale,
                color,
            } => display.draw_text(text, *x, *y, *max_width, *scale, *color)?,
            DrawCommand::Rect {
                x,
                y,
                width,
                height,
                color,
            } => display.draw_rect(*x, *y, *width, *height, *color)?,
            DrawCommand::Present => display.present()?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civil_time::{to_local, unix_from_civil};
    use crate::departure::{parse_batch, RawDeparture};
    use crate::hal::MockDisplay;
    use crate::traits::FetchError;

    fn state_with(raws: &[RawDeparture]) -> RefreshState {
        let mut state = RefreshState {
            last_good_departures: Vec::new(),
            consecutive_error_count: 0,
            cycle_deadline_seconds: 30,
            force_refresh_requested: false,
            last_fault: None,
            time_synced: true,
        };
        state.last_good_departures = parse_batch(raws);
        state
    }

    fn texts(frame: &Frame) -> Vec<(&str, Rgb)> {
        frame
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, color, .. } => Some((text.as_str(), *color)),
                _ => None,
            })
            .collect()
    }

    // =========================================================================
    // Geometry helpers
    // =========================================================================

    #[test]
    fn progress_width_math() {
        assert_eq!(progress_width(30, 30), 320);
        assert_eq!(progress_width(15, 30), 160);
        assert_eq!(progress_width(1, 30), 10);
        assert_eq!(progress_width(1, 3), 106);
        assert_eq!(progress_width(0, 30), 0);
        assert_eq!(progress_width(50, 30), 320);
        assert_eq!(progress_width(3, 0), 0);
    }

    #[test]
    fn truncation_by_glyph_budget() {
        assert_eq!(truncate_to_width("13:09", 300, 4), "13:09");
        assert_eq!(truncate_to_width("abcdefgh", 45, 3), "abcde");
        assert_eq!(truncate_to_width("abc", 0, 3), "");
        assert_eq!(truncate_to_width("Übergang", 18, 3), "Üb");
    }

    #[test]
    fn default_label_fits_header() {
        let label = "Auerberger Mitte -> Koenigstr.";
        assert_eq!(truncate_to_width(label, LABEL_WIDTH, 2), label);
    }

    // =========================================================================
    // Board
    // =========================================================================

    #[test]
    fn renders_at_most_four_rows_in_order() {
        let raws: Vec<RawDeparture> = (0..6)
            .map(|i| RawDeparture::new(&format!("2026-01-11T12:{:02}:00.000Z", i * 10)))
            .collect();
        let frame = render_board(&state_with(&raws), "Route", None, 4);
        let times: Vec<&str> = texts(&frame)
            .into_iter()
            .map(|(t, _)| t)
            .filter(|t| t.len() == 5 && t.as_bytes()[2] == b':')
            .collect();
        assert_eq!(times, ["--:--", "13:00", "13:10", "13:20", "13:30"]);
    }

    #[test]
    fn delay_colors() {
        let raws = [
            RawDeparture::new("2026-01-11T12:00:00Z").with_delay(0),
            RawDeparture::new("2026-01-11T12:10:00Z").with_delay(4),
        ];
        let frame = render_board(&state_with(&raws), "Route", None, 4);
        let t = texts(&frame);
        assert!(t.contains(&("+0", Rgb::GREEN)));
        assert!(t.contains(&("+4", Rgb::RED)));
    }

    #[test]
    fn row_tags_and_column_budget() {
        let raws = [RawDeparture::new("2026-01-11T12:00:00Z")
            .with_delay(2)
            .with_transfers(6)
            .with_duration("12 min")];
        let frame = render_board(&state_with(&raws), "Route", None, 4);
        let detail = frame.iter().find_map(|c| match c {
            DrawCommand::Text {
                text, max_width, x, ..
            } if *x == DELAY_X => Some((text.clone(), *max_width)),
            _ => None,
        });
        assert_eq!(detail, Some((String::from("+2 H6 D12m"), DELAY_WIDTH_TAGGED)));
    }

    #[test]
    fn bare_delay_uses_narrow_column() {
        let raws = [RawDeparture::new("2026-01-11T12:00:00Z")];
        let frame = render_board(&state_with(&raws), "Route", None, 4);
        assert!(frame.iter().any(|c| matches!(
            c,
            DrawCommand::Text { x, max_width, .. } if *x == DELAY_X && *max_width == DELAY_WIDTH
        )));
    }

    #[test]
    fn malformed_row_shows_sentinel() {
        let raws = [
            RawDeparture::new("2026-01-11T12:00:00Z"),
            RawDeparture::new("xx"),
            RawDeparture::new("2026-01-11T12:20:00Z"),
            RawDeparture::new("2026-01-11T12:30:00Z"),
        ];
        let frame = render_board(&state_with(&raws), "Route", None, 4);
        let t = texts(&frame);
        assert!(t.contains(&("??", Rgb::WHITE)));
        assert!(t.contains(&("13:00", Rgb::WHITE)));
        assert!(t.contains(&("13:20", Rgb::WHITE)));
        assert!(t.contains(&("13:30", Rgb::WHITE)));
    }

    #[test]
    fn empty_state_messages() {
        let mut state = state_with(&[]);
        assert!(texts(&render_board(&state, "R", None, 4)).contains(&("No data available", Rgb::WHITE)));

        state.last_fault = Some(CycleFault::Connectivity);
        assert!(texts(&render_board(&state, "R", None, 4)).contains(&("WiFi Failed!", Rgb::RED)));

        state.last_fault = Some(CycleFault::Fetch(FetchError::Decode));
        assert!(texts(&render_board(&state, "R", None, 4)).contains(&("Fetch failed", Rgb::RED)));
    }

    #[test]
    fn cached_data_hides_fault() {
        let mut state = state_with(&[RawDeparture::new("2026-01-11T12:00:00Z")]);
        state.last_fault = Some(CycleFault::Connectivity);
        let frame = render_board(&state, "R", None, 4);
        assert!(!texts(&frame).iter().any(|(t, _)| *t == "WiFi Failed!"));
    }

    #[test]
    fn header_shows_local_clock() {
        let clock = to_local(unix_from_civil(2026, 7, 1, 10, 0, 0));
        let frame = render_header("Route", Some(&clock));
        assert!(texts(&frame).contains(&("12:00", Rgb::WHITE)));
        assert_eq!(frame.last(), Some(&DrawCommand::Present));
    }

    #[test]
    fn legend_is_drawn() {
        let frame = render_board(&state_with(&[]), "R", None, 4);
        assert!(texts(&frame).contains(&(LEGEND, Rgb::WHITE)));
    }

    // =========================================================================
    // Indicators
    // =========================================================================

    #[test]
    fn fetch_indicator_toggles() {
        let on = render_fetch_indicator(true);
        let off = render_fetch_indicator(false);
        assert!(on.iter().any(|c| matches!(c, DrawCommand::Rect { color, .. } if *color == Rgb::YELLOW)));
        assert!(!off.iter().any(|c| matches!(c, DrawCommand::Rect { color, .. } if *color == Rgb::YELLOW)));
    }

    #[test]
    fn message_overlays_without_clearing() {
        let frame = render_message("WiFi Failed!", ROW_START_Y + ROW_STEP, Rgb::RED);
        assert!(!frame.iter().any(|c| matches!(c, DrawCommand::Clear(_))));
        assert_eq!(texts(&frame), [("WiFi Failed!", Rgb::RED)]);
    }

    #[test]
    fn empty_progress_draws_only_background() {
        let frame = render_progress(0, 30);
        assert_eq!(frame.len(), 2);
    }

    // =========================================================================
    // Replay
    // =========================================================================

    #[test]
    fn apply_frame_replays_in_order() {
        let mut display = MockDisplay::new();
        let frame = render_fatal(10);
        apply_frame(&mut display, &frame).unwrap();
        assert_eq!(display.commands, frame);
        assert_eq!(display.presents, 1);
        assert!(display.has_text("10 errors in a row"));
    }
}
