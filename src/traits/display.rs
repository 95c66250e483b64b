//! Display abstraction for the departure board.
//!
//! The board draws on a 320x240 canvas in absolute pixel coordinates. Text is
//! drawn with an integer font scale and a maximum width in pixels; the
//! implementation must clip anything beyond that width.

/// Canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 320;

/// Canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 240;

/// 24-bit RGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Creates a colour from its channels.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Text and flash colour.
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    /// Background.
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    /// Header bar.
    pub const BLUE: Rgb = Rgb::new(0, 0, 150);
    /// Delayed departures and error messages.
    pub const RED: Rgb = Rgb::new(200, 0, 0);
    /// On-time departures.
    pub const GREEN: Rgb = Rgb::new(0, 200, 0);
    /// Progress bar and fetch indicator.
    pub const YELLOW: Rgb = Rgb::new(255, 200, 0);
}

/// Bitmap display with backlight control.
///
/// Draw calls go to a back buffer (or straight to the panel, if the hardware
/// has no buffer); [`present`](Self::present) makes them visible.
///
/// # Example
///
/// ```rust,ignore
/// use rs_departures::traits::{BoardDisplay, Rgb};
///
/// fn splash<D: BoardDisplay>(display: &mut D) -> Result<(), D::Error> {
///     display.clear(Rgb::BLACK)?;
///     display.draw_text("Connecting to WiFi...", 10, 10, 240, 3, Rgb::WHITE)?;
///     display.present()
/// }
/// ```
pub trait BoardDisplay {
    /// Error type for display operations.
    type Error: core::fmt::Debug;

    /// Fills the whole canvas with `color`.
    fn clear(&mut self, color: Rgb) -> Result<(), Self::Error>;

    /// Draws `text` with its top-left corner at (`x`, `y`).
    ///
    /// Nothing is drawn past `x + max_width`.
    fn draw_text(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        max_width: u32,
        scale: u8,
        color: Rgb,
    ) -> Result<(), Self::Error>;

    /// Fills a rectangle. A zero width or height draws nothing.
    fn draw_rect(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Rgb,
    ) -> Result<(), Self::Error>;

    /// Sets backlight brightness, 0.0 (off) to 1.0 (full).
    fn set_backlight(&mut self, level: f32) -> Result<(), Self::Error>;

    /// Pushes pending draw calls to the panel.
    fn present(&mut self) -> Result<(), Self::Error>;
}
