//! 320x240 TFT with PWM backlight.
//!
//! Wraps any `embedded-graphics` draw target with `Rgb565` colour (the
//! ST7789 panel driven by `mipidsi` on the board) plus an LEDC channel for
//! the backlight.
//!
//! Font scales map to the bitmap fonts whose advance widths the presenter
//! budgets with:
//!
//! | Scale | Font |
//! |-------|------|
//! | 0-2 | 6x10 |
//! | 3 | 9x15 |
//! | 4+ | 10x20 |

use crate::traits::{BoardDisplay, Rgb};
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10, FONT_9X15},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use esp_idf_hal::ledc::LedcDriver;
use esp_idf_sys::EspError;

/// Failure from the panel or the backlight.
#[derive(Debug)]
pub enum Esp32DisplayError<E> {
    /// The draw target rejected a draw call.
    Draw(E),
    /// Setting the backlight duty failed.
    Backlight(EspError),
}

/// Board display: panel plus backlight.
///
/// # Example
///
/// ```ignore
/// let panel = mipidsi::Builder::new(mipidsi::models::ST7789, di)
///     .display_size(240, 320)
///     .init(&mut delay)?;
/// let mut display = Esp32Display::new(panel, backlight);
/// display.set_backlight(0.5)?;
/// ```
pub struct Esp32Display<'d, D> {
    panel: D,
    backlight: LedcDriver<'d>,
}

impl<'d, D> Esp32Display<'d, D>
where
    D: DrawTarget<Color = Rgb565>,
{
    /// Wraps an initialized panel and backlight channel.
    pub fn new(panel: D, backlight: LedcDriver<'d>) -> Self {
        Self { panel, backlight }
    }
}

fn to_rgb565(c: Rgb) -> Rgb565 {
    Rgb565::new(c.r >> 3, c.g >> 2, c.b >> 3)
}

fn font_for(scale: u8) -> &'static MonoFont<'static> {
    match scale {
        0..=2 => &FONT_6X10,
        3 => &FONT_9X15,
        _ => &FONT_10X20,
    }
}

impl<D> BoardDisplay for Esp32Display<'_, D>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: core::fmt::Debug,
{
    type Error = Esp32DisplayError<D::Error>;

    fn clear(&mut self, color: Rgb) -> Result<(), Self::Error> {
        self.panel
            .clear(to_rgb565(color))
            .map_err(Esp32DisplayError::Draw)
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        max_width: u32,
        scale: u8,
        color: Rgb,
    ) -> Result<(), Self::Error> {
        let font = font_for(scale);
        let style = MonoTextStyle::new(font, to_rgb565(color));
        let column = Rectangle::new(
            Point::new(x, y),
            Size::new(max_width, font.character_size.height),
        );
        Text::with_baseline(text, Point::new(x, y), style, Baseline::Top)
            .draw(&mut self.panel.clipped(&column))
            .map(|_| ())
            .map_err(Esp32DisplayError::Draw)
    }

    fn draw_rect(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Rgb,
    ) -> Result<(), Self::Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        Rectangle::new(Point::new(x, y), Size::new(width, height))
            .into_styled(PrimitiveStyle::with_fill(to_rgb565(color)))
            .draw(&mut self.panel)
            .map_err(Esp32DisplayError::Draw)
    }

    fn set_backlight(&mut self, level: f32) -> Result<(), Self::Error> {
        let max = self.backlight.get_max_duty();
        let duty = (level.clamp(0.0, 1.0) * max as f32) as u32;
        self.backlight
            .set_duty(duty)
            .map_err(Esp32DisplayError::Backlight)
    }

    fn present(&mut self) -> Result<(), Self::Error> {
        // the panel is written directly, nothing is buffered
        Ok(())
    }
}
