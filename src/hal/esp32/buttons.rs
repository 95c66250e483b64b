//! Four active-low push buttons.

use crate::traits::InputSource;
use embedded_hal::digital::InputPin;
use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver, Pull};
use esp_idf_sys::EspError;

/// The board's buttons: A, X and Y request a refresh, B cycles brightness.
///
/// Buttons connect the pin to GND, so a low level means pressed. A read
/// error counts as released.
///
/// Generic over the pin driver so any `embedded-hal` input works; on the
/// board this is [`PinDriver`] with the internal pull-up enabled.
pub struct Esp32Buttons<P> {
    a: P,
    b: P,
    x: P,
    y: P,
}

impl<'d> Esp32Buttons<PinDriver<'d, AnyIOPin, Input>> {
    /// Configures four GPIOs as inputs with pull-ups.
    pub fn new(a: AnyIOPin, b: AnyIOPin, x: AnyIOPin, y: AnyIOPin) -> Result<Self, EspError> {
        let input = |pin: AnyIOPin| -> Result<PinDriver<'d, AnyIOPin, Input>, EspError> {
            let mut driver = PinDriver::input(pin)?;
            driver.set_pull(Pull::Up)?;
            Ok(driver)
        };
        Ok(Self::from_pins(input(a)?, input(b)?, input(x)?, input(y)?))
    }
}

impl<P: InputPin> Esp32Buttons<P> {
    /// Wraps already configured input pins.
    pub fn from_pins(a: P, b: P, x: P, y: P) -> Self {
        Self { a, b, x, y }
    }
}

fn pressed<P: InputPin>(pin: &mut P) -> bool {
    pin.is_low().unwrap_or(false)
}

impl<P: InputPin> InputSource for Esp32Buttons<P> {
    fn is_refresh_requested(&mut self) -> bool {
        pressed(&mut self.a) || pressed(&mut self.x) || pressed(&mut self.y)
    }

    fn is_brightness_toggle_requested(&mut self) -> bool {
        pressed(&mut self.b)
    }
}
