//! ESP-IDF task watchdog.

use crate::traits::Watchdog;
use esp_idf_sys::{esp, esp_err_t, EspError, ESP_ERR_INVALID_STATE};

/// Task watchdog subscribed for the calling task.
///
/// The watchdog panics (and so restarts the chip) if the subscribed task
/// does not feed it within the configured period.
///
/// # Example
///
/// ```ignore
/// use rs_departures::hal::esp32::Esp32Watchdog;
/// use rs_departures::traits::Watchdog;
///
/// let mut wdt = Esp32Watchdog::new(8_000)?;
/// loop {
///     wdt.feed();
///     // ... bounded work ...
/// }
/// ```
pub struct Esp32Watchdog {
    timeout_ms: u32,
}

impl Esp32Watchdog {
    /// Configures the task watchdog and subscribes the current task.
    ///
    /// If ESP-IDF already started the watchdog at boot, it is reconfigured
    /// with the new period instead.
    pub fn new(timeout_ms: u32) -> Result<Self, EspError> {
        let config = esp_idf_sys::esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // Safe: config outlives both calls, null subscribes the calling task
        unsafe {
            let err = esp_idf_sys::esp_task_wdt_init(&config);
            if err == ESP_ERR_INVALID_STATE as esp_err_t {
                esp!(esp_idf_sys::esp_task_wdt_reconfigure(&config))?;
            } else {
                esp!(err)?;
            }
            esp!(esp_idf_sys::esp_task_wdt_add(core::ptr::null_mut()))?;
        }
        log::info!("[WDT] Task watchdog armed, {} ms", timeout_ms);
        Ok(Self { timeout_ms })
    }

    /// Configured period.
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}

impl Watchdog for Esp32Watchdog {
    #[inline]
    fn feed(&mut self) {
        // Safe: resets the timer for the subscribed calling task
        unsafe {
            esp_idf_sys::esp_task_wdt_reset();
        }
    }

    fn reboot(&mut self) {
        log::error!("[WDT] Restarting");
        // Safe: never returns
        unsafe { esp_idf_sys::esp_restart() }
    }
}
