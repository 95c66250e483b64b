//! SNTP wall clock for ESP32.

use crate::civil_time::UtcSeconds;
use crate::config::TimeConfig;
use crate::traits::TimeSync;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
use std::time::{SystemTime, UNIX_EPOCH};

const POLL_MS: u32 = 100;

/// SNTP client setting the system clock.
///
/// The service is started on the first [`sync`](TimeSync::sync) and keeps
/// resynchronizing in the background afterwards. Each `sync` call waits at
/// most `sync_timeout_ms` for the first answer.
pub struct Esp32Sntp {
    sntp: Option<EspSntp<'static>>,
    host: crate::config::ShortString,
    timeout_ms: u32,
    synced: bool,
}

impl Esp32Sntp {
    /// Creates an idle client; nothing is sent until `sync`.
    pub fn new(config: &TimeConfig) -> Self {
        Self {
            sntp: None,
            host: config.ntp_host.clone(),
            timeout_ms: config.sync_timeout_ms,
            synced: false,
        }
    }
}

impl TimeSync for Esp32Sntp {
    fn sync(&mut self) -> bool {
        if self.sntp.is_none() {
            let mut conf = SntpConf::default();
            conf.servers[0] = self.host.as_str();
            match EspSntp::new(&conf) {
                Ok(sntp) => {
                    log::info!("[NTP] Started against {}", self.host);
                    self.sntp = Some(sntp);
                }
                Err(e) => {
                    log::warn!("[NTP] Start failed: {}", e);
                    return false;
                }
            }
        }

        let Some(sntp) = &self.sntp else {
            return false;
        };
        let mut waited = 0;
        while waited < self.timeout_ms {
            if sntp.get_sync_status() == SyncStatus::Completed {
                self.synced = true;
                return true;
            }
            FreeRtos::delay_ms(POLL_MS);
            waited += POLL_MS;
        }
        self.synced = sntp.get_sync_status() == SyncStatus::Completed;
        self.synced
    }

    fn utc_now(&self) -> Option<UtcSeconds> {
        if !self.synced {
            return None;
        }
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs() as UtcSeconds)
    }
}
