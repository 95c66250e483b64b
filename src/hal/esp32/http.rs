//! HTTPS departure source for ESP32.
//!
//! One GET per fetch against the configured endpoint, using the ESP-IDF
//! certificate bundle for TLS. The body is decoded with
//! [`decode_payload`](crate::departure::decode_payload).

use alloc::vec::Vec;
use core::time::Duration;

use crate::config::{LongString, SourceConfig};
use crate::departure::{decode_payload, RawDeparture};
use crate::traits::{DepartureSource, FetchError};
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::Read;

/// Upper bound on the response body.
pub const MAX_BODY_BYTES: usize = 32 * 1024;

/// Departure source backed by the ESP-IDF HTTP client.
pub struct Esp32HttpSource {
    endpoint: LongString,
    timeout: Duration,
}

impl Esp32HttpSource {
    /// Creates a source for the configured endpoint.
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_millis(config.request_timeout_ms as u64),
        }
    }

    fn get(&self) -> Result<Vec<u8>, FetchError> {
        let mut conn = EspHttpConnection::new(&Configuration {
            timeout: Some(self.timeout),
            crt_bundle_attach: Some(esp_idf_sys::esp_crt_bundle_attach),
            ..Default::default()
        })
        .map_err(|e| {
            log::warn!("[API] Client init failed: {}", e);
            FetchError::Transport
        })?;

        conn.initiate_request(Method::Get, &self.endpoint, &[("accept", "application/json")])
            .map_err(|e| {
                log::warn!("[API] Request failed: {}", e);
                FetchError::Transport
            })?;
        conn.initiate_response().map_err(|e| {
            log::warn!("[API] No response: {}", e);
            FetchError::Transport
        })?;

        let status = conn.status();
        if !(200..300).contains(&status) {
            return Err(FetchError::Status(status));
        }

        let mut body = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = conn.read(&mut buf).map_err(|e| {
                log::warn!("[API] Read failed: {}", e);
                FetchError::Transport
            })?;
            if n == 0 {
                break;
            }
            if body.len() + n > MAX_BODY_BYTES {
                log::warn!("[API] Body exceeds {} bytes", MAX_BODY_BYTES);
                return Err(FetchError::Decode);
            }
            body.extend_from_slice(&buf[..n]);
        }
        Ok(body)
    }
}

impl DepartureSource for Esp32HttpSource {
    fn fetch(&mut self) -> Result<Vec<RawDeparture>, FetchError> {
        let body = self.get()?;
        decode_payload(&body)
    }
}
