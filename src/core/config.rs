//! Coordinator configuration.

use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::utils::{CompressorError, CompressorResult};

/// Upper bound on one worker round-trip.
pub const DEFAULT_WORKER_TIMEOUT_MS: u64 = 30_000;
/// Upper bound on one remote conversion round-trip.
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_AVIF_ENDPOINT: &str = "http://127.0.0.1:3001/api/convert-avif";
/// Largest payload (estimated from base64 length) the remote service accepts.
pub const REMOTE_MAX_PAYLOAD_BYTES: u64 = 10 * 1024 * 1024;

const ENV_SERVER_AVIF: &str = "IMAGE_COMPRESSOR_SERVER_AVIF";
const ENV_AVIF_ENDPOINT: &str = "IMAGE_COMPRESSOR_AVIF_ENDPOINT";
const ENV_WORKER_TIMEOUT: &str = "IMAGE_COMPRESSOR_WORKER_TIMEOUT_MS";
const ENV_REMOTE_TIMEOUT: &str = "IMAGE_COMPRESSOR_REMOTE_TIMEOUT_MS";

/// Settings for the optional server-side AVIF conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub max_payload_bytes: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_AVIF_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
            max_payload_bytes: REMOTE_MAX_PAYLOAD_BYTES,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Remote conversion enabled against `endpoint`.
    pub fn enabled_at(endpoint: impl Into<String>) -> Self {
        Self {
            enabled: true,
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoordinatorConfig {
    pub worker_timeout_ms: u64,
    pub remote: RemoteConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker_timeout_ms: DEFAULT_WORKER_TIMEOUT_MS,
            remote: RemoteConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn worker_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_timeout_ms)
    }

    /// Defaults overlaid with `IMAGE_COMPRESSOR_*` environment variables.
    pub fn from_env() -> CompressorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CompressorResult<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_SERVER_AVIF) {
            config.remote.enabled = parse_bool(ENV_SERVER_AVIF, &value)?;
        }
        if let Some(value) = lookup(ENV_AVIF_ENDPOINT) {
            if value.trim().is_empty() {
                return Err(CompressorError::config(format!("{ENV_AVIF_ENDPOINT} is empty")));
            }
            config.remote.endpoint = value.trim().to_string();
        }
        if let Some(value) = lookup(ENV_WORKER_TIMEOUT) {
            config.worker_timeout_ms = parse_millis(ENV_WORKER_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_REMOTE_TIMEOUT) {
            config.remote.timeout_ms = parse_millis(ENV_REMOTE_TIMEOUT, &value)?;
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> CompressorResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(CompressorError::config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

fn parse_millis(key: &str, value: &str) -> CompressorResult<u64> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(CompressorError::config(format!("{key} must be greater than zero"))),
        Ok(ms) => Ok(ms),
        Err(e) => Err(CompressorError::config(format!("{key}: {e}"))),
    }
}
