//! Client configuration.
//!
//! Plain serde struct so hosts can load it from JSON alongside their own
//! settings. Every field has a default; timeouts default to "block forever".

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HttpError, Result};

pub const DEFAULT_MAX_HEAD_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Per-address connect timeout.
    pub connect_timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    /// Limit for the status line plus header block of a response.
    pub max_head_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: None,
            read_timeout_ms: None,
            write_timeout_ms: None,
            max_head_bytes: DEFAULT_MAX_HEAD_BYTES,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).map_err(|e| HttpError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Zero durations are rejected: the socket layer treats them as errors.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
        ] {
            if value == Some(0) {
                return Err(HttpError::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.max_head_bytes == 0 {
            return Err(HttpError::Config("max_head_bytes must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }
}
