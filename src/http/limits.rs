use std::time::Duration;

use serde::Deserialize;

/// Caps applied while reading one request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Request line, header section and trailer section, in bytes.
    pub max_header_bytes: usize,
    /// Decoded body size, in bytes.
    pub max_body_bytes: usize,
    /// Time allowed to receive a whole request. `None` waits forever.
    pub read_timeout_secs: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_header_bytes: 64 * 1024,
            max_body_bytes: 10 * 1024 * 1024,
            read_timeout_secs: Some(30),
        }
    }
}

impl Limits {
    pub fn unlimited() -> Self {
        Self {
            max_header_bytes: usize::MAX,
            max_body_bytes: usize::MAX,
            read_timeout_secs: None,
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }
}
