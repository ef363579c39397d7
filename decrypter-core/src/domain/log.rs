//! Log domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A progress line reported by the solver
///
/// The service stamps each line with fractional seconds since the epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "t")]
    pub timestamp: f64,
    #[serde(rename = "msg")]
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: f64, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    /// Converts the raw timestamp into a UTC instant
    ///
    /// Returns `None` for values chrono cannot represent (NaN, out of range).
    pub fn time(&self) -> Option<DateTime<Utc>> {
        if !self.timestamp.is_finite() {
            return None;
        }
        let secs = self.timestamp.floor();
        let nanos = ((self.timestamp - secs) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }
}
