use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format used when showing an entry's time to people.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// One record of the Chronicle (a row of `logs`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    /// ISO-8601 UTC timestamp exactly as stored.
    pub timestamp: String,
    pub author: String,
    pub message: String,
}

impl LogEntry {
    /// Parse the stored timestamp. Accepts RFC 3339 as well as the offset-less
    /// form written by earlier versions of the bot, which is taken as UTC.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Human-readable UTC time, or the raw value when it cannot be parsed.
    pub fn display_time(&self) -> String {
        match self.recorded_at() {
            Some(dt) => dt.format(DISPLAY_FORMAT).to_string(),
            None => self.timestamp.clone(),
        }
    }
}
