use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The identity behind an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Platform-stable identifier (e.g. a Discord snowflake).
    pub id: String,
    /// Stable display string, recorded as the `user` of Chronicle entries.
    pub display: String,
}

impl Author {
    pub fn new(id: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display: display.into(),
        }
    }

    /// Name used when recording this author. Falls back to the id when the
    /// platform supplied no usable display string.
    pub fn record_name(&self) -> &str {
        if self.display.trim().is_empty() {
            &self.id
        } else {
            &self.display
        }
    }
}

/// One inbound message, immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub author: Author,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl Event {
    /// Build an event stamped with the current time.
    pub fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            author,
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}
