use serde::{Deserialize, Serialize};

/// Number of entries `!recall` shows when no usable count is given.
pub const DEFAULT_RECALL_LIMIT: u64 = 5;

/// Length of the literal `!log` token plus its separator.
const LOG_PREFIX_CHARS: usize = 5;

/// The intent behind an inbound message.
///
/// Arguments are captured as-is; checking that a URL or timezone is usable is
/// left to the handler that consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Ping,
    Scrape { url: String },
    Time { timezone: String },
    Log { content: String },
    Recall { limit: u64 },
    NoMatch,
}

impl Command {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Scrape { .. } => "scrape",
            Self::Time { .. } => "time",
            Self::Log { .. } => "log",
            Self::Recall { .. } => "recall",
            Self::NoMatch => "none",
        }
    }
}

/// Classify raw message text into a [`Command`].
///
/// Prefixes are case-sensitive and checked in a fixed order: `!ping`,
/// `!scrape`, `!time`, `!log`, `!recall`. The first match wins, so `!logbook`
/// is still a `!log`. Never fails; text that matches nothing is `NoMatch`.
pub fn classify(text: &str) -> Command {
    if text.starts_with("!ping") {
        Command::Ping
    } else if text.starts_with("!scrape") {
        Command::Scrape {
            url: second_token(text).to_string(),
        }
    } else if text.starts_with("!time") {
        Command::Time {
            timezone: second_token(text).to_string(),
        }
    } else if text.starts_with("!log") {
        Command::Log {
            content: log_content(text).to_string(),
        }
    } else if text.starts_with("!recall") {
        Command::Recall {
            limit: parse_limit(second_token(text)),
        }
    } else {
        Command::NoMatch
    }
}

fn second_token(text: &str) -> &str {
    text.split_whitespace().nth(1).unwrap_or("")
}

/// Everything after the first five characters, trimmed.
fn log_content(text: &str) -> &str {
    match text.char_indices().nth(LOG_PREFIX_CHARS) {
        Some((offset, _)) => text[offset..].trim(),
        None => "",
    }
}

/// Digits-only tokens become the limit (saturating on overflow); anything
/// else falls back to the default.
fn parse_limit(token: &str) -> u64 {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return DEFAULT_RECALL_LIMIT;
    }
    token.parse().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping() {
        assert_eq!(classify("!ping"), Command::Ping);
        assert_eq!(classify("!ping extra words"), Command::Ping);
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        assert_eq!(classify("!PING"), Command::NoMatch);
        assert_eq!(classify("!Log hello"), Command::NoMatch);
    }

    #[test]
    fn test_prefix_must_start_the_text() {
        assert_eq!(classify(" !ping"), Command::NoMatch);
        assert_eq!(classify("hello !log x"), Command::NoMatch);
        assert_eq!(classify(""), Command::NoMatch);
    }

    #[test]
    fn test_scrape_takes_second_token() {
        assert_eq!(
            classify("!scrape https://example.com trailing"),
            Command::Scrape { url: "https://example.com".into() }
        );
    }

    #[test]
    fn test_scrape_without_argument_is_empty() {
        assert_eq!(classify("!scrape"), Command::Scrape { url: String::new() });
        assert_eq!(classify("!scrape   "), Command::Scrape { url: String::new() });
    }

    #[test]
    fn test_time_takes_second_token() {
        assert_eq!(
            classify("!time   America/New_York"),
            Command::Time { timezone: "America/New_York".into() }
        );
        assert_eq!(classify("!time"), Command::Time { timezone: String::new() });
    }

    #[test]
    fn test_log_content_is_trimmed() {
        assert_eq!(
            classify("!log Server restarted  "),
            Command::Log { content: "Server restarted".into() }
        );
        assert_eq!(
            classify("!log    spaced   out "),
            Command::Log { content: "spaced   out".into() }
        );
    }

    #[test]
    fn test_log_blank_content() {
        assert_eq!(classify("!log"), Command::Log { content: String::new() });
        assert_eq!(classify("!log   "), Command::Log { content: String::new() });
    }

    #[test]
    fn test_log_drops_first_five_characters() {
        // The separator position is consumed even when it is not whitespace.
        assert_eq!(classify("!logbook entry"), Command::Log { content: "ook entry".into() });
        assert_eq!(classify("!log\u{e9}t\u{e9}"), Command::Log { content: "t\u{e9}".into() });
    }

    #[test]
    fn test_log_preserves_inner_text() {
        assert_eq!(
            classify("!log line one\nline `two`"),
            Command::Log { content: "line one\nline `two`".into() }
        );
    }

    #[test]
    fn test_recall_default_limit() {
        assert_eq!(classify("!recall"), Command::Recall { limit: DEFAULT_RECALL_LIMIT });
    }

    #[test]
    fn test_recall_numeric_limit() {
        assert_eq!(classify("!recall 12"), Command::Recall { limit: 12 });
        assert_eq!(classify("!recall 0"), Command::Recall { limit: 0 });
    }

    #[test]
    fn test_recall_non_digit_uses_default() {
        assert_eq!(classify("!recall abc"), Command::Recall { limit: 5 });
        assert_eq!(classify("!recall -3"), Command::Recall { limit: 5 });
        assert_eq!(classify("!recall 4x"), Command::Recall { limit: 5 });
    }

    #[test]
    fn test_recall_overflow_saturates() {
        assert_eq!(
            classify("!recall 999999999999999999999999"),
            Command::Recall { limit: u64::MAX }
        );
    }

    #[test]
    fn test_priority_order() {
        // "!log" is checked before "!recall"; neither shadows the other.
        assert!(matches!(classify("!logrecall"), Command::Log { .. }));
        assert!(matches!(classify("!recall !log"), Command::Recall { .. }));
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Command::Ping.name(), "ping");
        assert_eq!(Command::NoMatch.name(), "none");
        assert_eq!(classify("!recall").name(), "recall");
    }
}
