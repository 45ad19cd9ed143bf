use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration: maps to `echo.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    pub gateway: GatewayConfig,
    pub chronicle: ChronicleConfig,
    pub recall: RecallConfig,
    pub oracle: OracleConfig,
    pub scrape: ScrapeConfig,
    pub logging: LoggingConfig,
}

// ── Gateway ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Discord bot token.
    /// Can also be set via ECHO_DISCORD_TOKEN or DISCORD_TOKEN.
    /// Config file takes priority over environment variable.
    pub token: Option<String>,
    /// Gateway intents bitmask.
    /// Default: GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT.
    pub intents: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            token: None,
            intents: 37377,
        }
    }
}

// ── Chronicle ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChronicleConfig {
    /// Path to the SQLite database holding the `logs` table.
    pub db_path: PathBuf,
    /// Longest a store call may wait for the database before failing.
    pub lock_timeout_ms: u64,
}

impl ChronicleConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for ChronicleConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("chronicle.db"),
            lock_timeout_ms: 5_000,
        }
    }
}

// ── Recall ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    /// Entries printed by the `recall` CLI command when `-n` is not given.
    /// A bare `!recall` in chat always shows 5.
    pub default_limit: u64,
    /// Upper bound on entries shown by one `!recall`.
    pub max_limit: u64,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            max_limit: 20,
        }
    }
}

// ── Collaborators ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Base URL of the time oracle (`{api_url}/api/time/{timezone}`).
    /// Can also be set via ECHO_ORACLE_URL.
    pub api_url: Option<String>,
    pub timeout_secs: u64,
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub timeout_secs: u64,
    /// User-Agent header sent with page fetches.
    pub user_agent: String,
}

impl ScrapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "Seymore-Bawts-Echo-Probe/1.0".into(),
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Legacy ─────────────────────────────────────────────────────

/// The `config.json` format written for the first version of the bot.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LegacyConfig {
    pub token: Option<String>,
    pub oracle_api_url: Option<String>,
}

impl From<LegacyConfig> for EchoConfig {
    fn from(legacy: LegacyConfig) -> Self {
        let mut config = EchoConfig::default();
        config.gateway.token = legacy.token;
        config.oracle.api_url = legacy.oracle_api_url;
        config
    }
}

impl EchoConfig {
    /// Copy of this config that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.gateway.token.is_some() {
            copy.gateway.token = Some("********".into());
        }
        copy
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Error => "❌",
            WarningSeverity::Warning => "⚠️ ",
            WarningSeverity::Info => "💡",
        };
        write!(f, "{} {}: {}", icon, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl EchoConfig {
    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Gateway token ───
        match self.gateway.token.as_deref() {
            None => warnings.push(ConfigWarning {
                field: "gateway.token".into(),
                message: "no bot token configured, `start` will refuse to run".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Set gateway.token or export ECHO_DISCORD_TOKEN".into()),
            }),
            Some(t) if t.trim().is_empty() => warnings.push(ConfigWarning {
                field: "gateway.token".into(),
                message: "bot token is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Remove the key or set a real token".into()),
            }),
            Some(_) => {}
        }

        // ── Chronicle ───
        if self.chronicle.db_path.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                field: "chronicle.db_path".into(),
                message: "database path is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 'chronicle.db'".into()),
            });
        }
        if self.chronicle.lock_timeout_ms == 0 {
            warnings.push(ConfigWarning {
                field: "chronicle.lock_timeout_ms".into(),
                message: "lock timeout is 0, every contended write would fail".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 5000".into()),
            });
        }

        // ── Recall limits ───
        if self.recall.max_limit == 0 {
            warnings.push(ConfigWarning {
                field: "recall.max_limit".into(),
                message: "max_limit is 0, recall could never show an entry".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 20".into()),
            });
        } else if self.recall.default_limit == 0 || self.recall.default_limit > self.recall.max_limit {
            warnings.push(ConfigWarning {
                field: "recall.default_limit".into(),
                message: format!(
                    "default_limit {} is outside 1..={}",
                    self.recall.default_limit, self.recall.max_limit
                ),
                severity: WarningSeverity::Error,
                hint: Some("Keep default_limit between 1 and recall.max_limit".into()),
            });
        } else if self.recall.max_limit > 25 {
            warnings.push(ConfigWarning {
                field: "recall.max_limit".into(),
                message: format!("max_limit {} exceeds Discord's 25 fields per embed", self.recall.max_limit),
                severity: WarningSeverity::Warning,
                hint: Some("Large recalls will be rejected by Discord".into()),
            });
        }

        // ── Collaborators ───
        if self.oracle.api_url.is_none() {
            warnings.push(ConfigWarning {
                field: "oracle.api_url".into(),
                message: "no time oracle configured, `!time` will report an error".into(),
                severity: WarningSeverity::Info,
                hint: Some("Set oracle.api_url or export ECHO_ORACLE_URL".into()),
            });
        }
        if self.oracle.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                field: "oracle.timeout_secs".into(),
                message: "timeout is 0".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 10".into()),
            });
        }
        if self.scrape.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                field: "scrape.timeout_secs".into(),
                message: "timeout is 0".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 15".into()),
            });
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        // Check for hard errors
        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
