use std::path::{Path, PathBuf};
use tracing::warn;

use crate::schema::{EchoConfig, LegacyConfig};

/// Loads the Echo configuration once at startup.
pub struct ConfigLoader {
    config: EchoConfig,
    config_path: PathBuf,
    warnings: Vec<String>,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > ECHO_CONFIG env > ./echo.toml > ~/.echo/echo.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("ECHO_CONFIG") {
            return PathBuf::from(p);
        }
        let local = PathBuf::from("echo.toml");
        if local.exists() {
            return local;
        }
        dirs::home_dir()
            .map(|home| home.join(".echo").join("echo.toml"))
            .unwrap_or(local)
    }

    /// Load the config from disk, falling back to defaults.
    ///
    /// Loading usually happens before logging is set up, so warnings are
    /// kept on the loader. Call [`ConfigLoader::log_warnings`] once a
    /// subscriber is installed.
    pub fn load(path: Option<&Path>) -> echo_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let mut warnings = Vec::new();
        let config = if config_path.exists() {
            let raw = std::fs::read_to_string(&config_path)?;
            Self::parse(&config_path, &raw)?
        } else {
            warnings.push(format!(
                "config file {} not found, using defaults",
                config_path.display()
            ));
            EchoConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        // Validate config: keep warnings, fail on errors
        let found = config.validate().map_err(echo_core::EchoError::Config)?;
        warnings.extend(found.iter().map(ToString::to_string));

        Ok(Self {
            config,
            config_path,
            warnings,
        })
    }

    /// Parse raw file contents. `.json` files use the legacy `config.json`
    /// layout; everything else is TOML.
    pub fn parse(path: &Path, raw: &str) -> echo_core::Result<EchoConfig> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            let legacy: LegacyConfig = serde_json::from_str(raw).map_err(|e| {
                echo_core::EchoError::Config(format!("failed to parse {}: {}", path.display(), e))
            })?;
            return Ok(legacy.into());
        }
        toml::from_str::<EchoConfig>(raw).map_err(|e| {
            echo_core::EchoError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// The loaded configuration.
    pub fn get(&self) -> &EchoConfig {
        &self.config
    }

    /// Non-fatal problems found while loading.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Emit the collected warnings through `tracing`.
    pub fn log_warnings(&self) {
        for w in &self.warnings {
            warn!("{}", w);
        }
    }

    /// Path the configuration was read from (or would have been).
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (ECHO_CHRONICLE_PATH, ECHO_LOG_LEVEL, etc.)
    fn apply_env_overrides(config: EchoConfig) -> EchoConfig {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(mut config: EchoConfig, lookup: F) -> EchoConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ECHO_CHRONICLE_PATH") {
            config.chronicle.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ECHO_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = lookup("ECHO_LOG_FORMAT") {
            config.logging.format = v;
        }
        // Secrets: env var fills in when config file doesn't have the key set.
        if config.gateway.token.is_none() {
            config.gateway.token = lookup("ECHO_DISCORD_TOKEN").or_else(|| lookup("DISCORD_TOKEN"));
        }
        if config.oracle.api_url.is_none() {
            config.oracle.api_url = lookup("ECHO_ORACLE_URL");
        }
        config
    }

    /// A commented starter `echo.toml`.
    pub fn default_toml() -> String {
        let defaults = EchoConfig::default();
        format!(
            r#"# Echo configuration

[gateway]
# token = "YOUR_BOT_TOKEN"     # or export ECHO_DISCORD_TOKEN
intents = {intents}

[chronicle]
db_path = "{db_path}"
lock_timeout_ms = {lock_timeout_ms}

[recall]
default_limit = {default_limit}
max_limit = {max_limit}

[oracle]
# api_url = "http://localhost:8000"   # or export ECHO_ORACLE_URL
timeout_secs = {oracle_timeout}

[scrape]
timeout_secs = {scrape_timeout}
user_agent = "{user_agent}"

[logging]
level = "{level}"
format = "{format}"
"#,
            intents = defaults.gateway.intents,
            db_path = defaults.chronicle.db_path.display(),
            lock_timeout_ms = defaults.chronicle.lock_timeout_ms,
            default_limit = defaults.recall.default_limit,
            max_limit = defaults.recall.max_limit,
            oracle_timeout = defaults.oracle.timeout_secs,
            scrape_timeout = defaults.scrape.timeout_secs,
            user_agent = defaults.scrape.user_agent,
            level = defaults.logging.level,
            format = defaults.logging.format,
        )
    }
}
