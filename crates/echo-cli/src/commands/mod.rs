use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use echo_config::{ConfigLoader, EchoConfig};
use echo_core::EchoError;

mod chat;
mod recall;
mod start;

/// Echo: Discord bot with a durable Chronicle log
#[derive(Parser, Debug)]
#[command(name = "echo-bot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to echo.toml (or a legacy config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to Discord and answer commands until Ctrl+C
    Start,
    /// Send commands from the terminal, one per line
    Chat,
    /// Print the most recent Chronicle entries
    Recall {
        /// Number of entries (defaults to recall.default_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration (token redacted)
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a starter echo.toml
    Init {
        /// Create in the current directory instead of ~/.echo/
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show version and build info
    Version,
}

impl Cli {
    pub async fn run(self) -> echo_core::Result<()> {
        // These never need the config, and init must work when it is broken.
        match self.command {
            Commands::Version => return Self::cmd_version(),
            Commands::Init { local, force } => {
                let path = init_path(self.config.as_deref(), local);
                return Self::cmd_init(&path, force);
            }
            _ => {}
        }

        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get().clone();

        // --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level
                .as_deref()
                .unwrap_or(config.logging.level.as_str())
        };
        init_tracing(log_level, &config.logging.format);
        tracing::debug!(path = %config_loader.path().display(), "configuration loaded");
        config_loader.log_warnings();

        match self.command {
            Commands::Start => start::cmd_start(config).await,
            Commands::Chat => chat::cmd_chat(config).await,
            Commands::Recall { limit, json } => recall::cmd_recall(&config, limit, json),
            Commands::Config { json } => Self::cmd_config(&config, config_loader.path(), json),
            Commands::Init { .. } | Commands::Version => Ok(()),
        }
    }

    fn cmd_config(config: &EchoConfig, path: &Path, json: bool) -> echo_core::Result<()> {
        let config = config.redacted();
        if json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!("# {}", path.display());
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| EchoError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn cmd_init(path: &Path, force: bool) -> echo_core::Result<()> {
        if path.exists() && !force {
            println!("⚠️  {} already exists", path.display());
            println!("   Pass --force to overwrite it.");
            return Ok(());
        }
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, ConfigLoader::default_toml())?;
        println!("✅ Wrote {}", path.display());
        println!("   Set gateway.token (or DISCORD_TOKEN) and run 'echo-bot start'.");
        Ok(())
    }

    fn cmd_version() -> echo_core::Result<()> {
        println!("Echo v{}", env!("CARGO_PKG_VERSION"));
        println!("   Rust edition: 2024");
        println!("   Target: {}", std::env::consts::ARCH);
        println!("   OS: {}", std::env::consts::OS);
        #[cfg(debug_assertions)]
        println!("   Profile: debug");
        #[cfg(not(debug_assertions))]
        println!("   Profile: release");
        Ok(())
    }
}

/// Where `init` writes: the global `--config` path if given, else
/// `./echo.toml` with `--local`, else `~/.echo/echo.toml`.
fn init_path(explicit: Option<&Path>, local: bool) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if local {
        return PathBuf::from("echo.toml");
    }
    dirs::home_dir()
        .map(|home| home.join(".echo").join("echo.toml"))
        .unwrap_or_else(|| PathBuf::from("echo.toml"))
}

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(level: &str, format: &str) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level))
    };

    match format {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .json()
            .with_target(true)
            .init(),
        "compact" => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .compact()
            .with_target(false)
            .init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .init(),
    }
}
