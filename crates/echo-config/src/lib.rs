//! # echo-config
//!
//! Configuration for the Echo bot. Reads `echo.toml` (or the legacy
//! `config.json`), then applies environment variable overrides. The result is
//! built once at startup and handed to every constructor that needs it.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    ChronicleConfig, ConfigWarning, EchoConfig, GatewayConfig, LoggingConfig, OracleConfig,
    RecallConfig, ScrapeConfig, WarningSeverity,
};
