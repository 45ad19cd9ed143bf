//! # echo-cli
//!
//! Command-line interface for the Echo bot.
//!
//! ## Commands
//!
//! - `echo-bot start`: Connect to Discord and serve commands
//! - `echo-bot chat`: Talk to the bot from the terminal
//! - `echo-bot recall`: Print recent Chronicle entries
//! - `echo-bot config`: Show the effective configuration
//! - `echo-bot init`: Write a starter echo.toml
//! - `echo-bot version`: Show version and build info

pub mod commands;

pub use commands::Cli;
