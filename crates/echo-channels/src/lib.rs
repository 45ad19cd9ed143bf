//! # echo-channels
//!
//! Channel adapters. Each adapter bridges a chat surface to the Echo
//! dispatcher: it turns platform messages into [`echo_core::Event`]s and
//! delivers [`echo_core::Response`]s back to where the message came from.
//!
//! Adapters implement the [`Channel`] trait.
//!
//! | Channel | Use                                              |
//! |---------|--------------------------------------------------|
//! | Discord | Gateway WebSocket for events, REST for replies   |
//! | Console | stdin/stdout, for running the bot locally        |
//!
//! Connection management (heartbeats, reconnects, identify) lives entirely in
//! the adapter; the dispatcher only sees events and produces responses.

pub mod adapter;
pub mod console;
pub mod discord;

pub use adapter::{Channel, ChannelEvent, IncomingMessage, OutgoingMessage};
