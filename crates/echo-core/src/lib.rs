//! # echo-core
//!
//! Shared vocabulary for the Echo bot: the inbound [`Event`], the classified
//! [`Command`], the outbound [`Response`], and the unified [`EchoError`].
//! Every other crate in the workspace builds on these types.

pub mod command;
pub mod error;
pub mod event;
pub mod response;

pub use command::{Command, DEFAULT_RECALL_LIMIT, classify};
pub use error::{EchoError, Result};
pub use event::{Author, Event};
pub use response::{Embed, EmbedColor, EmbedField, Response};
