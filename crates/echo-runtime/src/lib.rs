//! # echo-runtime
//!
//! The part of Echo with real behaviour: the [`Dispatcher`] that classifies
//! each inbound event and runs exactly one handler for it, the handlers
//! themselves, the HTTP collaborators they call, and the [`EchoRuntime`]
//! event loop that feeds channel events through the dispatcher concurrently.

pub mod dispatcher;
pub mod handlers;
pub mod oracle;
pub mod runtime;
pub mod scrape;

pub use dispatcher::Dispatcher;
pub use oracle::{HttpTimeOracle, OracleTime, TimeOracle};
pub use runtime::EchoRuntime;
pub use scrape::{HttpTitleFetcher, TitleFetcher};
