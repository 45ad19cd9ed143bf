use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use echo_chronicle::ChronicleStore;
use echo_config::{EchoConfig, RecallConfig};
use echo_core::{Author, Command, EchoError, Event, Response, classify};

use crate::handlers;
use crate::oracle::{HttpTimeOracle, TimeOracle};
use crate::scrape::{HttpTitleFetcher, TitleFetcher};

const LOG_FAILED: &str = "❌ Error: Could not record entry in the Chronicle.";
const RECALL_FAILED: &str = "❌ Error: Could not recall entries from the Chronicle.";

/// Routes each inbound event to exactly one handler and turns the outcome,
/// success or failure, into at most one response.
///
/// The dispatcher holds no per-event state, so `handle` can run for many
/// events at once.
pub struct Dispatcher {
    store: ChronicleStore,
    titles: Arc<dyn TitleFetcher>,
    oracle: Arc<dyn TimeOracle>,
    recall: RecallConfig,
    bot_identity: RwLock<Option<String>>,
}

impl Dispatcher {
    pub fn new(
        store: ChronicleStore,
        titles: Arc<dyn TitleFetcher>,
        oracle: Arc<dyn TimeOracle>,
        recall: RecallConfig,
    ) -> Self {
        Self {
            store,
            titles,
            oracle,
            recall,
            bot_identity: RwLock::new(None),
        }
    }

    /// Build a dispatcher with the HTTP collaborators described by `config`.
    pub fn from_config(config: &EchoConfig, store: ChronicleStore) -> echo_core::Result<Self> {
        let titles = HttpTitleFetcher::new(&config.scrape)?;
        let oracle = HttpTimeOracle::new(&config.oracle)?;
        Ok(Self::new(
            store,
            Arc::new(titles),
            Arc::new(oracle),
            config.recall.clone(),
        ))
    }

    /// Record the bot's own user id; its messages are ignored from then on.
    pub fn set_bot_identity(&self, id: impl Into<String>) {
        *self.bot_identity.write() = Some(id.into());
    }

    pub fn is_own(&self, author: &Author) -> bool {
        self.bot_identity.read().as_deref() == Some(author.id.as_str())
    }

    /// Handle one event. `latency` is the originating gateway's current
    /// round-trip estimate, reported by `!ping`.
    ///
    /// Returns `None` for the bot's own messages and for text that is not a
    /// command. Never fails: handler errors become error responses.
    pub async fn handle(&self, event: &Event, latency: Option<Duration>) -> Option<Response> {
        if self.is_own(&event.author) {
            return None;
        }

        let command = classify(&event.text);
        debug!(command = command.name(), author = %event.author.display, "dispatching");

        let result = match &command {
            Command::NoMatch => return None,
            Command::Ping => Ok(handlers::ping(latency)),
            Command::Scrape { url } => {
                handlers::scrape(self.titles.as_ref(), url, &event.author).await
            }
            Command::Time { timezone } => {
                handlers::time(self.oracle.as_ref(), timezone, &event.author).await
            }
            Command::Log { content } => handlers::log(&self.store, &event.author, content).await,
            Command::Recall { limit } => handlers::recall(&self.store, *limit, &self.recall).await,
        };

        Some(match result {
            Ok(response) => response,
            Err(e) => failure_response(&command, &e),
        })
    }
}

/// The user-visible answer for a failed command. Also decides how loudly the
/// failure is reported to operators.
fn failure_response(command: &Command, err: &EchoError) -> Response {
    match err {
        EchoError::Usage(message) => {
            debug!(command = command.name(), "usage error");
            Response::text(message.clone())
        }
        e if e.is_store_error() => {
            error!(command = command.name(), error = %e, "chronicle operation failed");
            match command {
                Command::Recall { .. } => Response::text(RECALL_FAILED),
                _ => Response::text(LOG_FAILED),
            }
        }
        EchoError::Collaborator { reason, .. } => {
            warn!(command = command.name(), error = %err, "collaborator call failed");
            match command {
                Command::Time { .. } => {
                    Response::text(format!("An error occurred during the API query: `{reason}`"))
                }
                _ => Response::text(format!(
                    "An error occurred during the scrape operation: `{reason}`"
                )),
            }
        }
        e => {
            error!(command = command.name(), error = %e, "command failed");
            Response::text(format!("❌ Error: `!{}` failed: {e}", command.name()))
        }
    }
}
