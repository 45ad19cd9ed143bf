//! One handler per command. Each returns the response to send, or an error
//! the dispatcher turns into one.

use std::time::Duration;

use chrono::Utc;
use tracing::info;

use echo_chronicle::ChronicleStore;
use echo_config::RecallConfig;
use echo_core::{Author, EchoError, Embed, EmbedColor, Response, Result};

use crate::oracle::TimeOracle;
use crate::scrape::TitleFetcher;

pub const LOG_USAGE: &str = "Error: No message provided. Usage: `!log <your message>`";
pub const SCRAPE_USAGE: &str = "Error: No URL provided. Usage: `!scrape <URL>`";
pub const TIME_USAGE: &str = "Error: No timezone provided. Usage: `!time <Timezone>`";

pub const LOG_RECORDED: &str = "✅ Entry recorded in the Chronicle.";
pub const CHRONICLE_EMPTY: &str = "The Chronicle is empty.";

pub fn ping(latency: Option<Duration>) -> Response {
    match latency {
        Some(d) => Response::text(format!(
            "Pong! System latency is {:.2}ms.",
            d.as_secs_f64() * 1000.0
        )),
        None => Response::text("Pong! System latency is unknown."),
    }
}

pub async fn log(store: &ChronicleStore, author: &Author, content: &str) -> Result<Response> {
    let content = content.trim();
    if content.is_empty() {
        return Err(EchoError::Usage(LOG_USAGE.into()));
    }

    let entry = store
        .append_async(author.record_name().to_string(), content.to_string(), Utc::now())
        .await?;
    info!(id = entry.id, author = %entry.author, "logged new chronicle entry");
    Ok(Response::text(LOG_RECORDED))
}

/// Recall the most recent entries. The requested count is capped at
/// `max_limit`; `!recall 0` asks for nothing and gets the empty answer.
pub async fn recall(store: &ChronicleStore, limit: u64, config: &RecallConfig) -> Result<Response> {
    let n = limit.min(config.max_limit);
    let entries = store.recent_async(n as usize).await?;

    if entries.is_empty() {
        return Ok(Response::text(CHRONICLE_EMPTY));
    }

    let mut embed = Embed::new("Chronicle Recall", EmbedColor::Purple)
        .description(format!("Displaying the last {} entries.", entries.len()));
    for entry in &entries {
        embed = embed.field(
            format!("Logged by `{}` at `{}`", entry.author, entry.display_time()),
            format!("```{}```", entry.message),
        );
    }
    Ok(Response::embed(embed))
}

pub async fn scrape(fetcher: &dyn TitleFetcher, url: &str, author: &Author) -> Result<Response> {
    if url.is_empty() {
        return Err(EchoError::Usage(SCRAPE_USAGE.into()));
    }
    let parsed = url::Url::parse(url)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"));
    if parsed.is_none() {
        return Err(EchoError::Usage(format!(
            "Error: `{url}` is not an http(s) URL. Usage: `!scrape <URL>`"
        )));
    }

    let title = fetcher.fetch_title(url).await?;
    let embed = Embed::new("Reconnaissance Report", EmbedColor::Blue)
        .description(format!("Target: `{url}`"))
        .field("Page Title", format!("```{title}```"))
        .footer(format!("Report generated by Echo for {}", author.record_name()));
    Ok(Response::embed(embed))
}

pub async fn time(oracle: &dyn TimeOracle, timezone: &str, author: &Author) -> Result<Response> {
    if timezone.is_empty() {
        return Err(EchoError::Usage(TIME_USAGE.into()));
    }
    if !is_timezone_name(timezone) {
        return Err(EchoError::Usage(format!(
            "Error: `{timezone}` is not a timezone name. Usage: `!time <Timezone>`"
        )));
    }

    let t = oracle.current_time(timezone).await?;
    let embed = Embed::new("Oracle Time Service", EmbedColor::Green)
        .description(format!("Time information for `{}`", t.timezone))
        .field("Current Date & Time", format!("`{}`", t.current_datetime))
        .field("UTC Timestamp", format!("`{}`", t.current_timestamp_utc))
        .footer(format!("Query performed by Echo for {}", author.record_name()));
    Ok(Response::embed(embed))
}

/// IANA-style names only (`Europe/Paris`, `Etc/GMT+5`, `UTC`), so the value
/// is safe to place in a URL path.
fn is_timezone_name(tz: &str) -> bool {
    tz.len() <= 64
        && !tz.contains("..")
        && !tz.starts_with('/')
        && tz
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '/'))
}
