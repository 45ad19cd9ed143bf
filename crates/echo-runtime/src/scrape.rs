use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use echo_config::ScrapeConfig;
use echo_core::{EchoError, Result};

/// Shown when a page has no usable `<title>`.
pub const NO_TITLE: &str = "No Title Found";

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title(?:\s[^>]*)?>(.*?)</title\s*>").expect("title regex is valid")
});

/// Fetches a web page and reports its title.
#[async_trait]
pub trait TitleFetcher: Send + Sync {
    async fn fetch_title(&self, url: &str) -> Result<String>;
}

/// [`TitleFetcher`] over HTTP.
pub struct HttpTitleFetcher {
    client: reqwest::Client,
}

impl HttpTitleFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(|e| EchoError::Config(format!("failed to build scrape client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TitleFetcher for HttpTitleFetcher {
    async fn fetch_title(&self, url: &str) -> Result<String> {
        debug!(url, "fetching page title");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EchoError::collaborator("scrape", e))?;
        let body = resp
            .text()
            .await
            .map_err(|e| EchoError::collaborator("scrape", e))?;
        Ok(extract_title(&body).unwrap_or_else(|| NO_TITLE.to_string()))
    }
}

/// Text of the first `<title>` element, whitespace-collapsed and with common
/// entities decoded. `None` if the element is missing or blank.
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = decode_entities(&raw.split_whitespace().collect::<Vec<_>>().join(" "));
    let title = title.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
