//! Dispatcher tests: classify → one handler → one response, with fake
//! collaborators and an in-memory Chronicle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use echo_chronicle::ChronicleStore;
use echo_config::RecallConfig;
use echo_core::{Author, EchoError, EmbedColor, Event, Result};
use echo_runtime::handlers::{CHRONICLE_EMPTY, LOG_RECORDED, LOG_USAGE, SCRAPE_USAGE, TIME_USAGE};
use echo_runtime::{Dispatcher, OracleTime, TimeOracle, TitleFetcher};

// ── Fakes ──────────────────────────────────────────────────────

#[derive(Default)]
struct FakeTitles {
    fail_with: Option<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl TitleFetcher for FakeTitles {
    async fn fetch_title(&self, _url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(reason) => Err(EchoError::collaborator("scrape", reason)),
            None => Ok("Example Domain".into()),
        }
    }
}

#[derive(Default)]
struct FakeOracle {
    fail_with: Option<String>,
    calls: AtomicUsize,
}

#[async_trait]
impl TimeOracle for FakeOracle {
    async fn current_time(&self, timezone: &str) -> Result<OracleTime> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(reason) => Err(EchoError::collaborator("time oracle", reason)),
            None => Ok(OracleTime {
                timezone: timezone.into(),
                current_datetime: "2024-05-17 11:30:00".into(),
                current_timestamp_utc: "1715938200".into(),
            }),
        }
    }
}

struct Harness {
    dispatcher: Dispatcher,
    store: ChronicleStore,
    titles: Arc<FakeTitles>,
    oracle: Arc<FakeOracle>,
}

fn harness_with(titles: FakeTitles, oracle: FakeOracle) -> Harness {
    let store = ChronicleStore::open_in_memory().unwrap();
    let titles = Arc::new(titles);
    let oracle = Arc::new(oracle);
    let dispatcher = Dispatcher::new(
        store.clone(),
        titles.clone(),
        oracle.clone(),
        RecallConfig::default(),
    );
    Harness {
        dispatcher,
        store,
        titles,
        oracle,
    }
}

fn harness() -> Harness {
    harness_with(FakeTitles::default(), FakeOracle::default())
}

fn bob() -> Author {
    Author::new("1001", "bob#0001")
}

fn from(author: Author, text: &str) -> Event {
    Event::new(author, text)
}

// ── Routing ────────────────────────────────────────────────────

#[tokio::test]
async fn test_non_command_gets_no_response() {
    let h = harness();
    assert!(h.dispatcher.handle(&from(bob(), "hello there"), None).await.is_none());
    assert!(h.dispatcher.handle(&from(bob(), "PING"), None).await.is_none());
    assert_eq!(h.store.count().unwrap(), 0);
}

#[tokio::test]
async fn test_own_messages_are_ignored() {
    let h = harness();
    h.dispatcher.set_bot_identity("999");
    let me = Author::new("999", "Echo#0000");
    assert!(h.dispatcher.handle(&from(me.clone(), "!log loop"), None).await.is_none());
    assert!(h.dispatcher.handle(&from(me, "!ping"), None).await.is_none());
    assert_eq!(h.store.count().unwrap(), 0);
    assert!(h.dispatcher.handle(&from(bob(), "!ping"), None).await.is_some());
}

#[tokio::test]
async fn test_ping_reports_latency() {
    let h = harness();
    let r = h
        .dispatcher
        .handle(&from(bob(), "!ping"), Some(Duration::from_millis(120)))
        .await
        .unwrap();
    assert_eq!(r.as_text(), Some("Pong! System latency is 120.00ms."));
}

// ── Log & recall ───────────────────────────────────────────────

#[tokio::test]
async fn test_log_records_entry() {
    let h = harness();
    let r = h
        .dispatcher
        .handle(&from(bob(), "!log Server restarted"), None)
        .await
        .unwrap();
    assert_eq!(r.as_text(), Some(LOG_RECORDED));

    let entries = h.store.recent(5).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].author, "bob#0001");
    assert_eq!(entries[0].message, "Server restarted");
}

#[tokio::test]
async fn test_log_without_content_is_usage_error() {
    let h = harness();
    for text in ["!log", "!log   ", "!log\t"] {
        let r = h.dispatcher.handle(&from(bob(), text), None).await.unwrap();
        assert_eq!(r.as_text(), Some(LOG_USAGE), "input {text:?}");
    }
    assert_eq!(h.store.count().unwrap(), 0);
}

#[tokio::test]
async fn test_log_falls_back_to_author_id() {
    let h = harness();
    h.dispatcher
        .handle(&from(Author::new("1002", ""), "!log anonymous"), None)
        .await
        .unwrap();
    assert_eq!(h.store.recent(1).unwrap()[0].author, "1002");
}

#[tokio::test]
async fn test_recall_on_empty_chronicle() {
    let h = harness();
    let r = h.dispatcher.handle(&from(bob(), "!recall"), None).await.unwrap();
    assert_eq!(r.as_text(), Some(CHRONICLE_EMPTY));
    assert_eq!(h.store.count().unwrap(), 0);
}

#[tokio::test]
async fn test_recall_lists_recent_entries_oldest_first() {
    let h = harness();
    for i in 1..=7 {
        h.dispatcher
            .handle(&from(bob(), &format!("!log entry {i}")), None)
            .await
            .unwrap();
    }

    let r = h.dispatcher.handle(&from(bob(), "!recall 3"), None).await.unwrap();
    let embed = r.as_embed().expect("recall answers with an embed");
    assert_eq!(embed.title, "Chronicle Recall");
    assert_eq!(embed.color, EmbedColor::Purple);
    assert_eq!(embed.description.as_deref(), Some("Displaying the last 3 entries."));
    let values: Vec<&str> = embed.fields.iter().map(|f| f.value.as_str()).collect();
    assert_eq!(values, vec!["```entry 5```", "```entry 6```", "```entry 7```"]);
    assert!(embed.fields[0].name.starts_with("Logged by `bob#0001` at `"));

    let r = h.dispatcher.handle(&from(bob(), "!recall"), None).await.unwrap();
    assert_eq!(r.as_embed().unwrap().fields.len(), 5);
}

#[tokio::test]
async fn test_recall_limit_is_clamped() {
    let h = harness();
    for i in 1..=30 {
        h.store
            .append("bob#0001", &format!("entry {i}"), chrono::Utc::now())
            .unwrap();
    }

    let r = h.dispatcher.handle(&from(bob(), "!recall 100"), None).await.unwrap();
    let fields = &r.as_embed().unwrap().fields;
    assert_eq!(fields.len(), RecallConfig::default().max_limit as usize);
    assert_eq!(fields.last().unwrap().value, "```entry 30```");

}

#[tokio::test]
async fn test_recall_zero_shows_nothing() {
    let h = harness();
    for i in 1..=3 {
        h.store
            .append("bob#0001", &format!("e{i}"), chrono::Utc::now())
            .unwrap();
    }

    let r = h.dispatcher.handle(&from(bob(), "!recall 0"), None).await.unwrap();
    assert_eq!(r.as_text(), Some(CHRONICLE_EMPTY));
    assert_eq!(h.store.count().unwrap(), 3);
}

#[tokio::test]
async fn test_recall_does_not_mutate() {
    let h = harness();
    h.store.append("bob#0001", "only", chrono::Utc::now()).unwrap();
    h.dispatcher.handle(&from(bob(), "!recall"), None).await.unwrap();
    h.dispatcher.handle(&from(bob(), "!recall 1"), None).await.unwrap();
    assert_eq!(h.store.count().unwrap(), 1);
}

// ── Scrape & time ──────────────────────────────────────────────

#[tokio::test]
async fn test_scrape_reports_title() {
    let h = harness();
    let r = h
        .dispatcher
        .handle(&from(bob(), "!scrape https://example.com"), None)
        .await
        .unwrap();
    let embed = r.as_embed().unwrap();
    assert_eq!(embed.title, "Reconnaissance Report");
    assert_eq!(embed.color, EmbedColor::Blue);
    assert_eq!(embed.description.as_deref(), Some("Target: `https://example.com`"));
    assert_eq!(embed.fields[0].value, "```Example Domain```");
    assert_eq!(
        embed.footer.as_deref(),
        Some("Report generated by Echo for bob#0001")
    );
}

#[tokio::test]
async fn test_scrape_without_url_does_not_fetch() {
    let h = harness();
    let r = h.dispatcher.handle(&from(bob(), "!scrape"), None).await.unwrap();
    assert_eq!(r.as_text(), Some(SCRAPE_USAGE));

    let r = h
        .dispatcher
        .handle(&from(bob(), "!scrape file:///etc/passwd"), None)
        .await
        .unwrap();
    assert!(r.as_text().unwrap().contains("is not an http(s) URL"));
    assert_eq!(h.titles.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scrape_failure_is_reported() {
    let h = harness_with(
        FakeTitles {
            fail_with: Some("connection refused".into()),
            ..Default::default()
        },
        FakeOracle::default(),
    );
    let r = h
        .dispatcher
        .handle(&from(bob(), "!scrape https://unreachable.invalid"), None)
        .await
        .unwrap();
    assert_eq!(
        r.as_text(),
        Some("An error occurred during the scrape operation: `connection refused`")
    );
}

#[tokio::test]
async fn test_time_reports_oracle_answer() {
    let h = harness();
    let r = h
        .dispatcher
        .handle(&from(bob(), "!time Europe/Paris"), None)
        .await
        .unwrap();
    let embed = r.as_embed().unwrap();
    assert_eq!(embed.title, "Oracle Time Service");
    assert_eq!(embed.color, EmbedColor::Green);
    assert_eq!(embed.description.as_deref(), Some("Time information for `Europe/Paris`"));
    assert_eq!(embed.fields[0].value, "`2024-05-17 11:30:00`");
    assert_eq!(embed.fields[1].value, "`1715938200`");
}

#[tokio::test]
async fn test_time_usage_and_failure() {
    let h = harness_with(
        FakeTitles::default(),
        FakeOracle {
            fail_with: Some("HTTP status 500".into()),
            ..Default::default()
        },
    );
    let r = h.dispatcher.handle(&from(bob(), "!time"), None).await.unwrap();
    assert_eq!(r.as_text(), Some(TIME_USAGE));
    assert_eq!(h.oracle.calls.load(Ordering::SeqCst), 0);

    let r = h.dispatcher.handle(&from(bob(), "!time UTC"), None).await.unwrap();
    assert_eq!(
        r.as_text(),
        Some("An error occurred during the API query: `HTTP status 500`")
    );
}

// ── Concurrency ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logs_are_all_recorded() {
    let h = harness();
    let dispatcher = Arc::new(h.dispatcher);

    let mut tasks = Vec::new();
    for i in 0..20 {
        let d = dispatcher.clone();
        tasks.push(tokio::spawn(async move {
            let author = Author::new(format!("{i}"), format!("user{i}#0001"));
            d.handle(&Event::new(author, format!("!log message {i}")), None)
                .await
        }));
    }
    for t in tasks {
        assert_eq!(t.await.unwrap().unwrap().as_text(), Some(LOG_RECORDED));
    }

    let entries = h.store.recent(100).unwrap();
    assert_eq!(entries.len(), 20);
    let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, (1..=20).collect::<Vec<_>>());
}
