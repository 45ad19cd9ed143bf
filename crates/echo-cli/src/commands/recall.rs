use echo_chronicle::{ChronicleStore, LogEntry};
use echo_config::EchoConfig;

/// Print the Chronicle's most recent entries, oldest first.
pub(super) fn cmd_recall(
    config: &EchoConfig,
    limit: Option<usize>,
    json: bool,
) -> echo_core::Result<()> {
    let limit = limit.unwrap_or(config.recall.default_limit as usize);

    // Reading must not create the database as a side effect.
    let entries = if config.chronicle.db_path.exists() {
        ChronicleStore::from_config(&config.chronicle)?.recent(limit)?
    } else {
        Vec::new()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("The Chronicle is empty.");
        return Ok(());
    }

    println!("Chronicle ({} entries)", entries.len());
    println!("{}", "-".repeat(60));
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

fn format_entry(entry: &LogEntry) -> String {
    format!(
        "#{:<5} {}  {}: {}",
        entry.id,
        entry.display_time(),
        entry.author,
        entry.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_entry() {
        let entry = LogEntry {
            id: 7,
            timestamp: "2024-05-17T09:30:00.000000Z".into(),
            author: "bob#0001".into(),
            message: "Server restarted".into(),
        };
        assert_eq!(
            format_entry(&entry),
            "#7     2024-05-17 09:30:00 UTC  bob#0001: Server restarted"
        );
    }

    #[test]
    fn test_recall_missing_db_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EchoConfig::default();
        config.chronicle.db_path = dir.path().join("absent.db");

        cmd_recall(&config, Some(3), false).unwrap();
        assert!(!config.chronicle.db_path.exists());
    }
}
