use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use echo_config::OracleConfig;
use echo_core::{EchoError, Result};

const COLLABORATOR: &str = "time oracle";

/// What the time oracle reports for one timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleTime {
    pub timezone: String,
    pub current_datetime: String,
    pub current_timestamp_utc: String,
}

impl OracleTime {
    /// Read the oracle's JSON body. Every field must be present; numbers are
    /// accepted wherever a string is expected.
    pub fn from_json(data: &Value) -> Result<Self> {
        Ok(Self {
            timezone: field(data, "timezone")?,
            current_datetime: field(data, "current_datetime")?,
            current_timestamp_utc: field(data, "current_timestamp_utc")?,
        })
    }
}

fn field(data: &Value, key: &str) -> Result<String> {
    match &data[key] {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err(EchoError::collaborator(
            COLLABORATOR,
            format!("response is missing `{key}`"),
        )),
        other => Err(EchoError::collaborator(
            COLLABORATOR,
            format!("unexpected value for `{key}`: {other}"),
        )),
    }
}

/// Looks up the current time in a timezone.
#[async_trait]
pub trait TimeOracle: Send + Sync {
    async fn current_time(&self, timezone: &str) -> Result<OracleTime>;
}

/// [`TimeOracle`] backed by the oracle's HTTP API (`GET {base}/api/time/{timezone}`).
pub struct HttpTimeOracle {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpTimeOracle {
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EchoError::Config(format!("failed to build oracle client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }

    pub fn endpoint(&self, timezone: &str) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|base| format!("{}/api/time/{}", base.trim_end_matches('/'), timezone))
    }
}

#[async_trait]
impl TimeOracle for HttpTimeOracle {
    async fn current_time(&self, timezone: &str) -> Result<OracleTime> {
        let url = self
            .endpoint(timezone)
            .ok_or_else(|| EchoError::collaborator(COLLABORATOR, "no oracle API URL configured"))?;
        debug!(%url, "querying time oracle");

        let data: Value = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| EchoError::collaborator(COLLABORATOR, e))?
            .json()
            .await
            .map_err(|e| EchoError::collaborator(COLLABORATOR, e))?;

        OracleTime::from_json(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let data = json!({
            "timezone": "Europe/Paris",
            "current_datetime": "2024-05-17 11:30:00",
            "current_timestamp_utc": 1715938200
        });
        let t = OracleTime::from_json(&data).unwrap();
        assert_eq!(t.timezone, "Europe/Paris");
        assert_eq!(t.current_timestamp_utc, "1715938200");
    }

    #[test]
    fn test_missing_field_is_collaborator_error() {
        let data = json!({ "timezone": "UTC" });
        let err = OracleTime::from_json(&data).unwrap_err();
        assert!(err.to_string().contains("current_datetime"));
        assert!(matches!(err, EchoError::Collaborator { .. }));
    }

    #[test]
    fn test_endpoint_joins_base() {
        let config = OracleConfig {
            api_url: Some("http://oracle:8000/".into()),
            timeout_secs: 10,
        };
        let oracle = HttpTimeOracle::new(&config).unwrap();
        assert_eq!(
            oracle.endpoint("America/New_York").as_deref(),
            Some("http://oracle:8000/api/time/America/New_York")
        );
    }

    #[tokio::test]
    async fn test_unconfigured_oracle_fails_fast() {
        let oracle = HttpTimeOracle::new(&OracleConfig::default()).unwrap();
        let err = oracle.current_time("UTC").await.unwrap_err();
        assert!(err.to_string().contains("no oracle API URL configured"));
    }
}
