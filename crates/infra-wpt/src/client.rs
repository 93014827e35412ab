// WebPageTest HTTP client

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use speedcompare_core::domain::TestMetrics;
use speedcompare_core::port::{CollaboratorError, PollOutcome, TestSubmission, TestingService};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// WebPageTest status codes
const STATUS_PENDING: u16 = 100;
const STATUS_RUNNING: u16 = 101;
const STATUS_OK: u16 = 200;
const STATUS_FAILED_FROM: u16 = 400;

/// Default HTTP timeout for one API call (30s)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct WptClientConfig {
    /// e.g. `https://www.webpagetest.org`
    pub base_url: String,
    pub api_key: Option<String>,
    /// Called by the service when a test completes
    pub pingback_url: Option<String>,
    pub request_timeout: Duration,
}

impl WptClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            pingback_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

pub struct WptClient {
    http: reqwest::Client,
    config: WptClientConfig,
}

impl WptClient {
    pub fn new(config: WptClientConfig) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, CollaboratorError> {
        let response = self
            .http
            .get(self.endpoint(path))
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> CollaboratorError {
        if err.is_timeout() {
            CollaboratorError::Timeout(self.config.request_timeout.as_millis() as u64)
        } else {
            CollaboratorError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl TestingService for WptClient {
    async fn submit(&self, submission: &TestSubmission) -> Result<String, CollaboratorError> {
        let mut query = vec![
            ("f", "json".to_string()),
            ("url", submission.url.clone()),
            ("script", submission.script.clone()),
            ("location", submission.location.clone()),
            ("label", submission.label.clone()),
            ("runs", "1".to_string()),
            ("fvonly", flag(!submission.caching)),
            ("mobile", flag(submission.mobile)),
        ];
        if let Some(key) = &self.config.api_key {
            query.push(("k", key.clone()));
        }
        if let Some(pingback) = &self.config.pingback_url {
            query.push(("pingback", pingback.clone()));
        }

        let body = self.get_json("runtest.php", &query).await?;
        let test_id = parse_submit_response(body)?;
        debug!(external_test_id = %test_id, url = %submission.url, "WebPageTest accepted test");
        Ok(test_id)
    }

    async fn poll(&self, external_test_id: &str) -> Result<PollOutcome, CollaboratorError> {
        let body = self
            .get_json("jsonResult.php", &[("test", external_test_id.to_string())])
            .await?;
        parse_poll_response(body)
    }
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(rename = "statusText", default)]
    status_text: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    #[serde(rename = "testId")]
    test_id: String,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    #[serde(default)]
    runs: BTreeMap<String, RunResult>,
}

#[derive(Debug, Deserialize)]
struct RunResult {
    #[serde(rename = "firstView")]
    first_view: Option<ViewResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewResult {
    #[serde(rename = "TTFB")]
    ttfb: Option<f64>,
    #[serde(rename = "firstContentfulPaint")]
    first_contentful_paint: Option<f64>,
    #[serde(rename = "domContentLoadedEventStart")]
    dom_content_loaded: Option<f64>,
    #[serde(rename = "loadTime")]
    load_time: Option<f64>,
    #[serde(rename = "fullyLoaded")]
    fully_loaded: Option<f64>,
    #[serde(rename = "SpeedIndex")]
    speed_index: Option<f64>,
    #[serde(rename = "requestsFull")]
    requests: Option<f64>,
    #[serde(rename = "bytesIn")]
    bytes_in: Option<f64>,
    domains: BTreeMap<String, Value>,
}

impl ViewResult {
    fn into_metrics(self) -> TestMetrics {
        let whole = |value: Option<f64>| value.map(|v| v.max(0.0).round() as u64);
        TestMetrics {
            ttfb_ms: whole(self.ttfb),
            first_contentful_paint_ms: whole(self.first_contentful_paint),
            dom_content_loaded_ms: whole(self.dom_content_loaded),
            load_time_ms: whole(self.load_time),
            fully_loaded_ms: whole(self.fully_loaded),
            speed_index: whole(self.speed_index),
            requests: whole(self.requests),
            bytes_in: whole(self.bytes_in),
            domains: self.domains.into_keys().collect(),
        }
    }
}

fn parse_envelope(body: Value) -> Result<Envelope, CollaboratorError> {
    serde_json::from_value(body).map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
}

/// `runtest.php` answer -> test id
fn parse_submit_response(body: Value) -> Result<String, CollaboratorError> {
    let envelope = parse_envelope(body)?;
    if envelope.status_code != STATUS_OK {
        return Err(CollaboratorError::InvalidRequest(format!(
            "{} {}",
            envelope.status_code, envelope.status_text
        )));
    }
    let data: SubmitData = serde_json::from_value(envelope.data)
        .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
    Ok(data.test_id)
}

/// `jsonResult.php` answer -> progress of the test
fn parse_poll_response(body: Value) -> Result<PollOutcome, CollaboratorError> {
    let envelope = parse_envelope(body)?;
    match envelope.status_code {
        STATUS_PENDING | STATUS_RUNNING => Ok(PollOutcome::Pending),
        STATUS_OK => {
            let data: ResultData = serde_json::from_value(envelope.data)
                .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
            let first_view = data
                .runs
                .into_values()
                .next()
                .and_then(|run| run.first_view)
                .ok_or_else(|| {
                    CollaboratorError::InvalidResponse("Result has no first view".to_string())
                })?;
            Ok(PollOutcome::Complete(first_view.into_metrics()))
        }
        code if code >= STATUS_FAILED_FROM => Ok(PollOutcome::Failed(format!(
            "{} {}",
            code, envelope.status_text
        ))),
        code => Err(CollaboratorError::InvalidResponse(format!(
            "Unexpected status code {}",
            code
        ))),
    }
}
