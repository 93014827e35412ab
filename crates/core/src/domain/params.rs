// Run parameters shared by every level of a comparison

use serde::{Deserialize, Serialize};

use crate::domain::acceleration::AccelerationConfig;
use crate::domain::error::{DomainError, Result};

/// Default browser-test location
pub const DEFAULT_LOCATION: &str = "eu-central-1:Chrome.Native";

/// Default activity timeout (75s), enforced by the testing service
pub const DEFAULT_ACTIVITY_TIMEOUT_MS: u64 = 75_000;

/// Default overall test timeout (60s), enforced by the testing service
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Upper bound for repeated measurements of one URL
pub const MAX_RUNS: u32 = 100;

/// Every recognized run option, with defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Emulate a mobile device
    pub mobile: bool,
    /// Testing-service location identifier
    pub location: String,
    pub activity_timeout_ms: u64,
    pub timeout_secs: u64,
    /// Also measure the repeat (warm cache) view
    pub caching: bool,
    /// User-supplied config; skips the config generator when set
    pub acceleration_config: Option<AccelerationConfig>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            mobile: false,
            location: DEFAULT_LOCATION.to_string(),
            activity_timeout_ms: DEFAULT_ACTIVITY_TIMEOUT_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            caching: false,
            acceleration_config: None,
        }
    }
}

impl RunParams {
    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "location must not be empty".to_string(),
            ));
        }
        if self.activity_timeout_ms == 0 || self.timeout_secs == 0 {
            return Err(DomainError::ValidationError(
                "timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_runs() -> u32 {
    1
}

/// One entry of a campaign queue: a URL measured `runs` times
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSpec {
    pub url: String,
    #[serde(flatten)]
    pub params: RunParams,
    #[serde(default = "default_runs")]
    pub runs: u32,
}

impl ComparisonSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: RunParams::default(),
            runs: default_runs(),
        }
    }

    pub fn with_runs(mut self, runs: u32) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_params(mut self, params: RunParams) -> Self {
        self.params = params;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_url(&self.url)?;
        validate_runs(self.runs)?;
        self.params.validate()
    }

    /// Validate, returning the spec with its URL in stored form
    pub fn normalized(mut self) -> Result<Self> {
        self.validate()?;
        self.url = validate_url(&self.url)?.to_string();
        Ok(self)
    }
}

/// Accept absolute http(s) URLs only; returns the URL as it is stored
pub fn validate_url(url: &str) -> Result<&str> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            DomainError::ValidationError(format!("URL must start with http:// or https://: {}", url))
        })?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(DomainError::ValidationError(format!(
            "URL has no host: {}",
            url
        )));
    }
    Ok(url)
}

pub fn validate_runs(runs: u32) -> Result<()> {
    if runs == 0 || runs > MAX_RUNS {
        return Err(DomainError::ValidationError(format!(
            "runs must be between 1 and {} (got {})",
            MAX_RUNS, runs
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_flat_with_defaults() {
        let spec: ComparisonSpec =
            serde_json::from_value(serde_json::json!({"url": "https://a.example", "mobile": true}))
                .unwrap();

        assert_eq!(spec.url, "https://a.example");
        assert!(spec.params.mobile);
        assert_eq!(spec.params.location, DEFAULT_LOCATION);
        assert_eq!(spec.params.activity_timeout_ms, DEFAULT_ACTIVITY_TIMEOUT_MS);
        assert_eq!(spec.runs, 1);
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://a.example/path").is_ok());
        assert!(validate_url("http://a.example").is_ok());
        assert!(validate_url("a.example").is_err());
        assert!(validate_url("https://").is_err());
        assert!(validate_url("ftp://a.example").is_err());
        assert_eq!(validate_url(" https://a.example\n").unwrap(), "https://a.example");
    }

    #[test]
    fn test_normalized_trims_url() {
        let spec = ComparisonSpec::new("  https://a.example ").normalized().unwrap();
        assert_eq!(spec, ComparisonSpec::new("https://a.example"));
        assert!(ComparisonSpec::new(" a.example").normalized().is_err());
    }

    #[test]
    fn test_validate_runs_bounds() {
        assert!(validate_runs(0).is_err());
        assert!(validate_runs(1).is_ok());
        assert!(validate_runs(MAX_RUNS).is_ok());
        assert!(validate_runs(MAX_RUNS + 1).is_err());
    }

    #[test]
    fn test_empty_location_rejected() {
        let spec = ComparisonSpec::new("https://a.example").with_params(RunParams {
            location: " ".to_string(),
            ..RunParams::default()
        });
        assert!(spec.validate().is_err());
    }
}
