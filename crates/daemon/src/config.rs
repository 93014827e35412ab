//! Daemon configuration from `SPEEDCOMPARE_*` environment variables

use anyhow::{bail, Context, Result};
use speedcompare_api_rpc::server::DEFAULT_RPC_PORT;
use speedcompare_core::application::worker::constants::DEFAULT_TICK_INTERVAL;
use speedcompare_core::application::PipelineConfig;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.speedcompare/jobs.db";
const DEFAULT_WPT_URL: &str = "https://www.webpagetest.org";
const DEFAULT_APP_NAME: &str = "makefast";
const DEFAULT_ORIGIN_IP: &str = "127.0.0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Tilde-expanded SQLite file path
    pub db_path: String,
    pub rpc_port: u16,
    pub tick_interval: Duration,
    pub wpt_url: String,
    pub wpt_api_key: Option<String>,
    pub pingback_url: Option<String>,
    pub app_name: String,
    pub origin_ip: String,
    pub log_format: LogFormat,
    pub pipeline: PipelineConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and empty values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = var("SPEEDCOMPARE_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let log_format = match var("SPEEDCOMPARE_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let pipeline = PipelineConfig {
            max_test_retries: parse_or(
                var("SPEEDCOMPARE_MAX_TEST_RETRIES"),
                "SPEEDCOMPARE_MAX_TEST_RETRIES",
                PipelineConfig::default().max_test_retries,
            )?,
            ..PipelineConfig::default()
        };

        let tick_secs = parse_or(
            var("SPEEDCOMPARE_TICK_SECS"),
            "SPEEDCOMPARE_TICK_SECS",
            DEFAULT_TICK_INTERVAL.as_secs(),
        )?;
        if tick_secs == 0 {
            bail!("SPEEDCOMPARE_TICK_SECS must be at least 1");
        }

        Ok(Self {
            db_path: shellexpand::tilde(&db_path).into_owned(),
            rpc_port: parse_or(var("SPEEDCOMPARE_RPC_PORT"), "SPEEDCOMPARE_RPC_PORT", DEFAULT_RPC_PORT)?,
            tick_interval: Duration::from_secs(tick_secs),
            wpt_url: var("SPEEDCOMPARE_WPT_URL").unwrap_or_else(|| DEFAULT_WPT_URL.to_string()),
            wpt_api_key: var("SPEEDCOMPARE_WPT_API_KEY"),
            pingback_url: var("SPEEDCOMPARE_PINGBACK_URL"),
            app_name: var("SPEEDCOMPARE_APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            origin_ip: var("SPEEDCOMPARE_ORIGIN_IP").unwrap_or_else(|| DEFAULT_ORIGIN_IP.to_string()),
            log_format,
            pipeline,
        })
    }

    /// sqlx connection URL for `db_path`
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.db_path)
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert!(config.db_path.ends_with(".speedcompare/jobs.db"));
        assert!(!config.db_path.starts_with('~'));
        assert_eq!(config.rpc_port, 9627);
        assert_eq!(config.tick_interval, Duration::from_secs(10));
        assert_eq!(config.wpt_url, "https://www.webpagetest.org");
        assert_eq!(config.wpt_api_key, None);
        assert_eq!(config.app_name, "makefast");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.pipeline.max_test_retries, 3);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("SPEEDCOMPARE_DB_PATH", "/tmp/sc.db"),
            ("SPEEDCOMPARE_RPC_PORT", "7000"),
            ("SPEEDCOMPARE_TICK_SECS", "2"),
            ("SPEEDCOMPARE_WPT_API_KEY", "secret"),
            ("SPEEDCOMPARE_PINGBACK_URL", ""),
            ("SPEEDCOMPARE_MAX_TEST_RETRIES", "5"),
            ("SPEEDCOMPARE_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.database_url(), "sqlite:///tmp/sc.db");
        assert_eq!(config.rpc_port, 7000);
        assert_eq!(config.tick_interval, Duration::from_secs(2));
        assert_eq!(config.wpt_api_key.as_deref(), Some("secret"));
        assert_eq!(config.pingback_url, None);
        assert_eq!(config.pipeline.max_test_retries, 5);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config(&[("SPEEDCOMPARE_RPC_PORT", "ninety")]).unwrap_err();
        assert!(err.to_string().contains("SPEEDCOMPARE_RPC_PORT"));
    }

    #[test]
    fn test_zero_tick_interval_is_rejected() {
        let err = config(&[("SPEEDCOMPARE_TICK_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("SPEEDCOMPARE_TICK_SECS"));
        tokio_test::assert_ok!(config(&[("SPEEDCOMPARE_TICK_SECS", "1")]));
    }
}
