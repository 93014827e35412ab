// Domain-based acceleration config generator

use crate::page_host;
use async_trait::async_trait;
use regex::Regex;
use speedcompare_core::domain::{AccelerationConfig, ConfigBuilder};
use speedcompare_core::port::{CollaboratorError, ConfigGenerator, RunContext};
use tracing::debug;

/// Extra host patterns whitelisted when a prior run gave nothing to analyze
const FALLBACK_HOST_PATTERNS: [&str; 3] = ["cdn", r"assets\.", r"static\."];

/// Second-level labels that belong to the public suffix (`co.uk`, `com.au`, ...)
const SECOND_LEVEL_SUFFIXES: [&str; 7] = ["co", "com", "org", "net", "ac", "gov", "edu"];

/// Whitelists the page's own registrable domain (plus up to three subdomain levels)
pub struct DomainConfigGenerator {
    app_name: String,
}

impl DomainConfigGenerator {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    /// Config accelerating the page's own domain only
    pub fn minimal(&self, url: &str, mobile: bool) -> Result<AccelerationConfig, CollaboratorError> {
        Ok(ConfigBuilder::new(&self.app_name, mobile)
            .whitelist_host(domain_pattern(url)?)
            .build())
    }

    /// Minimal config plus common static-asset hosts
    pub fn fallback(&self, url: &str, mobile: bool) -> Result<AccelerationConfig, CollaboratorError> {
        let builder = FALLBACK_HOST_PATTERNS.iter().fold(
            ConfigBuilder::new(&self.app_name, mobile).whitelist_host(domain_pattern(url)?),
            |builder, pattern| builder.whitelist_host(*pattern),
        );
        Ok(builder.build())
    }
}

#[async_trait]
impl ConfigGenerator for DomainConfigGenerator {
    async fn generate(
        &self,
        url: &str,
        context: &RunContext,
    ) -> Result<AccelerationConfig, CollaboratorError> {
        let nothing_to_analyze = context
            .prior_result
            .as_ref()
            .is_some_and(|prior| prior.domains.len() < 2);

        if nothing_to_analyze {
            debug!(url = %url, "Prior run has too few domains, using fallback config");
            return self.fallback(url, context.mobile);
        }
        self.minimal(url, context.mobile)
    }
}

/// Registrable domain of the page URL (`shop.a.example` -> `a.example`)
fn registrable_domain(url: &str) -> Result<String, CollaboratorError> {
    let host = page_host(url)
        .ok_or_else(|| CollaboratorError::InvalidRequest(format!("No host in {}", url)))?;

    let labels: Vec<&str> = host.split('.').filter(|label| !label.is_empty()).collect();
    let keep = match labels.as_slice() {
        [.., second, _] if labels.len() >= 3 && SECOND_LEVEL_SUFFIXES.contains(second) => 3,
        _ => 2,
    };
    Ok(labels[labels.len().saturating_sub(keep)..].join("."))
}

fn domain_pattern(url: &str) -> Result<String, CollaboratorError> {
    let domain = registrable_domain(url)?;
    let pattern = format!(r"^(?:[\w-]*\.){{0,3}}(?:{})", regex::escape(&domain));
    Regex::new(&pattern).map_err(|e| CollaboratorError::InvalidRequest(e.to_string()))?;
    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use speedcompare_core::domain::{RuleSection, TestMetrics};

    fn host_patterns(config: &AccelerationConfig) -> Vec<String> {
        config.whitelist[0].section(RuleSection::Host).clone()
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(registrable_domain("https://www.shop.a.example/x").unwrap(), "a.example");
        assert_eq!(registrable_domain("https://news.bbc.co.uk").unwrap(), "bbc.co.uk");
        assert_eq!(registrable_domain("http://localhost:8080").unwrap(), "localhost");
        assert!(registrable_domain("a.example").is_err());
    }

    #[test]
    fn test_domain_pattern_matches_subdomains_only_of_page() {
        let pattern = Regex::new(&domain_pattern("https://www.a.example").unwrap()).unwrap();
        assert!(pattern.is_match("a.example"));
        assert!(pattern.is_match("img.cdn.a.example"));
        assert!(!pattern.is_match("aXexample"));
    }

    #[test]
    fn test_minimal_config() {
        let generator = DomainConfigGenerator::new("makefast");
        let config = tokio_test::block_on(generator.generate(
            "https://www.a.example",
            &RunContext {
                mobile: true,
                prior_result: None,
            },
        ))
        .unwrap();

        assert_eq!(config.app_name, "makefast");
        assert!(config.user_agent_detection);
        assert_eq!(host_patterns(&config).len(), 1);
    }

    #[test]
    fn test_fallback_after_empty_prior_run() {
        let generator = DomainConfigGenerator::new("makefast");
        let config = tokio_test::block_on(generator.generate(
            "https://www.a.example",
            &RunContext {
                mobile: false,
                prior_result: Some(TestMetrics::default()),
            },
        ))
        .unwrap();

        let hosts = host_patterns(&config);
        assert_eq!(hosts.len(), 4);
        assert_eq!(hosts[1], "cdn");
    }
}
