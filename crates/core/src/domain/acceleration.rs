// Acceleration config - which sub-resources the accelerating layer intercepts

use serde::{Deserialize, Serialize};

/// Regex patterns matched against one part of a request URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pathname: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub url: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSection {
    Host,
    Pathname,
    Url,
}

impl Rule {
    pub fn section(&self, section: RuleSection) -> &Vec<String> {
        match section {
            RuleSection::Host => &self.host,
            RuleSection::Pathname => &self.pathname,
            RuleSection::Url => &self.url,
        }
    }

    fn section_mut(&mut self, section: RuleSection) -> &mut Vec<String> {
        match section {
            RuleSection::Host => &mut self.host,
            RuleSection::Pathname => &mut self.pathname,
            RuleSection::Url => &mut self.url,
        }
    }

    fn condition_count(&self) -> usize {
        self.host.len() + self.pathname.len() + self.url.len()
    }
}

/// Opaque (to the pipeline) ruleset attached to accelerated tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccelerationConfig {
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub whitelist: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blacklist: Vec<Rule>,
    #[serde(default)]
    pub user_agent_detection: bool,
}

impl AccelerationConfig {
    /// Number of conditions across both lists
    pub fn size(&self) -> usize {
        self.whitelist
            .iter()
            .chain(self.blacklist.iter())
            .map(Rule::condition_count)
            .sum()
    }
}

/// Incremental config construction with an optional condition budget
///
/// A condition added to a section that already appears in some rule is merged
/// into that rule; otherwise a new rule is started. Once the budget is used up
/// further additions are ignored.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    app_name: String,
    user_agent_detection: bool,
    whitelist: Vec<Rule>,
    blacklist: Vec<Rule>,
    size: usize,
    max_capacity: Option<usize>,
}

impl ConfigBuilder {
    pub fn new(app_name: impl Into<String>, user_agent_detection: bool) -> Self {
        Self {
            app_name: app_name.into(),
            user_agent_detection,
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            size: 0,
            max_capacity: None,
        }
    }

    pub fn with_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = Some(max_capacity);
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity_reached(&self) -> bool {
        self.max_capacity.is_some_and(|max| self.size >= max)
    }

    pub fn whitelist_host(self, pattern: impl Into<String>) -> Self {
        self.add(true, RuleSection::Host, pattern.into())
    }

    pub fn whitelist_pathname(self, pattern: impl Into<String>) -> Self {
        self.add(true, RuleSection::Pathname, pattern.into())
    }

    pub fn whitelist_url(self, pattern: impl Into<String>) -> Self {
        self.add(true, RuleSection::Url, pattern.into())
    }

    pub fn blacklist_url(self, pattern: impl Into<String>) -> Self {
        self.add(false, RuleSection::Url, pattern.into())
    }

    pub fn build(self) -> AccelerationConfig {
        AccelerationConfig {
            app_name: self.app_name,
            whitelist: self.whitelist,
            blacklist: self.blacklist,
            user_agent_detection: self.user_agent_detection,
        }
    }

    fn add(mut self, whitelist: bool, section: RuleSection, pattern: String) -> Self {
        if self.capacity_reached() {
            return self;
        }
        self.size += 1;

        let rules = if whitelist {
            &mut self.whitelist
        } else {
            &mut self.blacklist
        };

        match rules.iter_mut().find(|rule| !rule.section(section).is_empty()) {
            Some(rule) => rule.section_mut(section).push(pattern),
            None => {
                let mut rule = Rule::default();
                rule.section_mut(section).push(pattern);
                rules.push(rule);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_section_merges_new_section_starts_rule() {
        let config = ConfigBuilder::new("app", false)
            .whitelist_host("a\\.example")
            .whitelist_host("cdn")
            .whitelist_pathname("/static/")
            .build();

        assert_eq!(config.whitelist.len(), 2);
        assert_eq!(config.whitelist[0].host, vec!["a\\.example", "cdn"]);
        assert_eq!(config.whitelist[1].pathname, vec!["/static/"]);
        assert!(config.whitelist[1].host.is_empty());
        assert!(config.blacklist.is_empty());
        assert_eq!(config.size(), 3);
    }

    #[test]
    fn test_capacity_limits_conditions() {
        let builder = ConfigBuilder::new("app", true)
            .with_capacity(2)
            .whitelist_host("a")
            .blacklist_url("b")
            .whitelist_url("c");

        assert!(builder.capacity_reached());
        assert_eq!(builder.size(), 2);

        let config = builder.build();
        assert!(config.whitelist[0].url.is_empty());
        assert_eq!(config.blacklist[0].url, vec!["b"]);
        assert!(config.user_agent_detection);
    }

    #[test]
    fn test_serializes_without_empty_sections() {
        let config = ConfigBuilder::new("app", false).whitelist_host("a").build();
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "appName": "app",
                "whitelist": [{"host": ["a"]}],
                "userAgentDetection": false
            })
        );
    }
}
