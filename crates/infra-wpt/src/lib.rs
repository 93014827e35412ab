// Speedcompare Infrastructure - WebPageTest Adapters
// Implements: TestingService, ScriptBuilder, ConfigGenerator

mod client;
mod config_generator;
mod script;

pub use client::{WptClient, WptClientConfig};
pub use config_generator::DomainConfigGenerator;
pub use script::WptScriptBuilder;

/// Host of a page URL, lower-cased (`None` for URLs without a host)
pub(crate) fn page_host(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.to_ascii_lowercase())
}
