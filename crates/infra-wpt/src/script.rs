// WebPageTest script builder
//
// One command per line, arguments separated by tabs.

use speedcompare_core::domain::AccelerationConfig;
use speedcompare_core::port::{CollaboratorError, ScriptBuilder, ScriptRequest};

#[derive(Default)]
struct Script {
    lines: Vec<String>,
}

impl Script {
    fn command(mut self, name: &str, args: &[&str]) -> Self {
        let mut line = name.to_string();
        for arg in args {
            line.push('\t');
            line.push_str(arg);
        }
        self.lines.push(line);
        self
    }

    fn set_activity_timeout(self, millis: u64) -> Self {
        self.command("setActivityTimeout", &[&millis.to_string()])
    }

    fn set_timeout(self, secs: u64) -> Self {
        self.command("setTimeout", &[&secs.to_string()])
    }

    fn log_data(self, enabled: bool) -> Self {
        self.command("logData", &[if enabled { "1" } else { "0" }])
    }

    fn set_dns(self, host: &str, ip: &str) -> Self {
        self.command("setDns", &[host, ip])
    }

    fn navigate(self, url: &str) -> Self {
        self.command("navigate", &[url])
    }

    fn exec(self, js: &str) -> Self {
        self.command("exec", &[js])
    }

    fn render(self) -> String {
        self.lines.join("\n")
    }
}

/// Builds baseline and accelerated WebPageTest scripts
pub struct WptScriptBuilder {
    /// Accelerated tests resolve the page host to this origin
    origin_ip: String,
    /// Application serving the browser-reset page on docker agents
    app_name: String,
}

impl WptScriptBuilder {
    pub fn new(origin_ip: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            origin_ip: origin_ip.into(),
            app_name: app_name.into(),
        }
    }

    fn baseline(&self, request: &ScriptRequest<'_>) -> Script {
        Script::default()
            .set_activity_timeout(request.activity_timeout_ms)
            .set_timeout(request.timeout_secs)
            .navigate(request.url)
    }

    fn accelerated(
        &self,
        request: &ScriptRequest<'_>,
        config: &AccelerationConfig,
    ) -> Result<Script, CollaboratorError> {
        let url = reqwest::Url::parse(request.url)
            .map_err(|e| CollaboratorError::InvalidRequest(format!("{}: {}", request.url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| CollaboratorError::InvalidRequest(format!("No host in {}", request.url)))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let config_json = serde_json::to_string(config)
            .map_err(|e| CollaboratorError::InvalidRequest(e.to_string()))?;
        let install_url = format!(
            "{}://{}/install-speed-kit?config={}",
            url.scheme(),
            authority,
            urlencoding::encode(&config_json)
        );

        let script = Script::default()
            .set_activity_timeout(request.activity_timeout_ms)
            .log_data(false)
            .set_timeout(request.timeout_secs)
            .set_dns(host, &self.origin_ip)
            .navigate(&install_url);

        Ok(self
            .clear_browser_content(script, request.location)
            .log_data(true)
            .set_timeout(request.timeout_secs)
            .navigate(request.url))
    }

    /// Leave the install page before the measured navigation
    fn clear_browser_content(&self, script: Script, location: &str) -> Script {
        if location.contains("-win") {
            return script.navigate("http://localhost:8888/orange.html");
        }
        if location.contains("-docker") {
            return script
                .navigate(&format!(
                    "https://{}.app.baqend.com/test-init.html",
                    self.app_name
                ))
                .exec(r#"document.write('<body style="background-color: white"></body>')"#);
        }
        script.navigate("about:blank")
    }
}

impl ScriptBuilder for WptScriptBuilder {
    fn build_script(&self, request: &ScriptRequest<'_>) -> Result<String, CollaboratorError> {
        let script = match request.acceleration_config {
            Some(config) => self.accelerated(request, config)?,
            None => self.baseline(request),
        };
        Ok(script.render())
    }
}
