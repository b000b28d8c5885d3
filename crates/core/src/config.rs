use std::time::Duration;

use anyhow::{Context, Result, bail};
use figment::{
    Figment, Metadata, Profile, Provider,
    providers::Env,
    value::{Dict, Map, Value},
};
use serde::{Deserialize, Deserializer};
use url::Url;

pub const DEFAULT_JENKINS_ENDPOINT: &str =
    "https://jenkins.k8s.pipeline.prod.srcd.run/generic-webhook-trigger/invoke";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api/";
pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

struct EnvKey {
    name: &'static str,
    section: &'static str,
    field: &'static str,
    /// Kept verbatim instead of being parsed as a number or boolean.
    text: bool,
}

const ENV_KEYS: &[EnvKey] = &[
    EnvKey { name: "PORT", section: "server", field: "port", text: false },
    EnvKey { name: "HTTP_TIMEOUT_SECS", section: "server", field: "client_timeout", text: false },
    EnvKey { name: "GITHUB_SECRET", section: "github", field: "webhook_secret", text: true },
    EnvKey { name: "JENKINS_ENDPOINT", section: "jenkins", field: "endpoint", text: true },
    EnvKey { name: "SLACK_CHANNEL", section: "slack", field: "channel", text: true },
    EnvKey { name: "SLACK_TOKEN", section: "slack", field: "token", text: true },
    EnvKey { name: "SLACK_API_URL", section: "slack", field: "api_url", text: true },
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub jenkins: JenkinsConfig,
    pub slack: SlackConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Timeout applied to every outbound request (Jenkins and Slack), in seconds.
    #[serde(deserialize_with = "seconds")]
    pub client_timeout: Duration,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JenkinsConfig {
    pub endpoint: Url,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Notifications are disabled when unset.
    pub channel: Option<String>,
    pub token: String,
    pub api_url: Url,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { port: DEFAULT_PORT, client_timeout: DEFAULT_CLIENT_TIMEOUT } }
}

impl Default for JenkinsConfig {
    fn default() -> Self {
        Self { endpoint: Url::parse(DEFAULT_JENKINS_ENDPOINT).expect("valid default endpoint") }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            channel: None,
            token: String::new(),
            api_url: Url::parse(DEFAULT_SLACK_API_URL).expect("valid default Slack API URL"),
        }
    }
}

impl Config {
    /// Load the configuration from the process environment.
    pub fn load() -> Result<Self> { Self::from_figment(Figment::from(Environment)) }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        if self.server.client_timeout.is_zero() {
            bail!("HTTP_TIMEOUT_SECS must be greater than zero");
        }
        check_http_url(&self.jenkins.endpoint).context("Invalid JENKINS_ENDPOINT")?;
        check_http_url(&self.slack.api_url).context("Invalid SLACK_API_URL")?;
        // Method names are joined onto the base, which needs a trailing slash
        if !self.slack.api_url.path().ends_with('/') {
            let path = format!("{}/", self.slack.api_url.path());
            self.slack.api_url.set_path(&path);
        }
        Ok(())
    }
}

fn check_http_url(url: &Url) -> Result<()> {
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Unsupported URL scheme {}", url.scheme());
    }
    Ok(())
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

/// The variables in [`ENV_KEYS`], nested under their config sections.
/// Empty variables count as unset.
struct Environment;

impl Provider for Environment {
    fn metadata(&self) -> Metadata { Metadata::named("environment variable") }

    fn data(&self) -> figment::Result<Map<Profile, Dict>> {
        let mut dict = Dict::new();
        let env = Env::raw();
        for (name, raw) in env.iter() {
            let Some(key) = ENV_KEYS.iter().find(|key| name.as_str().eq_ignore_ascii_case(key.name))
            else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            let value = if key.text {
                Value::from(raw)
            } else {
                raw.parse::<Value>().unwrap_or_else(|e| match e {})
            };
            let section = dict
                .entry(key.section.to_string())
                .or_insert_with(|| Value::from(Dict::new()));
            if let Value::Dict(_, fields) = section {
                fields.insert(key.field.to_string(), value);
            }
        }
        Ok(Profile::Default.collect(dict))
    }
}
