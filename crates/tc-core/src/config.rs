use serde::Deserialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tc_backend::{AgentConfig, AgentDescriptor, AgentRegistry, ChatError, HttpConfig};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no API key for {model}: set {env} (environment or .env) or providers.{model}.api_key_cmd")]
    MissingCredential { model: String, env: String },
    #[error("no model has an API key configured (set one of: {0})")]
    NoCredentials(String),
    #[error(transparent)]
    Backend(#[from] ChatError),
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
    pub http: HttpSettings,
    /// Per-provider overrides, keyed by registry key (`openai`, `gemini`, ...).
    pub providers: BTreeMap<String, ProviderConfig>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// Registry key of the model selected on startup. Defaults to the first
    /// model with a credential.
    pub default_model: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_secs: u64,
    /// Longest wait for the next chunk of a streaming reply.
    pub read_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            read_timeout_secs: defaults.read_timeout.as_secs(),
        }
    }
}

impl HttpSettings {
    pub fn to_http_config(&self) -> HttpConfig {
        HttpConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Command to run to get the API key (e.g., "pass show openai").
    /// The command is run via `sh -c`.
    pub api_key_cmd: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

impl ProviderConfig {
    /// Overlay the configured fields onto a provider's defaults.
    pub fn apply(&self, mut base: AgentConfig) -> AgentConfig {
        if let Some(model) = &self.model {
            base.model = model.clone();
        }
        if let Some(url) = &self.base_url {
            base.base_url = url.clone();
        }
        if self.max_tokens.is_some() {
            base.max_tokens = self.max_tokens;
        }
        if self.temperature.is_some() {
            base.temperature = self.temperature;
        }
        if self.system_prompt.is_some() {
            base.system_prompt = self.system_prompt.clone();
        }
        base
    }
}

impl Config {
    /// Load the config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn provider(&self, key: &str) -> Option<&ProviderConfig> {
        self.providers.get(key)
    }

    /// Build the agent configuration for `descriptor`.
    pub fn agent_config(&self, descriptor: &AgentDescriptor) -> AgentConfig {
        let mut config = (descriptor.defaults)();
        config.http = self.http.to_http_config();
        match self.provider(descriptor.key) {
            Some(overrides) => overrides.apply(config),
            None => config,
        }
    }

    /// Resolve the API key for `descriptor`: `api_key_cmd` first, then the
    /// environment variable named by the descriptor.
    pub fn resolve_credential(&self, descriptor: &AgentDescriptor) -> Option<String> {
        self.resolve_credential_with(descriptor, |name| std::env::var(name).ok())
    }

    pub fn resolve_credential_with<F>(&self, descriptor: &AgentDescriptor, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cmd) = self.provider(descriptor.key).and_then(|p| p.api_key_cmd.as_deref()) {
            match run_key_command(cmd) {
                Ok(Some(key)) => return Some(key),
                Ok(None) => debug!(model = descriptor.key, "api_key_cmd produced no key"),
                Err(e) => debug!(model = descriptor.key, error = %e, "api_key_cmd failed"),
            }
        }

        env(descriptor.credential_key)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Credential lookup keyed by credential name, for
    /// [`AgentRegistry::list_available`].
    pub fn credential_lookup<'a>(
        &'a self,
        registry: &'a AgentRegistry,
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |credential_key: &str| {
            registry
                .descriptors()
                .iter()
                .find(|d| d.credential_key == credential_key)
                .and_then(|d| self.resolve_credential(d))
        }
    }
}

fn run_key_command(cmd: &str) -> io::Result<Option<String>> {
    let output = Command::new("sh").arg("-c").arg(cmd).output()?;
    if !output.status.success() {
        return Ok(None);
    }
    let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!key.is_empty()).then_some(key))
}

/// Load a `.env` file from the working directory or one of its parents
/// into the process environment. Variables already set are kept.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "failed to read .env"),
    }
}

pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("thinkchat").join("config.toml")
}
