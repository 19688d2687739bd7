use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use querypilot::agent::{AgentConfig, DEFAULT_MAX_ROUNDS};
use querypilot::credentials::oauth::{ClientCredentials, StaticToken};
use querypilot::credentials::TokenSource;
use querypilot::providers::configs::{
    AnthropicProviderConfig, ANTHROPIC_HOST, ANTHROPIC_MAX_TOKENS, ANTHROPIC_MODEL,
};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_provider_host")]
    pub host: String,
    /// Left unset the server still starts; every run then fails with a
    /// configuration error until a key is provided
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            host: default_provider_host(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

impl ProviderSettings {
    pub fn into_config(self) -> AnthropicProviderConfig {
        AnthropicProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AuthSettings {
    Token {
        token: String,
    },
    ClientCredentials {
        token_url: String,
        client_id: String,
        client_secret: String,
        #[serde(default)]
        scope: Option<String>,
    },
}

impl AuthSettings {
    pub fn into_source(self) -> Box<dyn TokenSource> {
        match self {
            AuthSettings::Token { token } => Box::new(StaticToken::new(token)),
            AuthSettings::ClientCredentials {
                token_url,
                client_id,
                client_secret,
                scope,
            } => Box::new(ClientCredentials::new(
                token_url,
                client_id,
                client_secret,
                scope,
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GatewaySettings {
    pub endpoint: String,
    #[serde(default)]
    pub query_endpoint: Option<String>,
    pub auth: AuthSettings,
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    /// Zero disables the limit
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    #[serde(default)]
    pub connections: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            connections: Vec::new(),
        }
    }
}

impl AgentSettings {
    pub fn into_config(self) -> AgentConfig {
        AgentConfig {
            max_rounds: (self.max_rounds > 0).then_some(self.max_rounds),
            connections: self.connections,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("provider.host", default_provider_host())?
            .set_default("provider.model", default_model())?
            .set_default("provider.max_tokens", default_max_tokens())?
            .set_default("agent.max_rounds", default_max_rounds() as u64)?
            .add_source(
                Environment::with_prefix("QUERYPILOT")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("agent.connections")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let config::ConfigError::NotFound(field) = &err {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                }
                match missing_field(&err.to_string()) {
                    Some(field) => Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    }),
                    None => Err(ConfigError::Other(err)),
                }
            }
        }
    }
}

/// Pull the dotted key out of "missing field `endpoint` for key `gateway`"
fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;
    let parent = rest
        .strip_prefix(" for key `")
        .and_then(|r| r.split_once('`'))
        .map(|(parent, _)| parent);
    Some(match parent {
        Some(parent) if !parent.is_empty() => format!("{}.{}", parent, field),
        _ => field.to_string(),
    })
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_provider_host() -> String {
    ANTHROPIC_HOST.to_string()
}

fn default_model() -> String {
    ANTHROPIC_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    ANTHROPIC_MAX_TOKENS
}

fn default_max_rounds() -> usize {
    DEFAULT_MAX_ROUNDS
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("querypilot")
        .join("saved.json")
}
