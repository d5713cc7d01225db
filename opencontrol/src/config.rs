//! Server configuration, loadable from TOML or built in code.
//!
//! ```rust
//! use opencontrol::{ConfigErrorKind, ControlConfig};
//!
//! let config = ControlConfig::from_toml_str(
//!     r#"
//!     password = "hunter2"
//!
//!     [model]
//!     provider = "mistral"
//!     model = "mistral-small-latest"
//!     "#,
//! )
//! .expect("config should parse");
//!
//! let token = config.resolve_password_with(|_| None).expect("explicit password");
//! assert_eq!(token.expose(), "hunter2");
//!
//! let error = ControlConfig::default()
//!     .resolve_password_with(|_| None)
//!     .expect_err("placeholder password is refused");
//! assert_eq!(error.kind, ConfigErrorKind::DefaultPassword);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

use ctlchat::{ChatPolicy, DEFAULT_TEMPERATURE};
use ctlcommon::GenerationOptions;
use ctlprovider::{ProviderError, SecretString};
use ctltooling::RegistryError;
use serde::Deserialize;

pub const PASSWORD_ENV: &str = "OPENCONTROL_PASSWORD";
pub const LEGACY_PASSWORD_ENV: &str = "OPENCONTROL_KEY";
pub const DEFAULT_PASSWORD: &str = "password";

pub const DEFAULT_SHOP_URL: &str = "https://api.dev.terminal.shop";
pub const SHOP_TOKEN_ENV: &str = "TERMINAL_DEV_BEARER_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    Io,
    Parse,
    DefaultPassword,
    MissingCredential,
    Invalid,
    Provider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid, message)
    }

    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::MissingCredential, message)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::new(ConfigErrorKind::Parse, value.to_string())
    }
}

impl From<ProviderError> for ConfigError {
    fn from(value: ProviderError) -> Self {
        Self::new(ConfigErrorKind::Provider, value.to_string())
    }
}

impl From<RegistryError> for ConfigError {
    fn from(value: RegistryError) -> Self {
        Self::invalid(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProviderKind {
    #[default]
    OpenAi,
    Mistral,
    /// Another opencontrol server's `/generate` endpoint.
    Remote,
}

impl ModelProviderKind {
    pub fn default_api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Mistral => "MISTRAL_API_KEY",
            Self::Remote => PASSWORD_ENV,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    pub provider: ModelProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: ModelProviderKind::default(),
            model: None,
            base_url: None,
            api_key_env: None,
            temperature: None,
            timeout_secs: 90,
        }
    }
}

impl ModelSettings {
    pub fn new(provider: ModelProviderKind) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = Some(name.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Result<SecretString, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = self.api_key_env();
        non_empty(lookup(name))
            .map(SecretString::new)
            .ok_or_else(|| ConfigError::missing_credential(format!("{name} is not set")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShopSettings {
    pub base_url: String,
    pub token_env: String,
    /// Adds `create_order`, which skips the cart.
    pub direct_orders: bool,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SHOP_URL.to_string(),
            token_env: SHOP_TOKEN_ENV.to_string(),
            direct_orders: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookMode {
    None,
    #[default]
    Tracing,
    Metrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatSettings {
    pub backoff_ms: u64,
    pub max_attempts: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            backoff_ms: 1_000,
            max_attempts: 8,
        }
    }
}

#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    pub password: Option<String>,
    /// Lets the placeholder password through. Development only.
    pub allow_default_password: bool,
    pub model: Option<ModelSettings>,
    pub shop: ShopSettings,
    pub chat: ChatSettings,
    pub hooks: HookMode,
    pub tool_timeout_secs: Option<u64>,
}

impl ControlConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|err| {
            ConfigError::new(
                ConfigErrorKind::Io,
                format!("failed to read {}: {err}", path.display()),
            )
        })?;
        Self::from_toml_str(&input)
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_model(mut self, model: ModelSettings) -> Self {
        self.model = Some(model);
        self
    }

    pub fn allow_default_password(mut self) -> Self {
        self.allow_default_password = true;
        self
    }

    pub fn resolve_password(&self) -> Result<SecretString, ConfigError> {
        self.resolve_password_with(|name| std::env::var(name).ok())
    }

    /// Explicit password, then `OPENCONTROL_PASSWORD`, then `OPENCONTROL_KEY`,
    /// then the placeholder. Empty values count as unset.
    pub fn resolve_password_with<F>(&self, lookup: F) -> Result<SecretString, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolved = non_empty(self.password.clone())
            .or_else(|| non_empty(lookup(PASSWORD_ENV)))
            .or_else(|| non_empty(lookup(LEGACY_PASSWORD_ENV)));

        match resolved {
            Some(password) => Ok(SecretString::new(password)),
            None if self.allow_default_password => {
                tracing::warn!(
                    phase = "config",
                    event = "default_password",
                    "using the placeholder password; set {PASSWORD_ENV}"
                );
                Ok(SecretString::new(DEFAULT_PASSWORD))
            }
            None => Err(ConfigError::new(
                ConfigErrorKind::DefaultPassword,
                format!("no password configured; set {PASSWORD_ENV} or {LEGACY_PASSWORD_ENV}"),
            )),
        }
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    pub fn chat_policy(&self) -> ChatPolicy {
        let temperature = self
            .model
            .as_ref()
            .and_then(|model| model.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);

        ChatPolicy::default()
            .with_max_attempts(self.chat.max_attempts)
            .with_backoff(Duration::from_millis(self.chat.backoff_ms))
            .with_options(GenerationOptions::default().with_temperature(temperature))
    }
}

impl std::fmt::Debug for ControlConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlConfig")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("allow_default_password", &self.allow_default_password)
            .field("model", &self.model)
            .field("shop", &self.shop)
            .field("chat", &self.chat)
            .field("hooks", &self.hooks)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
