//! Layered settings: built-in defaults, an optional `sculpt.toml`, then
//! `SCULPT_` environment variables (`__` separates nested keys, e.g.
//! `SCULPT_PROVIDERS__OLLAMA__HOST`).
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

use crate::engine::MAX_TURNS;
use crate::profile::{Profile, Profiles};
use crate::providers::configs::{
    default_openrouter_host, GoogleProviderConfig, OllamaProviderConfig, OpenAiProviderConfig,
    ProviderConfig,
};
use crate::providers::factory::ProviderRegistry;

pub const ENV_PREFIX: &str = "SCULPT";
pub const DEFAULT_CONFIG_FILE: &str = "sculpt.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted config key
pub fn to_env_var(field: &str) -> String {
    format!("{}_{}", ENV_PREFIX, field.to_uppercase().replace('.', "__"))
}

#[derive(Debug, Clone, Deserialize)]
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
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenRouterSettings {
    #[serde(default = "default_openrouter_host")]
    pub host: String,
    pub api_key: String,
}

/// Providers that can be addressed by model references. Ollama needs no
/// credentials and is always available.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub openai: Option<OpenAiProviderConfig>,
    #[serde(default)]
    pub ollama: OllamaProviderConfig,
    #[serde(default)]
    pub google: Option<GoogleProviderConfig>,
    #[serde(default)]
    pub openrouter: Option<OpenRouterSettings>,
}

impl ProviderSettings {
    pub fn into_configs(self) -> Vec<ProviderConfig> {
        let mut configs = vec![ProviderConfig::Ollama(self.ollama)];
        if let Some(openai) = self.openai {
            configs.push(ProviderConfig::OpenAi(openai));
        }
        if let Some(google) = self.google {
            configs.push(ProviderConfig::Google(google));
        }
        if let Some(openrouter) = self.openrouter {
            configs.push(ProviderConfig::OpenRouter(OpenAiProviderConfig {
                host: openrouter.host,
                api_key: openrouter.api_key,
            }));
        }
        configs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Cap applied to every profile's turn budget
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub providers: ProviderSettings,
    #[serde(default)]
    pub engine: EngineSettings,
    /// Extra profiles, or overrides of the built-in ones
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Settings {
    /// Load from `sculpt.toml` in the working directory (if present) and the environment
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load with an explicit config file, which must then exist
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
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

    /// Built-in profiles merged with configured ones, turn budgets capped
    pub fn profiles(&self) -> Profiles {
        let mut profiles = Profiles::builtin();
        profiles.merge(self.profiles.clone());

        let mut capped = Profiles::default();
        for profile in profiles.iter() {
            let mut profile = profile.clone();
            profile.max_turns = profile.max_turns.min(self.engine.max_turns);
            capped.insert(profile.name.clone(), profile);
        }
        capped
    }

    pub fn provider_registry(&self) -> anyhow::Result<ProviderRegistry> {
        ProviderRegistry::from_configs(self.providers.clone().into_configs())
    }
}

/// Dotted key for serde's "missing field `x`" errors, including the parent key
/// when config reports one ("missing field `x` for key `a.b`")
fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;
    let parent = rest
        .split_once("for key `")
        .and_then(|(_, key)| key.split_once('`'))
        .map(|(key, _)| key)
        .filter(|key| !key.is_empty());

    Some(match parent {
        Some(parent) => format!("{}.{}", parent, field),
        None => field.to_string(),
    })
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3400
}

fn default_max_turns() -> usize {
    MAX_TURNS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::factory::ProviderType;
    use serial_test::serial;
    use std::env;
    use std::fs;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("SCULPT_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3400);
        assert_eq!(settings.engine.max_turns, MAX_TURNS);
        assert_eq!(settings.providers.ollama.host, "http://localhost:11434");
        assert!(settings.providers.openai.is_none());

        let registry = settings.provider_registry().unwrap();
        assert_eq!(registry.configured(), vec![ProviderType::Ollama]);
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("SCULPT_SERVER__PORT", "8080");
        env::set_var("SCULPT_PROVIDERS__OLLAMA__HOST", "http://gpu-box:11434");
        env::set_var("SCULPT_PROVIDERS__GOOGLE__API_KEY", "gemini-key");
        env::set_var("SCULPT_PROVIDERS__OPENROUTER__API_KEY", "router-key");
        env::set_var("SCULPT_ENGINE__MAX_TURNS", "12");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.providers.ollama.host, "http://gpu-box:11434");

        let google = settings.providers.google.clone().unwrap();
        assert_eq!(google.api_key, "gemini-key");
        assert_eq!(
            google.host,
            "https://generativelanguage.googleapis.com/v1beta/openai"
        );
        let openrouter = settings.providers.openrouter.clone().unwrap();
        assert_eq!(openrouter.host, "https://openrouter.ai/api");

        let registry = settings.provider_registry().unwrap();
        assert_eq!(
            registry.configured(),
            vec![
                ProviderType::GoogleAi,
                ProviderType::Ollama,
                ProviderType::OpenRouter
            ]
        );

        let profiles = settings.profiles();
        assert!(profiles.iter().all(|p| p.max_turns == 12));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clean_env();
        env::set_var("SCULPT_PROVIDERS__OPENAI__HOST", "https://custom.openai.com");

        let err = Settings::new().unwrap_err();
        match err {
            ConfigError::MissingEnvVar { env_var } => assert!(env_var.ends_with("API_KEY")),
            other => panic!("unexpected error: {other:?}"),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_config_file_profiles() {
        clean_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sculpt.toml");
        fs::write(
            &path,
            r#"
[server]
port = 9000

[profiles.py-docs]
description = "Add docstrings"
template = "prompts/py_docs.md"
model = "ollama/gpt-oss:20b"
suffixes = [".py"]
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.server.port, 9000);

        let profiles = settings.profiles();
        assert_eq!(profiles.names(), vec!["log-prism", "py-docs", "wrap-error"]);
        let py = profiles.get("py-docs").unwrap();
        assert_eq!(py.name, "py-docs");
        assert_eq!(py.model.to_string(), "ollama/gpt-oss:20b");
        assert_eq!(py.max_turns, MAX_TURNS);
    }

    #[test]
    #[serial]
    fn test_explicit_config_file_must_exist() {
        clean_env();
        let err = Settings::load(Some(Path::new("/nonexistent/sculpt.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Other(_)));
    }

    #[test]
    fn test_missing_field_parsing() {
        assert_eq!(missing_field("missing field `api_key`"), Some("api_key".into()));
        assert_eq!(
            missing_field("missing field `api_key` for key `providers.openai`"),
            Some("providers.openai.api_key".into())
        );
        assert_eq!(missing_field("invalid type"), None);
        assert_eq!(
            to_env_var("providers.openai.api_key"),
            "SCULPT_PROVIDERS__OPENAI__API_KEY"
        );
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3400,
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3400");
    }
}
