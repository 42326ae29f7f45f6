use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};

use super::{
    base::Provider, configs::ProviderConfig, google::GoogleProvider, ollama::OllamaProvider,
    openai::OpenAiProvider,
};

#[derive(EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    Ollama,
    #[strum(serialize = "googleai")]
    GoogleAi,
    OpenRouter,
}

impl ProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderConfig::OpenAi(_) => ProviderType::OpenAi,
            ProviderConfig::Ollama(_) => ProviderType::Ollama,
            ProviderConfig::Google(_) => ProviderType::GoogleAi,
            ProviderConfig::OpenRouter(_) => ProviderType::OpenRouter,
        }
    }
}

pub fn get_provider(config: ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config {
        ProviderConfig::OpenAi(openai_config) | ProviderConfig::OpenRouter(openai_config) => {
            Ok(Arc::new(OpenAiProvider::new(openai_config)?))
        }
        ProviderConfig::Ollama(ollama_config) => Ok(Arc::new(OllamaProvider::new(ollama_config)?)),
        ProviderConfig::Google(google_config) => Ok(Arc::new(GoogleProvider::new(google_config)?)),
    }
}

/// A `provider/model` reference such as `ollama/gpt-oss:20b`.
///
/// Only the first `/` separates the provider; the model name may contain more
/// (`openrouter/mistralai/devstral-2512`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelRef {
    pub provider: ProviderType,
    pub model: String,
}

impl ModelRef {
    pub fn new<S: Into<String>>(provider: ProviderType, model: S) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl FromStr for ModelRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (provider, model) = s
            .split_once('/')
            .ok_or_else(|| anyhow!("model reference '{}' must look like provider/model", s))?;
        if model.is_empty() {
            return Err(anyhow!("model reference '{}' has an empty model name", s));
        }
        let provider = ProviderType::from_str(provider)
            .map_err(|_| anyhow!("unknown provider '{}' in model reference '{}'", provider, s))?;
        Ok(Self::new(provider, model))
    }
}

impl TryFrom<String> for ModelRef {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ModelRef> for String {
    fn from(value: ModelRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Configured providers, shared read-only between engine runs
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderType, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: Vec<ProviderConfig>) -> Result<Self> {
        let mut registry = Self::new();
        for config in configs {
            let provider_type = config.provider_type();
            registry.insert(provider_type, get_provider(config)?);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, provider_type: ProviderType, provider: Arc<dyn Provider>) {
        self.providers.insert(provider_type, provider);
    }

    pub fn get(&self, provider_type: ProviderType) -> Option<Arc<dyn Provider>> {
        self.providers.get(&provider_type).cloned()
    }

    pub fn configured(&self) -> Vec<ProviderType> {
        let mut types: Vec<_> = self.providers.keys().copied().collect();
        types.sort_by_key(|t| t.to_string());
        types
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.configured())
            .finish()
    }
}
