use serde::{Deserialize, Serialize};

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const GOOGLE_HOST: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const OPENROUTER_HOST: &str = "https://openrouter.ai/api";

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Ollama(OllamaProviderConfig),
    Google(GoogleProviderConfig),
    OpenRouter(OpenAiProviderConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    #[serde(default = "default_openai_host")]
    pub host: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaProviderConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,
}

impl Default for OllamaProviderConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleProviderConfig {
    #[serde(default = "default_google_host")]
    pub host: String,
    pub api_key: String,
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_ollama_host() -> String {
    OLLAMA_HOST.to_string()
}

fn default_google_host() -> String {
    GOOGLE_HOST.to_string()
}

pub fn default_openrouter_host() -> String {
    OPENROUTER_HOST.to_string()
}
