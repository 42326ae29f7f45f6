use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::base::{OutputSchema, Provider, Usage};
use super::configs::OllamaProviderConfig;
use super::utils::{create_openai_request_payload, handle_response, openai_response_to_result};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub const OLLAMA_MODEL: &str = "gpt-oss:20b";

/// Local Ollama server through its OpenAI compatible endpoint; no auth
pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self.client.post(&url).json(&payload).send().await?;
        handle_response(&payload, response).await
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
        output: Option<&OutputSchema>,
        temperature: Option<f32>,
    ) -> Result<(Message, Usage)> {
        let payload =
            create_openai_request_payload(model, messages, tools, output, temperature)?;
        let response = self.post(payload).await?;
        openai_response_to_result(response)
    }
}
