use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::base::{OutputSchema, Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{create_openai_request_payload, handle_response, openai_response_to_result};
use crate::models::message::Message;
use crate::models::tool::Tool;

/// OpenAI, and any host speaking the same `/v1/chat/completions` API with
/// bearer auth (OpenRouter uses this too)
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        handle_response(&payload, response).await
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
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
