use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::base::{OutputSchema, Provider, Usage};
use super::configs::GoogleProviderConfig;
use super::utils::{create_openai_request_payload, handle_response, openai_response_to_result};
use crate::models::message::Message;
use crate::models::tool::Tool;

/// Gemini models via Google's OpenAI compatibility layer
pub struct GoogleProvider {
    client: Client,
    config: GoogleProviderConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        // The compat base already carries the version segment
        let url = format!(
            "{}/chat/completions",
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
impl Provider for GoogleProvider {
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
