use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{OutputSchema, Provider, Usage};

/// What the provider was asked for on one call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub output: Option<OutputSchema>,
}

/// A mock provider that returns pre-configured responses for testing
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<Result<Message, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    /// Responses where `Err` simulates a failed generation call
    pub fn scripted(responses: Vec<Result<Message, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
        output: Option<&OutputSchema>,
        _temperature: Option<f32>,
    ) -> Result<(Message, Usage)> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
            output: output.cloned(),
        });

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(message)) => Ok((message, Usage::new(Some(1), Some(1), Some(2)))),
            Some(Err(e)) => Err(anyhow!(e)),
            // Return empty response if no more pre-configured responses
            None => Ok((Message::assistant().with_text(""), Usage::default())),
        }
    }
}
