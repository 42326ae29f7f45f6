use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::schema_value;
use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Accumulate another call's usage; unknown counts stay unknown only if both are
    pub fn add(&mut self, other: &Usage) {
        fn sum(a: Option<i32>, b: Option<i32>) -> Option<i32> {
            match (a, b) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
            }
        }
        self.input_tokens = sum(self.input_tokens, other.input_tokens);
        self.output_tokens = sum(self.output_tokens, other.output_tokens);
        self.total_tokens = sum(self.total_tokens, other.total_tokens);
    }
}

/// JSON schema the final answer must conform to
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    pub fn for_type<T: JsonSchema>() -> Self {
        Self {
            name: T::schema_name(),
            schema: schema_value::<T>(),
        }
    }
}

/// Base trait for model providers (OpenAI, Ollama, Gemini, ...)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message from the full history.
    ///
    /// `tools` may be empty. When `output` is set the provider asks the model
    /// for a JSON document conforming to the schema.
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[Tool],
        output: Option<&OutputSchema>,
        temperature: Option<f32>,
    ) -> Result<(Message, Usage)>;
}
