//! The bounded tool-calling conversation loop.
//!
//! A run alternates model generations with tool dispatch until the model stops
//! asking for tools, then makes exactly one tool-free call that must answer with
//! a JSON document matching the requested result type.
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use strum_macros::Display;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::catalog::{ToolContext, ToolCatalog};
use crate::errors::{AgentError, AgentResult};
use crate::models::conversation::Conversation;
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::Tool;
use crate::providers::base::{OutputSchema, Provider, Usage};
use crate::providers::factory::{ModelRef, ProviderRegistry};
use crate::utils::strip_code_fence;

/// Upper bound on tool-loop generations for one run
pub const MAX_TURNS: usize = 100;

/// Appended once the tool loop ends, right before the structured answer is requested
pub const FINALIZE_INSTRUCTION: &str = "Above is the preprocessed conversation history. Please provide the final answer based on the conversation.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    ToolLoop,
    Finalize,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Turn limit of {0} reached while the model was still calling tools")]
    TurnLimitExceeded(usize),

    #[error("No provider configured for {0}")]
    ProviderNotConfigured(String),

    #[error("Generation failed during {phase}: {message}")]
    Generation { phase: Phase, message: String },

    #[error("Final answer does not match the output schema: {0}")]
    SchemaMismatch(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Everything one engine run needs besides the result type
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: ModelRef,
    /// Names of the catalog entries offered to the model
    pub tools: Vec<String>,
    pub max_turns: usize,
    pub temperature: Option<f32>,
    pub messages: Vec<Message>,
}

impl GenerationRequest {
    pub fn new(model: ModelRef, messages: Vec<Message>) -> Self {
        Self {
            model,
            tools: Vec::new(),
            max_turns: MAX_TURNS,
            temperature: None,
            messages,
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Clamped to [`MAX_TURNS`]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.min(MAX_TURNS);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredResult<T> {
    pub value: T,
    /// Tool-loop generations, not counting the final call
    pub turns: usize,
    pub usage: Usage,
}

#[derive(Debug, Clone)]
pub struct ConversationEngine {
    catalog: Arc<ToolCatalog>,
    providers: Arc<ProviderRegistry>,
}

impl ConversationEngine {
    pub fn new(catalog: Arc<ToolCatalog>, providers: Arc<ProviderRegistry>) -> Self {
        Self { catalog, providers }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Run the tool loop followed by the structured finalization call
    pub async fn run<T>(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<StructuredResult<T>, EngineError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let span = tracing::info_span!("engine_run", model = %request.model);
        self.run_inner(request, cancel).instrument(span).await
    }

    async fn run_inner<T>(
        &self,
        request: GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<StructuredResult<T>, EngineError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        if request.max_turns == 0 {
            return Err(EngineError::TurnLimitExceeded(0));
        }
        let provider = self.provider(&request.model)?;
        let tools = self.catalog.tools(&request.tools).map_err(|e| match e {
            AgentError::ToolNotFound(name) => EngineError::ToolNotFound(name),
            other => EngineError::ToolNotFound(other.to_string()),
        })?;

        let mut conversation = Conversation::new(request.messages);
        let mut usage = Usage::default();
        let mut turns = 0;

        while turns < request.max_turns {
            turns += 1;
            tracing::debug!(turn = turns, history = conversation.len(), "generating");

            let (response, call_usage) = generate(
                provider.as_ref(),
                &request.model.model,
                conversation.messages(),
                &tools,
                None,
                request.temperature,
                Phase::ToolLoop,
                cancel,
            )
            .await?;
            usage.add(&call_usage);

            let requests: Vec<ToolRequest> = response.tool_requests().cloned().collect();
            conversation.push(response);

            if requests.is_empty() {
                break;
            }
            if turns == request.max_turns {
                tracing::warn!(max_turns = request.max_turns, "turn limit reached");
                return Err(EngineError::TurnLimitExceeded(request.max_turns));
            }

            for tool_request in requests {
                let result = self.dispatch(&tool_request, &tools, cancel).await?;
                conversation.push(Message::tool().with_tool_response(tool_request.id, result));
            }
        }

        tracing::info!(turns, "tool loop finished, requesting final answer");
        conversation.push(Message::user().with_text(FINALIZE_INSTRUCTION));

        let output = OutputSchema::for_type::<T>();
        let (response, call_usage) = generate(
            provider.as_ref(),
            &request.model.model,
            conversation.messages(),
            &[],
            Some(&output),
            request.temperature,
            Phase::Finalize,
            cancel,
        )
        .await?;
        usage.add(&call_usage);

        let value = parse_structured(&response.text(), &output.schema)?;
        Ok(StructuredResult {
            value,
            turns,
            usage,
        })
    }

    /// A single structured generation without tools or the finalization step
    pub async fn generate_data<T>(
        &self,
        model: &ModelRef,
        messages: Vec<Message>,
        temperature: Option<f32>,
        cancel: &CancellationToken,
    ) -> Result<StructuredResult<T>, EngineError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let provider = self.provider(model)?;
        let output = OutputSchema::for_type::<T>();
        let (response, usage) = generate(
            provider.as_ref(),
            &model.model,
            &messages,
            &[],
            Some(&output),
            temperature,
            Phase::Finalize,
            cancel,
        )
        .await?;

        let value = parse_structured(&response.text(), &output.schema)?;
        Ok(StructuredResult {
            value,
            turns: 0,
            usage,
        })
    }

    fn provider(&self, model: &ModelRef) -> Result<Arc<dyn Provider>, EngineError> {
        self.providers
            .get(model.provider)
            .ok_or_else(|| EngineError::ProviderNotConfigured(model.provider.to_string()))
    }

    /// Resolve and run one tool request.
    ///
    /// Only a well-formed call to a tool outside the active subset is fatal;
    /// every other failure becomes the tool result the model sees next turn.
    async fn dispatch(
        &self,
        request: &ToolRequest,
        active: &[Tool],
        cancel: &CancellationToken,
    ) -> Result<AgentResult<Value>, EngineError> {
        let call = match &request.tool_call {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(id = %request.id, error = %e, "malformed tool request");
                return Ok(Err(e.clone()));
            }
        };

        if !active.iter().any(|tool| tool.name == call.name) {
            return Err(EngineError::ToolNotFound(call.name.clone()));
        }

        tracing::info!(tool = %call.name, id = %request.id, "dispatching tool");
        let ctx = ToolContext::new(request.id.clone(), cancel.child_token());
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = self.catalog.dispatch(&ctx, call) => result,
        };

        if let Err(e) = &result {
            tracing::warn!(tool = %call.name, error = %e, "tool call failed");
        }
        Ok(result)
    }
}

#[allow(clippy::too_many_arguments)]
async fn generate(
    provider: &dyn Provider,
    model: &str,
    messages: &[Message],
    tools: &[Tool],
    output: Option<&OutputSchema>,
    temperature: Option<f32>,
    phase: Phase,
    cancel: &CancellationToken,
) -> Result<(Message, Usage), EngineError> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(EngineError::Cancelled),
        result = provider.complete(model, messages, tools, output, temperature) => result,
    };

    result.map_err(|e| EngineError::Generation {
        phase,
        message: format!("{:#}", e),
    })
}

/// Decode a final answer: strip a code fence, parse JSON, validate against
/// `schema`, then deserialize.
pub fn parse_structured<T: DeserializeOwned>(text: &str, schema: &Value) -> Result<T, EngineError> {
    let cleaned = strip_code_fence(text);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| EngineError::SchemaMismatch(format!("response is not valid JSON: {}", e)))?;

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| EngineError::SchemaMismatch(format!("invalid output schema: {}", e)))?;
    if !validator.is_valid(&value) {
        let errors: Vec<String> = validator.iter_errors(&value).map(|e| e.to_string()).collect();
        return Err(EngineError::SchemaMismatch(errors.join("; ")));
    }

    serde_json::from_value(value).map_err(|e| EngineError::SchemaMismatch(e.to_string()))
}
