//! Registry of the capabilities a model may call during a conversation.
//!
//! Every capability exposes the same untyped signature, `(ToolContext, Value) ->
//! AgentResult<Value>`, so the engine can dispatch by name at runtime. Most
//! capabilities are written against [`TypedCapability`] instead and get the
//! untyped form, along with generated input and output schemas, for free.
use async_trait::async_trait;
use jsonschema::Validator;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use strum_macros::{Display, EnumString};
use tokio_util::sync::CancellationToken;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};

/// Broad family a capability belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Definition, usage and structure lookups backed by the structural search engine
    StructuralLookup,
    /// Single bounded filesystem operations
    Filesystem,
    /// Everything else, e.g. the current time
    Utility,
}

/// Per-call context handed to a capability
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Id of the tool request this call answers
    pub call_id: String,
    /// Fires when the surrounding engine run is cancelled
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new<S: Into<String>>(call_id: S, cancel: CancellationToken) -> Self {
        Self {
            call_id: call_id.into(),
            cancel,
        }
    }
}

/// A named operation the model can invoke mid-conversation
#[async_trait]
pub trait Capability: Send + Sync {
    /// Descriptor shown to the model, including input and output schemas
    fn tool(&self) -> Tool;

    fn kind(&self) -> CapabilityKind;

    /// Run the capability with arguments that already passed schema validation
    async fn call(&self, ctx: &ToolContext, input: Value) -> AgentResult<Value>;
}

/// Strongly typed capability; a blanket impl provides [`Capability`].
#[async_trait]
pub trait TypedCapability: Send + Sync {
    type Input: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + JsonSchema + Send;

    /// Unique name the model refers to the capability by
    const NAME: &'static str;

    /// Description shown to the model
    fn description(&self) -> &str;

    fn kind(&self) -> CapabilityKind;

    async fn run(&self, ctx: &ToolContext, input: Self::Input) -> AgentResult<Self::Output>;
}

#[async_trait]
impl<T: TypedCapability> Capability for T {
    fn tool(&self) -> Tool {
        Tool::new(T::NAME, self.description(), schema_value::<T::Input>())
            .with_output_schema(schema_value::<T::Output>())
    }

    fn kind(&self) -> CapabilityKind {
        TypedCapability::kind(self)
    }

    async fn call(&self, ctx: &ToolContext, input: Value) -> AgentResult<Value> {
        let typed: T::Input = serde_json::from_value(input)
            .map_err(|e| AgentError::InvalidParameters(e.to_string()))?;
        let output = self.run(ctx, typed).await?;
        serde_json::to_value(output).map_err(|e| AgentError::Internal(e.to_string()))
    }
}

/// Generate an inline JSON schema for `T`, without the `$schema` and `title` keys
/// that providers do not need.
pub fn schema_value<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();
    let mut value = serde_json::to_value(generator.into_root_schema_for::<T>())
        .unwrap_or_else(|_| json!({"type": "object", "properties": {}}));
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    value
}

struct Entry {
    tool: Tool,
    kind: CapabilityKind,
    validator: Validator,
    capability: Arc<dyn Capability>,
}

/// Name-keyed registry of capabilities.
///
/// Built once at startup and then shared read-only (usually behind an `Arc`)
/// between every engine run.
#[derive(Default)]
pub struct ToolCatalog {
    entries: BTreeMap<String, Entry>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability, replacing any prior entry with the same name
    pub fn register<C>(&mut self, capability: C) -> AgentResult<()>
    where
        C: Capability + 'static,
    {
        self.register_arc(Arc::new(capability))
    }

    pub fn register_arc(&mut self, capability: Arc<dyn Capability>) -> AgentResult<()> {
        let tool = capability.tool();
        let validator = jsonschema::validator_for(&tool.input_schema).map_err(|e| {
            AgentError::Internal(format!("invalid input schema for {}: {}", tool.name, e))
        })?;
        let entry = Entry {
            kind: capability.kind(),
            tool,
            validator,
            capability,
        };
        self.entries.insert(entry.tool.name.clone(), entry);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.entries.get(name).map(|entry| &entry.tool)
    }

    pub fn kind(&self, name: &str) -> Option<CapabilityKind> {
        self.entries.get(name).map(|entry| entry.kind)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve an active subset into the tool definitions offered to the model
    pub fn tools<S: AsRef<str>>(&self, subset: &[S]) -> AgentResult<Vec<Tool>> {
        subset
            .iter()
            .map(|name| {
                self.get(name.as_ref())
                    .cloned()
                    .ok_or_else(|| AgentError::ToolNotFound(name.as_ref().to_string()))
            })
            .collect()
    }

    /// Validate the call's arguments against the declared input schema and run it
    pub async fn dispatch(&self, ctx: &ToolContext, call: &ToolCall) -> AgentResult<Value> {
        let entry = self
            .entries
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        if !entry.validator.is_valid(&call.arguments) {
            let errors: Vec<String> = entry
                .validator
                .iter_errors(&call.arguments)
                .map(|e| e.to_string())
                .collect();
            return Err(AgentError::InvalidParameters(format!(
                "{}: {}",
                call.name,
                errors.join("; ")
            )));
        }

        entry
            .capability
            .call(ctx, call.arguments.clone())
            .await
    }
}

impl fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("tools", &self.names())
            .finish()
    }
}
