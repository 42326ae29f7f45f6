use anyhow::{anyhow, Result};
use regex::Regex;
use reqwest::{Response, StatusCode};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;

use super::base::{OutputSchema, Usage};
use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

/// Convert internal Message format to OpenAI's API message specification
///
/// A tool response may only answer a call sent in `tool_calls`. Responses to
/// malformed requests, which are never sent, go out as a user message after the
/// run of tool messages instead.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();
    let mut sent_calls = HashSet::new();
    let mut unanswered = Vec::new();

    for message in messages {
        if message.role != Role::Tool {
            messages_spec.append(&mut unanswered);
        }

        let mut converted = Map::new();
        converted.insert("role".to_string(), json!(message.role));

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.text.is_empty() {
                        texts.push(text.text.as_str());
                    }
                }
                // Malformed requests never reach the wire
                MessageContent::ToolRequest(request) => {
                    if let Ok(tool_call) = &request.tool_call {
                        sent_calls.insert(request.id.clone());
                        tool_calls.push(json!({
                            "id": request.id,
                            "type": "function",
                            "function": {
                                "name": sanitize_function_name(&tool_call.name),
                                "arguments": tool_call.arguments.to_string(),
                            }
                        }));
                    }
                }
                MessageContent::ToolResponse(response) => {
                    let text = tool_result_text(&response.tool_result);
                    if sent_calls.contains(&response.id) {
                        output.push(json!({
                            "role": "tool",
                            "content": text,
                            "tool_call_id": response.id
                        }));
                    } else {
                        unanswered.push(json!({
                            "role": "user",
                            "content": format!("Tool call {} could not be run.\n{}", response.id, text)
                        }));
                    }
                }
            }
        }

        if !texts.is_empty() {
            converted.insert("content".to_string(), json!(texts.join("\n")));
        }
        if !tool_calls.is_empty() {
            converted.insert("tool_calls".to_string(), json!(tool_calls));
        }
        // Tool role messages are fully represented by their responses
        if message.role != Role::Tool
            && (converted.contains_key("content") || converted.contains_key("tool_calls"))
        {
            output.insert(0, Value::Object(converted));
        }
        messages_spec.extend(output);
    }
    messages_spec.append(&mut unanswered);

    messages_spec
}

/// Text shown to the model for a tool result. Errors are shown as output so the
/// model can interpret the error message.
pub fn tool_result_text(result: &Result<Value, AgentError>) -> String {
    match result {
        Ok(Value::String(text)) => text.clone(),
        Ok(value) => value.to_string(),
        Err(e) => format!("The tool call returned the following error:\n{}", e),
    }
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// `response_format` asking for a JSON document matching the schema
pub fn output_to_response_format(output: &OutputSchema) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": sanitize_function_name(&output.name),
            "schema": output.schema,
        }
    })
}

/// Build a chat/completions payload shared by every OpenAI compatible backend
pub fn create_openai_request_payload(
    model: &str,
    messages: &[Message],
    tools: &[Tool],
    output: Option<&OutputSchema>,
    temperature: Option<f32>,
) -> Result<Value> {
    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(model));
    payload.insert(
        "messages".to_string(),
        json!(messages_to_openai_spec(messages)),
    );

    let tools_spec = tools_to_openai_spec(tools)?;
    if !tools_spec.is_empty() {
        payload.insert("tools".to_string(), json!(tools_spec));
    }
    if let Some(output) = output {
        payload.insert(
            "response_format".to_string(),
            output_to_response_format(output),
        );
    }
    if let Some(temp) = temperature {
        payload.insert("temperature".to_string(), json!(temp));
    }

    Ok(Value::Object(payload))
}

/// Map an HTTP response to its JSON body, or a descriptive error
pub async fn handle_response(payload: &Value, response: Response) -> Result<Value> {
    match response.status() {
        StatusCode::OK => Ok(response.json().await?),
        status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
            Err(anyhow!("Server error: {}", status))
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%payload, "rejected request payload");
            Err(anyhow!("Request failed: {}\n{}", status, body))
        }
    }
}

/// Turn a response body into a message and its usage, surfacing API errors
pub fn openai_response_to_result(response: Value) -> Result<(Message, Usage)> {
    if let Some(error) = response.get("error") {
        if let Some(err) = check_openai_context_length_error(error) {
            return Err(err.into());
        }
        return Err(anyhow!("API error: {}", error));
    }

    let usage = get_openai_usage(&response);
    let message = openai_response_to_message(response)?;
    Ok((message, usage))
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No choices in response: {}", response))?;

    let mut message = Message::assistant();

    if let Some(text) = original.get("content").and_then(Value::as_str) {
        message = message.with_text(text);
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(Value::as_array) {
        for tool_call in tool_calls {
            let id = match tool_call["id"].as_str() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => uuid::Uuid::new_v4().to_string(),
            };
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = match &tool_call["function"]["arguments"] {
                Value::String(raw) => raw.clone(),
                Value::Null => String::new(),
                // Some backends send arguments as an object
                other => other.to_string(),
            };

            if !is_valid_function_name(&function_name) {
                let error = AgentError::ToolNotFound(format!(
                    "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                    function_name
                ));
                message = message.with_tool_request(id, Err(error));
                continue;
            }

            let parsed = if arguments.trim().is_empty() {
                Ok(json!({}))
            } else {
                serde_json::from_str::<Value>(&arguments)
            };
            match parsed {
                Ok(params) => {
                    message =
                        message.with_tool_request(id, Ok(ToolCall::new(function_name, params)));
                }
                Err(e) => {
                    let error = AgentError::InvalidParameters(format!(
                        "Could not interpret tool use parameters for id {}: {}",
                        id, e
                    ));
                    message = message.with_tool_request(id, Err(error));
                }
            }
        }
    }

    Ok(message)
}

pub fn get_openai_usage(data: &Value) -> Usage {
    let Some(usage) = data.get("usage") else {
        return Usage::default();
    };

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Usage::new(input_tokens, output_tokens, total_tokens)
}

fn invalid_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("valid regex"))
}

fn sanitize_function_name(name: &str) -> String {
    invalid_chars().replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    !name.is_empty() && !invalid_chars().is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
