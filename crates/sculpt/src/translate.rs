//! Single-shot structured translation, without the tool loop.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::engine::{ConversationEngine, EngineError, StructuredResult};
use crate::models::message::Message;
use crate::prompt_template::load_prompt_file;
use crate::providers::factory::{ModelRef, ProviderType};
use crate::providers::ollama::OLLAMA_MODEL;

pub const TRANSLATION_TEMPLATE: &str = "translation.md";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationInput {
    pub text: String,
    pub source: String,
    pub target: String,
    #[serde(default = "default_domain")]
    pub domain: String,
}

fn default_domain() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranslationOutput {
    pub translated: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("failed to render translation prompt: {0}")]
    Render(#[from] tera::Error),

    #[error("failed to generate translation: {0}")]
    Engine(#[from] EngineError),
}

pub fn default_translation_model() -> ModelRef {
    ModelRef::new(ProviderType::Ollama, OLLAMA_MODEL)
}

pub async fn translate(
    engine: &ConversationEngine,
    model: &ModelRef,
    input: &TranslationInput,
    cancel: &CancellationToken,
) -> Result<StructuredResult<TranslationOutput>, TranslateError> {
    let prompt = load_prompt_file(TRANSLATION_TEMPLATE, input)?;
    tracing::info!(source = %input.source, target = %input.target, model = %model, "translating");

    let result = engine
        .generate_data(model, vec![Message::user().with_text(prompt)], None, cancel)
        .await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ToolCatalog;
    use crate::providers::factory::ProviderRegistry;
    use crate::providers::mock::MockProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_translate_renders_prompt_and_decodes() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text(r#"{"translated": "안녕하세요"}"#),
        ]));
        let mut providers = ProviderRegistry::new();
        providers.insert(ProviderType::Ollama, provider.clone());
        let engine = ConversationEngine::new(Arc::new(ToolCatalog::new()), Arc::new(providers));

        let input: TranslationInput = serde_json::from_value(serde_json::json!({
            "text": "Hello",
            "source": "English",
            "target": "Korean"
        }))
        .unwrap();
        assert_eq!(input.domain, "general");

        let result = translate(
            &engine,
            &default_translation_model(),
            &input,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(result.value.translated, "안녕하세요");

        let calls = provider.calls();
        assert_eq!(calls[0].model, OLLAMA_MODEL);
        let prompt = calls[0].messages[0].text();
        assert!(prompt.contains("specializing in general"));
        assert!(prompt.contains("from English to Korean"));
        assert!(prompt.ends_with("Hello\n") || prompt.ends_with("Hello"));
    }
}
