use axum::{extract::State, routing::post, Json, Router};
use sculpt::providers::factory::ModelRef;
use sculpt::translate::{default_translation_model, translate, TranslationInput, TranslationOutput};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TranslateRequest {
    #[serde(flatten)]
    input: TranslationInput,
    #[serde(default)]
    model: Option<ModelRef>,
}

async fn translate_text(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslationOutput>, ApiError> {
    let model = request.model.unwrap_or_else(default_translation_model);
    let cancel = state.cancel.child_token();
    let result = translate(&state.engine, &model, &request.input, &cancel).await?;
    Ok(Json(result.value))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/translate", post(translate_text))
        .with_state(state)
}
