use axum::{extract::State, routing::get, Json, Router};
use sculpt::profile::Profile;

use crate::state::AppState;

async fn list_profiles(State(state): State<AppState>) -> Json<Vec<Profile>> {
    Json(state.profiles.iter().cloned().collect())
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/profiles", get(list_profiles))
        .with_state(state)
}
