pub mod flows;
pub mod profiles;
pub mod translate;

use axum::Router;

use crate::state::AppState;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(flows::routes(state.clone()))
        .merge(translate::routes(state.clone()))
        .merge(profiles::routes(state))
}
