use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use sculpt::batch::{BatchError, BatchOrchestrator};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct FlowRequest {
    #[serde(alias = "path")]
    pub root_path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FlowResponse {
    pub modified_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run a profile over a directory tree. Files rewritten before a failure are
/// still reported alongside the error.
async fn run_flow(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<FlowRequest>,
) -> Result<Response, ApiError> {
    let profile = state
        .profiles
        .get(&name)
        .cloned()
        .ok_or(ApiError::ProfileNotFound(name))?;

    tracing::info!(profile = %profile.name, root = %request.root_path.display(), "starting flow");
    let orchestrator = BatchOrchestrator::new(state.engine.clone(), profile);
    let cancel = state.cancel.child_token();
    let result = orchestrator.run(&request.root_path, &cancel).await;

    let modified_files = result
        .modified
        .iter()
        .map(|path| path.display().to_string())
        .collect();

    let (status, error) = match result.error {
        None => (StatusCode::OK, None),
        Some(err) => {
            tracing::error!("flow failed: {}", err);
            let status = match err {
                BatchError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Some(err.to_string()))
        }
    };

    Ok((
        status,
        Json(FlowResponse {
            modified_files,
            error,
        }),
    )
        .into_response())
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/flows/:profile", post(run_flow))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{read_json, state_with};
    use axum::{body::Body, http::Request};
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn flow_request(profile: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .uri(format!("/flows/{}", profile))
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_flow_rewrites_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "old\n").unwrap();
        fs::write(dir.path().join("skip.md"), "untouched\n").unwrap();

        let app = routes(state_with(vec!["done", r#"{"code": "new"}"#]));
        let response = app
            .oneshot(flow_request(
                "plain",
                json!({ "root_path": dir.path().display().to_string() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        let expected = dir.path().join("a.txt").display().to_string();
        assert_eq!(body["modified_files"], json!([expected]));
        assert!(body.get("error").is_none());
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "new");
        assert_eq!(
            fs::read_to_string(dir.path().join("skip.md")).unwrap(),
            "untouched\n"
        );
    }

    #[tokio::test]
    async fn test_flow_accepts_path_alias() {
        let dir = tempdir().unwrap();
        let app = routes(state_with(vec![]));

        let response = app
            .oneshot(flow_request(
                "plain",
                json!({ "path": dir.path().display().to_string() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["modified_files"], json!([]));
    }

    #[tokio::test]
    async fn test_flow_unknown_profile() {
        let app = routes(state_with(vec![]));
        let response = app
            .oneshot(flow_request("nope", json!({ "root_path": "." })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            read_json(response).await["error"],
            "Profile not found: nope"
        );
    }

    #[tokio::test]
    async fn test_flow_failure_reports_prefix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "one\n").unwrap();
        fs::write(dir.path().join("b.txt"), "two\n").unwrap();

        // a.txt succeeds, b.txt gets an answer that is not valid JSON
        let app = routes(state_with(vec![
            "done",
            r#"{"code": "uno"}"#,
            "done",
            "not json",
        ]));
        let response = app
            .oneshot(flow_request(
                "plain",
                json!({ "root_path": dir.path().display().to_string() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_json(response).await;
        let a = dir.path().join("a.txt").display().to_string();
        assert_eq!(body["modified_files"], json!([a]));
        assert!(body["error"].as_str().unwrap().contains("b.txt"));
        assert_eq!(fs::read_to_string(dir.path().join("b.txt")).unwrap(), "two\n");
    }

    #[tokio::test]
    async fn test_flow_after_shutdown() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "one\n").unwrap();

        let state = state_with(vec!["done", r#"{"code": "uno"}"#]);
        state.cancel.cancel();
        let response = routes(state)
            .oneshot(flow_request(
                "plain",
                json!({ "root_path": dir.path().display().to_string() }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "one\n");
    }
}
