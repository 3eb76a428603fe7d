//! HTTP route handlers.

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use taskpilot::core::path::PathViolation;
use taskpilot::dispatch::{UnresolvedTask, run_task};
use taskpilot::io::llm::LlmError;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/run", post(run))
        .route("/run/generate", post(run_generate))
        .route("/read", get(read_file))
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    task: String,
}

#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    path: String,
}

/// JSON error response; the body always carries `detail`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn detail(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "detail": detail.into() }),
        }
    }

    fn from_join(err: JoinError) -> Self {
        error!(err = %err, "blocking task failed");
        Self::detail(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn health() -> &'static str {
    "ok"
}

/// POST /run - classify the task and run the matching handler.
async fn run(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || {
        run_task(state.llm.as_ref(), &state.config, &request.task)
    })
    .await
    .map_err(ApiError::from_join)?;

    match outcome {
        Ok(run) => {
            info!(key = %run.key, "task handled");
            Ok(Json(json!({ "status": "success", "message": run.message })))
        }
        Err(err) => {
            let status = if err.downcast_ref::<UnresolvedTask>().is_some() {
                StatusCode::BAD_REQUEST
            } else if err.downcast_ref::<LlmError>().is_some() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            warn!(status = status.as_u16(), err = %format!("{err:#}"), "task failed");
            Err(ApiError::detail(status, format!("{err:#}")))
        }
    }
}

/// POST /run/generate - generate, execute, and validate code for the task.
async fn run_generate(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || {
        state
            .generator
            .run(state.llm.as_ref(), state.sandbox.as_ref(), &request.task)
    })
    .await
    .map_err(ApiError::from_join)?;

    match outcome {
        Ok(outcome) => Ok(Json(json!({
            "status": "success",
            "message": outcome.output.result,
            "output": outcome.output,
            "code": outcome.code,
            "attempts": outcome.attempts,
        }))),
        Err(failed) => {
            warn!(attempts = failed.attempts, "generation exhausted");
            Err(ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({
                    "detail": failed.to_string(),
                    "last_error": failed.last_error,
                    "code": failed.last_code,
                    "attempts": failed.attempts,
                }),
            })
        }
    }
}

/// GET /read?path=... - return a file under the data root.
async fn read_file(
    State(state): State<AppState>,
    Query(query): Query<ReadQuery>,
) -> Result<Json<Value>, ApiError> {
    let root = state.data_root();
    let path = root.resolve(&query.path).map_err(|err: PathViolation| {
        warn!(err = %err, "read refused");
        ApiError::detail(StatusCode::BAD_REQUEST, err.to_string())
    })?;
    if !path.is_file() {
        return Err(ApiError::detail(StatusCode::NOT_FOUND, "File not found"));
    }
    let content = root.read_to_string(&query.path).map_err(|err| {
        error!(err = %format!("{err:#}"), "read failed");
        ApiError::detail(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    })?;
    Ok(Json(json!({ "status": "success", "content": content })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use taskpilot::test_support::{ScriptedLlm, ScriptedSandbox, exec_exit, exec_ok, test_config};

    fn state_with(dir: &std::path::Path, llm: ScriptedLlm, sandbox: ScriptedSandbox) -> AppState {
        let cfg = test_config(dir);
        fs::create_dir_all(&cfg.data_root).expect("mkdir data");
        AppState::new(cfg, Arc::new(llm), Arc::new(sandbox)).expect("state")
    }

    fn task(text: &str) -> Json<TaskRequest> {
        Json(TaskRequest {
            task: text.to_string(),
        })
    }

    #[tokio::test]
    async fn run_returns_handler_message() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_with(
            temp.path(),
            ScriptedLlm::replies(["b8"]),
            ScriptedSandbox::new(Vec::new()),
        );

        let Json(body) = run(State(state), task("transcribe")).await.expect("ok");

        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "B8 executed: Audio transcription simulated.");
    }

    #[tokio::test]
    async fn run_maps_unresolved_to_bad_request() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_with(
            temp.path(),
            ScriptedLlm::replies(["unknown"]),
            ScriptedSandbox::new(Vec::new()),
        );

        let err = run(State(state), task("fly a kite")).await.unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.body["detail"],
            "Unknown or unmapped task identifier: unknown"
        );
    }

    #[tokio::test]
    async fn run_maps_upstream_failure_to_bad_gateway() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_with(
            temp.path(),
            ScriptedLlm::new(vec![Err(503)]),
            ScriptedSandbox::new(Vec::new()),
        );

        let err = run(State(state), task("count wednesdays")).await.unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn run_maps_handler_failure_to_internal_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_with(
            temp.path(),
            ScriptedLlm::replies(["a3"]),
            ScriptedSandbox::new(Vec::new()),
        );

        let err = run(State(state), task("count wednesdays")).await.unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            err.body["detail"]
                .as_str()
                .expect("detail")
                .contains("handler a3 failed")
        );
    }

    #[tokio::test]
    async fn generate_returns_output_code_and_attempts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_with(
            temp.path(),
            ScriptedLlm::replies(["bad", "good"]),
            ScriptedSandbox::new(vec![
                exec_exit(1, "boom"),
                exec_ok(r#"{"status":"success","result":"42"}"#),
            ]),
        );

        let Json(body) = run_generate(State(state), task("answer"))
            .await
            .expect("ok");

        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "42");
        assert_eq!(body["output"]["result"], "42");
        assert_eq!(body["code"], "good");
        assert_eq!(body["attempts"], 2);
    }

    #[tokio::test]
    async fn generate_exhaustion_reports_last_error_and_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_with(
            temp.path(),
            ScriptedLlm::replies(["one", "two", "three"]),
            ScriptedSandbox::new(vec![
                exec_exit(1, "first"),
                exec_exit(1, "second"),
                exec_exit(1, "third"),
            ]),
        );

        let err = run_generate(State(state), task("answer"))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body["attempts"], 3);
        assert_eq!(err.body["code"], "three");
        let last_error = err.body["last_error"].as_str().expect("last_error");
        assert!(last_error.contains("third"));
        assert!(!last_error.contains("first"));
        assert!(
            err.body["detail"]
                .as_str()
                .expect("detail")
                .contains("third")
        );
    }

    #[tokio::test]
    async fn read_returns_content_and_maps_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_with(
            temp.path(),
            ScriptedLlm::new(Vec::new()),
            ScriptedSandbox::new(Vec::new()),
        );
        fs::write(temp.path().join("data/notes.txt"), "hello").expect("write");

        let read = |path: &str| {
            read_file(
                State(state.clone()),
                Query(ReadQuery {
                    path: path.to_string(),
                }),
            )
        };

        let Json(body) = read("notes.txt").await.expect("ok");
        assert_eq!(body["content"], "hello");
        assert_eq!(body["status"], "success");

        let missing = read("missing.txt").await.unwrap_err();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let escape = read("../secret.txt").await.unwrap_err();
        assert_eq!(escape.status, StatusCode::BAD_REQUEST);

        let outside = read("/etc/passwd").await.unwrap_err();
        assert_eq!(outside.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_is_ok() {
        assert_eq!(health().await, "ok");
    }
}
