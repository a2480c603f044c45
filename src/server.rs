//! HTTP front end.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Health check, returns `"OK"` |
//! | `POST` | `/slack/` | Slack slash command; answered asynchronously via `response_url` |
//! | `POST` | `/query/` | Synchronous question answering |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "unauthorized", "message": "Invalid token" } }
//! ```
//!
//! Error codes: `unauthorized` (401), `bad_request` (400), `queue_full` (503),
//! `internal` (500).
//!
//! `/slack/` only accepts `application/x-www-form-urlencoded` bodies. Any
//! other content type is refused by the form extractor with a plain 415
//! before the token is checked.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front ends can
//! call `/query/` directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::answer::{answer, Answer};
use crate::config::ReplyMode;
use crate::services::Services;
use crate::tasks::{EnqueueError, Job, TaskQueue};

/// Acknowledgement sent to Slack before the job runs.
pub const SLACK_ACK: &str = "Processing your request...";

#[derive(Clone)]
pub struct AppState {
    services: Arc<Services>,
    queue: TaskQueue,
    slack_token: Arc<str>,
    reply_mode: ReplyMode,
    k: usize,
}

impl AppState {
    pub fn new(services: Arc<Services>, queue: TaskQueue, slack_token: impl Into<Arc<str>>) -> Self {
        let reply_mode = services.config.slack.reply_mode;
        let k = services.config.retrieval.k;
        Self {
            services,
            queue,
            slack_token: slack_token.into(),
            reply_mode,
            k,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_health))
        .route("/slack/", post(handle_slack))
        .route("/slack", post(handle_slack))
        .route("/query/", post(handle_query))
        .route("/query", post(handle_query))
        .layer(cors)
        .with_state(state)
}

/// Start the workers and serve on `server.bind` until the process exits.
///
/// Fails before binding when `SLACK_TOKEN` is missing.
pub async fn run_server(services: Arc<Services>) -> anyhow::Result<()> {
    let slack_token = services.config.require_slack_token()?.to_string();
    let bind_addr = services.config.server.bind.clone();

    let (queue, _workers) = TaskQueue::start(services.clone(), &services.config.tasks)?;
    let app = build_router(AppState::new(services, queue, slack_token));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    println!("info-gpt listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

fn bad_request(message: impl Into<String>) -> AppError {
    error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn internal(message: impl Into<String>) -> AppError {
    error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<EnqueueError> for AppError {
    fn from(err: EnqueueError) -> Self {
        match err {
            EnqueueError::Full => error(StatusCode::SERVICE_UNAVAILABLE, "queue_full", err.to_string()),
            EnqueueError::Closed => internal(err.to_string()),
        }
    }
}

// ============ GET / ============

async fn handle_health() -> Json<&'static str> {
    Json("OK")
}

// ============ POST /slack/ ============

/// The slash-command fields we use; Slack sends more.
#[derive(Debug, Deserialize)]
pub struct SlackCommand {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub response_url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlackAck {
    pub text: String,
}

/// Byte comparison that does not stop at the first difference.
fn tokens_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len()
        && given
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

async fn handle_slack(
    State(state): State<AppState>,
    Form(command): Form<SlackCommand>,
) -> Result<Json<SlackAck>, AppError> {
    if !tokens_match(&command.token, &state.slack_token) {
        tracing::warn!("rejected slack command with invalid token");
        return Err(unauthorized("Invalid token"));
    }
    if command.response_url.trim().is_empty() {
        return Err(bad_request("response_url must not be empty"));
    }

    let job = Job::for_mode(
        state.reply_mode,
        command.text,
        command.response_url,
        state.k,
    );
    state.queue.try_enqueue(job)?;

    Ok(Json(SlackAck {
        text: SLACK_ACK.to_string(),
    }))
}

// ============ POST /query/ ============

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query_text: String,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Answer>, AppError> {
    if request.query_text.trim().is_empty() {
        return Err(bad_request("query_text must not be empty"));
    }

    let model = state
        .services
        .model()
        .map_err(|e| internal(e.to_string()))?;
    let reply = answer(&state.services.retriever, model, &request.query_text)
        .await
        .map_err(|e| {
            tracing::error!(query = %request.query_text, error = %e, "query failed");
            internal(e.to_string())
        })?;

    Ok(Json(reply))
}
