//! REST endpoints for the intake session and plan download.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::error::{Error, SessionError};

use super::wizard::{IntakeWizard, TurnOutcome};

const PLAN_PATH: &str = "/api/session/plan.pdf";

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub wizard: Arc<IntakeWizard>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    content: String,
}

#[derive(Debug, Serialize)]
struct MessageReply {
    #[serde(flatten)]
    outcome: TurnOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_url: Option<&'static str>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/session
async fn get_status(State(state): State<IntakeRouteState>) -> impl IntoResponse {
    Json(state.wizard.status().await)
}

/// GET /api/session/transcript
async fn get_transcript(State(state): State<IntakeRouteState>) -> impl IntoResponse {
    Json(state.wizard.transcript().await)
}

/// POST /api/session/message
///
/// Runs one turn. A failed turn leaves the session untouched, so the client
/// can resend the same message.
async fn post_message(
    State(state): State<IntakeRouteState>,
    Json(body): Json<MessageBody>,
) -> axum::response::Response {
    match state.wizard.handle_input(&body.content).await {
        Ok(outcome) => {
            let download_url = outcome.document.as_ref().map(|_| PLAN_PATH);
            Json(MessageReply {
                outcome,
                download_url,
            })
            .into_response()
        }
        Err(Error::Session(SessionError::EmptyInput)) => {
            error_response(StatusCode::BAD_REQUEST, "Message content is empty")
        }
        Err(e @ Error::Llm(_)) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /api/session/plan.pdf
async fn get_plan(State(state): State<IntakeRouteState>) -> axum::response::Response {
    match state.wizard.document().await {
        Some(document) => (
            [
                (header::CONTENT_TYPE, document.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", document.filename),
                ),
            ],
            document.bytes,
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No wellness plan has been generated yet"),
    }
}

/// POST /api/session/reset
async fn post_reset(State(state): State<IntakeRouteState>) -> impl IntoResponse {
    let messages = state.wizard.reset().await;
    let status = state.wizard.status().await;
    Json(serde_json::json!({
        "messages": messages,
        "session": status,
    }))
}

/// Build the intake REST routes.
pub fn intake_routes(state: IntakeRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/session", get(get_status))
        .route("/api/session/transcript", get(get_transcript))
        .route("/api/session/message", post(post_message))
        .route(PLAN_PATH, get(get_plan))
        .route("/api/session/reset", post(post_reset))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
