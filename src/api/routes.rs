//! REST endpoints: health, OTP send/check, and the agent message turn.
//!
//! Error contract: missing/invalid input → 400 with `{ok:false, error}`;
//! store failures → 500 with a generic message (detail goes to the log).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::error;
use uuid::Uuid;

use crate::auth::PhoneVerifier;
use crate::error::OtpError;
use crate::qualify::types::Criteria;
use crate::qualify::ConversationProcessor;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    pub verifier: Arc<PhoneVerifier>,
    pub processor: Arc<ConversationProcessor>,
}

/// Build the Axum router with all API routes.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/send-otp", post(send_otp))
        .route("/auth/check-otp", post(check_otp))
        .route("/agent/message", post(agent_message))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── DTOs ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SendOtpRequest {
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckOtpRequest {
    phone: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentMessageRequest {
    buyer_id: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentMessageResponse {
    reply: String,
    /// `null` when nothing was extracted this turn.
    saved_search: Option<Criteria>,
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"ok": false, "error": message})),
    )
        .into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"ok": false, "error": "internal error"})),
    )
        .into_response()
}

/// Treat missing and blank strings the same way.
fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"ok": true}))
}

async fn send_otp(
    State(state): State<ApiState>,
    Json(req): Json<SendOtpRequest>,
) -> Response {
    let Some(phone) = required(req.phone) else {
        return bad_request("phone is required");
    };

    match state.verifier.issue_code(&phone).await {
        Ok(()) => Json(serde_json::json!({"ok": true})).into_response(),
        Err(e) => {
            error!(error = %e, "send-otp failed");
            internal_error()
        }
    }
}

async fn check_otp(
    State(state): State<ApiState>,
    Json(req): Json<CheckOtpRequest>,
) -> Response {
    let Some(phone) = required(req.phone) else {
        return bad_request("phone is required");
    };
    let Some(code) = required(req.code) else {
        return bad_request("code is required");
    };

    match state.verifier.verify_code(&phone, &code).await {
        Ok(buyer_id) => {
            Json(serde_json::json!({"ok": true, "buyerId": buyer_id})).into_response()
        }
        Err(OtpError::InvalidOrExpired) => bad_request("invalid or expired code"),
        Err(OtpError::Database(e)) => {
            error!(error = %e, "check-otp failed");
            internal_error()
        }
    }
}

async fn agent_message(
    State(state): State<ApiState>,
    Json(req): Json<AgentMessageRequest>,
) -> Response {
    let Some(buyer_id) = required(req.buyer_id) else {
        return bad_request("buyerId is required");
    };
    let Some(message) = required(req.message) else {
        return bad_request("message is required");
    };
    let Ok(buyer_id) = Uuid::parse_str(&buyer_id) else {
        return bad_request("buyerId is not a valid id");
    };

    match state.processor.handle_message(buyer_id, &message).await {
        Ok(outcome) => Json(AgentMessageResponse {
            reply: outcome.reply,
            saved_search: outcome.saved_search,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, buyer_id = %buyer_id, "agent message failed");
            internal_error()
        }
    }
}
