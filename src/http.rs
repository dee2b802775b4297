use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::GatewayError;
use crate::observability::ObservabilitySnapshot;
use crate::{ChatRequest, ChatResponse, Gateway, identity};

#[derive(Clone)]
pub struct GatewayHttpState {
    gateway: Arc<Gateway>,
}

impl GatewayHttpState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn router(state: GatewayHttpState) -> Router {
    Router::new()
        .route("/api/chat", post(chat).fallback(method_not_allowed))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn chat(
    State(state): State<GatewayHttpState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: axum::body::Bytes,
) -> std::result::Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    let request: ChatRequest = serde_json::from_slice(&body).map_err(|_| {
        error_response(StatusCode::BAD_REQUEST, "invalid JSON body".to_string())
    })?;

    let requester = identity::requester_key(&headers, peer.map(|ConnectInfo(addr)| addr));

    match state.gateway.handle(&requester, &request).await {
        Ok(response) => {
            state.gateway.log_event(
                "chat_completed",
                json!({"requester": requester, "cached": response.cached}),
            );
            Ok(Json(response))
        }
        Err(err) => {
            state.gateway.log_event(
                "chat_rejected",
                json!({"requester": requester, "error": err.to_string()}),
            );
            Err(map_gateway_error(err))
        }
    }
}

async fn method_not_allowed() -> (StatusCode, Json<ErrorBody>) {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "method not allowed".to_string(),
    )
}

async fn metrics(State(state): State<GatewayHttpState>) -> Json<ObservabilitySnapshot> {
    Json(state.gateway.observability())
}

fn map_gateway_error(err: GatewayError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        GatewayError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        GatewayError::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
        GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.to_string())
}

fn error_response(status: StatusCode, message: String) -> (StatusCode, Json<ErrorBody>) {
    (status, Json(ErrorBody { error: message }))
}
