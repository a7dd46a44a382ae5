//! Instagram webhook endpoints (/webhook)

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use std::sync::Arc;

use crate::AppState;
use crate::services::webhook::{HandshakeQuery, verify_handshake};

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/webhook", get(verify).post(receive))
}

/// GET /webhook - Subscription handshake, echoes the challenge
async fn verify(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HandshakeQuery>,
) -> Result<String, StatusCode> {
    match verify_handshake(&query, &state.verify_token) {
        Ok(challenge) => {
            tracing::info!("Webhook verified");
            Ok(challenge)
        }
        Err(e) => {
            tracing::warn!("{e}");
            Err(StatusCode::FORBIDDEN)
        }
    }
}

/// POST /webhook - Acknowledge immediately, process in the background
async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let dispatcher = state.webhook.clone();
    tokio::spawn(async move {
        dispatcher
            .handle_delivery(signature.as_deref(), &body)
            .await;
    });

    StatusCode::OK
}
