//! Liveness endpoint

use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};

use crate::server::AppState;

/// `GET /health`
///
/// Reports whether the token module finished initializing. Never triggers
/// initialization itself.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "wasmInitialized": state.tokens.is_ready(),
    }))
}
