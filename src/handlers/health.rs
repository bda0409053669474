use axum::{extract::Extension, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;

pub fn health_routes() -> Router {
    Router::new().route("/", get(root))
}

/// GET / - liveness plus which integrations are configured
pub async fn root(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "Marketing campaign API is running",
        "integrations": {
            "gemini": state.agents.is_some(),
            "grok": state.grok_configured,
        },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
