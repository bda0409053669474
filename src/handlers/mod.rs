// src/handlers/mod.rs
pub mod health;
pub mod query;
pub mod script;
pub mod video;
pub mod visual;

use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use uuid::Uuid;

use crate::agent::{Agent, Event, Runner, State};
use crate::error::AppError;
use crate::{middleware, AppState, APP_NAME, USER_ID};

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::health_routes())
        .merge(query::query_routes())
        .merge(visual::visual_routes())
        .merge(script::script_routes())
        .merge(video::video_routes());

    let static_dir = &state.config.static_dir;
    if static_dir.is_dir() {
        tracing::info!("Serving static files from {}", static_dir.display());
        app = app.nest_service("/static", ServeDir::new(static_dir));
    }

    app.layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

/// Run `agent` on `message` in a throwaway session and return the new
/// events with the final session state. The session is removed afterwards.
pub(crate) async fn run_in_fresh_session(
    state: &AppState,
    agent: Arc<dyn Agent>,
    message: &str,
) -> Result<(Vec<Event>, State), AppError> {
    let session_id = Uuid::new_v4().to_string();
    state
        .sessions
        .create_session(APP_NAME, USER_ID, Some(&session_id), None)
        .await?;

    let runner = Runner::new(agent, APP_NAME, state.sessions.clone());
    let outcome = runner.run(USER_ID, &session_id, message).await;

    let session_state = state
        .sessions
        .get_session(APP_NAME, USER_ID, &session_id)
        .await
        .map(|s| s.state)
        .unwrap_or_default();
    state.sessions.delete_session(APP_NAME, USER_ID, &session_id).await;

    Ok((outcome?, session_state))
}
