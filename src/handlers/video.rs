use axum::{
    extract::{Extension, Json, Path},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::retry::truncate;
use crate::specialists::veo_generator::VideoReport;
use crate::AppState;

#[derive(Deserialize)]
pub struct VideoRequest {
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub campaign_content: Option<String>,
    #[serde(default)]
    pub visual_concept: Option<String>,
}

pub fn video_routes() -> Router {
    Router::new()
        .route("/generate-video-direct", post(generate_video_direct))
        .route("/video-status/*operation", get(video_status))
}

/// POST /generate-video-direct - blocks until the video is ready or the wait runs out
pub async fn generate_video_direct(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<VideoRequest>,
) -> Result<Json<VideoReport>, AppError> {
    if request.script.trim().is_empty() {
        return Err(AppError::BadRequest("script must not be empty".to_string()));
    }
    let agents = state.agents()?;
    tracing::info!(
        "Generating video directly (campaign: {}, visual: {}): {}...",
        request.campaign_content.is_some(),
        request.visual_concept.is_some(),
        truncate(&request.script, 200)
    );
    Ok(Json(agents.veo.generate_video(&request.script).await))
}

/// GET /video-status/*operation - the operation name may contain slashes.
/// An empty tail never reaches this handler.
pub async fn video_status(
    Extension(state): Extension<Arc<AppState>>,
    Path(operation): Path<String>,
) -> Result<Json<VideoReport>, AppError> {
    let agents = state.agents()?;
    Ok(Json(agents.veo.check_video_status(operation.trim_start_matches('/')).await))
}
