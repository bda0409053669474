use axum::{
    extract::{Extension, Json},
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::specialists::visual_concept::{InstagramPost, VisualConcept};
use crate::AppState;

#[derive(Deserialize)]
pub struct VisualConceptRequest {
    #[serde(default)]
    pub concept: String,
    #[serde(default)]
    pub campaign_content: Option<String>,
}

#[derive(Deserialize)]
pub struct InstagramContentRequest {
    #[serde(default)]
    pub campaign_content: String,
    #[serde(default = "default_concept_number")]
    pub concept_number: u32,
}

fn default_concept_number() -> u32 {
    1
}

pub fn visual_routes() -> Router {
    Router::new()
        .route("/generate-visual", post(generate_visual))
        .route("/generate-instagram-content", post(generate_instagram_content))
}

/// POST /generate-visual - caption, description and image for a concept
pub async fn generate_visual(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<VisualConceptRequest>,
) -> Result<Json<VisualConcept>, AppError> {
    let agents = state.agents()?;
    tracing::info!(
        "Generating visual for concept '{}' (campaign content: {})",
        request.concept,
        request.campaign_content.is_some()
    );
    let result = agents
        .visuals
        .generate_visual(&request.concept, request.campaign_content.as_deref())
        .await?;
    Ok(Json(result))
}

/// POST /generate-instagram-content - failures come back in the body with `success: false`
pub async fn generate_instagram_content(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<InstagramContentRequest>,
) -> Result<Json<InstagramPost>, AppError> {
    let agents = state.agents()?;
    tracing::info!("Generating Instagram content for concept #{}", request.concept_number);
    let post = agents
        .visuals
        .generate_instagram_content(&request.campaign_content, request.concept_number)
        .await;
    Ok(Json(post))
}
