use axum::{
    extract::{Extension, Json},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::run_in_fresh_session;
use crate::agent::{Agent, EventRole};
use crate::error::AppError;
use crate::retry::truncate;
use crate::AppState;

pub const DEFAULT_SCRIPT: &str = "Default script generation failed";

#[derive(Deserialize)]
pub struct ScriptRequest {
    #[serde(default)]
    pub campaign_content: String,
    #[serde(default)]
    pub visual_concept: String,
    #[serde(default)]
    pub company_name: String,
}

#[derive(Serialize)]
pub struct ScriptResponse {
    pub success: bool,
    pub script: String,
    pub campaign_content: String,
    pub visual_concept: String,
    pub message: String,
}

pub fn script_routes() -> Router {
    Router::new().route("/generate-script", post(generate_script))
}

fn script_request(request: &ScriptRequest) -> String {
    format!(
        "Write a Veo video script for this marketing campaign.\n\n\
         COMPANY: {}\n\n\
         SELECTED CAMPAIGN:\n{}\n\n\
         APPROVED VISUAL CONCEPT:\n{}\n\n\
         The script should run about 5 seconds in 16:9, use several camera angles and movements, describe \
         lighting and mood, integrate the brand naturally and contain NO visible text, words, letters, or \
         typography. Make it specific to this campaign and visual, not generic.",
        request.company_name, request.campaign_content, request.visual_concept
    )
}

/// POST /generate-script - run the script writer once and return its last answer
pub async fn generate_script(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ScriptRequest>,
) -> Result<Json<ScriptResponse>, AppError> {
    let agents = state.agents()?;
    tracing::info!(
        "Generating video script for {} (campaign: {}...)",
        request.company_name,
        truncate(&request.campaign_content, 100)
    );

    let writer: Arc<dyn Agent> = agents.script_writer.clone();
    let (events, _) = run_in_fresh_session(&state, writer, &script_request(&request)).await?;

    let script = events
        .iter()
        .rev()
        .filter(|e| e.role == EventRole::Model)
        .map(|e| e.text.trim())
        .find(|t| !t.is_empty())
        .unwrap_or(DEFAULT_SCRIPT)
        .to_string();

    Ok(Json(ScriptResponse {
        success: true,
        script,
        campaign_content: request.campaign_content,
        visual_concept: request.visual_concept,
        message: "Video script generated successfully".to_string(),
    }))
}
