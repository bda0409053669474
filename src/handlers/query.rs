// src/handlers/query.rs
//! Campaign planning endpoints backed by the coordinator and the research → creative pipeline

use axum::{
    extract::{Extension, Json},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::run_in_fresh_session;
use crate::agent::{final_response, Agent};
use crate::error::AppError;
use crate::parsing::{parse_campaign_pitches, CampaignPitch};
use crate::specialists::research;
use crate::AppState;

pub const NO_RESPONSE: &str = "No response generated from agent";

#[derive(Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub response: String,
    pub campaigns: Vec<CampaignPitch>,
}

#[derive(Deserialize)]
pub struct PipelineRequest {
    pub company_name: String,
    #[serde(default)]
    pub goals_audience: String,
    #[serde(default)]
    pub company_url: Option<String>,
}

#[derive(Serialize)]
pub struct PipelineResponse {
    pub research_report: String,
    pub response: String,
    pub campaigns: Vec<CampaignPitch>,
}

pub fn query_routes() -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/generate-pipeline", post(generate_pipeline))
}

/// POST /query - free-form request to the marketing coordinator
pub async fn query(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("query must not be empty".to_string()));
    }
    let agents = state.agents()?;
    tracing::info!("Processing query ({} chars)", request.query.len());

    let coordinator: Arc<dyn Agent> = agents.coordinator.clone();
    let (events, _) = run_in_fresh_session(&state, coordinator, &request.query).await?;

    let mut response = final_response(&events);
    if response.is_empty() {
        response = NO_RESPONSE.to_string();
    }
    let campaigns = parse_campaign_pitches(&response);
    tracing::info!("Coordinator answered with {} campaign pitches", campaigns.len());

    Ok(Json(QueryResponse { response, campaigns }))
}

/// POST /generate-pipeline - research then creative, in order
pub async fn generate_pipeline(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<PipelineRequest>,
) -> Result<Json<PipelineResponse>, AppError> {
    if request.company_name.trim().is_empty() {
        return Err(AppError::BadRequest("company_name must not be empty".to_string()));
    }
    let agents = state.agents()?;

    let mut message = format!("Company: {}\n", request.company_name.trim());
    if let Some(url) = request.company_url.as_deref().filter(|u| !u.trim().is_empty()) {
        message.push_str(&format!("Website: {}\n", url.trim()));
    }
    message.push_str(&format!("Goals and target audience: {}", request.goals_audience.trim()));

    let pipeline: Arc<dyn Agent> = agents.pipeline.clone();
    let (events, session_state) = run_in_fresh_session(&state, pipeline, &message).await?;

    let research_report = match session_state.get(research::OUTPUT_KEY) {
        Some(Value::String(report)) => report.clone(),
        _ => String::new(),
    };
    let mut response = final_response(&events);
    if response.is_empty() {
        response = NO_RESPONSE.to_string();
    }
    let campaigns = parse_campaign_pitches(&response);

    Ok(Json(PipelineResponse {
        research_report,
        response,
        campaigns,
    }))
}
