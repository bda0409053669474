// lib.rs - campaign pipeline service: API clients, agent runtime, specialists and HTTP layer
pub mod agent;
pub mod config;
pub mod error;
pub mod gemini_client;
pub mod grok_client;
pub mod handlers;
pub mod middleware;
pub mod parsing;
pub mod retry;
pub mod specialists;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use agent::InMemorySessionService;
use config::AppConfig;
use error::{AppError, ClientError};
use gemini_client::GeminiClient;
use grok_client::GrokClient;
use specialists::AgentSuite;

pub const APP_NAME: &str = "marketing_campaign_app";
pub const USER_ID: &str = "api_user";

/// Shared state behind every handler
pub struct AppState {
    pub config: AppConfig,
    pub sessions: Arc<InMemorySessionService>,
    /// `None` when GOOGLE_API_KEY is not configured
    pub agents: Option<AgentSuite>,
    pub grok_configured: bool,
}

impl AppState {
    pub fn new(config: AppConfig, gemini: Option<GeminiClient>, grok: Option<GrokClient>) -> Self {
        let grok = grok.map(Arc::new);
        let grok_configured = grok.is_some();
        let agents = gemini.map(|client| AgentSuite::build(&config, Arc::new(client), grok));
        Self {
            config,
            sessions: Arc::new(InMemorySessionService::new()),
            agents,
            grok_configured,
        }
    }

    /// Build the API clients for whichever keys are configured
    pub fn from_config(config: AppConfig) -> Result<Self, ClientError> {
        let gemini = match &config.google_api_key {
            Some(key) => Some(GeminiClient::new(key.clone(), config.gemini_base_url.clone(), config.http_timeout)?),
            None => None,
        };
        let grok = match &config.grok_api_key {
            Some(key) => Some(GrokClient::new(key.clone(), config.grok_base_url.clone(), config.grok_model.clone())?),
            None => None,
        };
        Ok(Self::new(config, gemini, grok))
    }

    pub fn agents(&self) -> Result<&AgentSuite, AppError> {
        self.agents.as_ref().ok_or(AppError::MissingCredential("GOOGLE_API_KEY"))
    }
}
