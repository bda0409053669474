// src/specialists/mod.rs
//! The campaign team: one agent per stage of research → creative → visual →
//! script → video, plus the coordinator that delegates to them.

use std::sync::Arc;

use crate::agent::{Agent, LlmAgent, SequentialAgent};
use crate::config::AppConfig;
use crate::gemini_client::GeminiClient;
use crate::grok_client::GrokClient;

pub mod creative_director;
pub mod marketing;
pub mod research;
pub mod script_writer;
pub mod veo_generator;
pub mod visual_concept;

pub use creative_director::CreativeAssistant;
pub use veo_generator::VeoGenerator;
pub use visual_concept::VisualConceptService;

/// Every agent and service the HTTP layer needs, built once at start-up
pub struct AgentSuite {
    pub coordinator: Arc<LlmAgent>,
    pub pipeline: Arc<SequentialAgent>,
    pub script_writer: Arc<LlmAgent>,
    pub visuals: VisualConceptService,
    pub veo: VeoGenerator,
}

impl AgentSuite {
    pub fn build(config: &AppConfig, gemini: Arc<GeminiClient>, grok: Option<Arc<GrokClient>>) -> Self {
        let model = config.agent_model.as_str();
        let visuals = VisualConceptService::new(gemini.clone(), model, &config.image_model);
        let veo = VeoGenerator::new(
            gemini.clone(),
            &config.video_model,
            config.veo_poll_interval,
            config.veo_max_wait,
        );

        let research: Arc<dyn Agent> = Arc::new(research::research_agent(gemini.clone(), model));
        let creative: Arc<dyn Agent> = Arc::new(creative_director::creative_director_agent(
            gemini.clone(),
            model,
            CreativeAssistant::new(grok),
        ));
        let visual: Arc<dyn Agent> = Arc::new(visual_concept::visual_concept_agent(
            gemini.clone(),
            model,
            visuals.clone(),
        ));
        let script_writer = Arc::new(script_writer::script_writer_agent(gemini.clone(), model));
        let video: Arc<dyn Agent> = Arc::new(veo_generator::veo_generator_agent(gemini.clone(), model, veo.clone()));

        let coordinator = marketing::marketing_coordinator(
            gemini,
            model,
            &[
                research.clone(),
                creative.clone(),
                visual,
                script_writer.clone() as Arc<dyn Agent>,
                video,
            ],
        );
        tracing::info!(
            "Agent suite ready: {} with tools [{}]",
            marketing::NAME,
            coordinator.tool_names().join(", ")
        );

        Self {
            coordinator: Arc::new(coordinator),
            pipeline: Arc::new(marketing::campaign_pipeline(research, creative)),
            script_writer,
            visuals,
            veo,
        }
    }
}
