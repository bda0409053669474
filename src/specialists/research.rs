use std::sync::Arc;

use crate::agent::LlmAgent;
use crate::gemini_client::GeminiClient;

pub const NAME: &str = "research_specialist";
pub const OUTPUT_KEY: &str = "research_report";

const INSTRUCTION: &str = "You are a marketing research analyst. From the company and goals in the \
conversation, write a structured intelligence report with these sections:\n\n\
**COMPANY OVERVIEW**: business model, value propositions, market position, recent developments.\n\
**COMPETITIVE LANDSCAPE**: direct competitors, positioning, advantages, gaps.\n\
**MARKET TRENDS**: growth, emerging opportunities, consumer behaviour, external factors.\n\
**TARGET AUDIENCE INSIGHTS**: demographics, values, pain points, motivations, media habits.\n\
**MARKETING OPPORTUNITIES**: positioning angles, messaging themes, channels, campaign directions.\n\n\
Be specific and actionable; the creative team builds campaigns from this report alone.";

/// Analysis-only agent; its report lands in state under `research_report`
pub fn research_agent(client: Arc<GeminiClient>, model: &str) -> LlmAgent {
    LlmAgent::new(NAME, model, client)
        .with_description("Analyses a company, its market and audience, and writes a marketing intelligence report")
        .with_instruction(INSTRUCTION)
        .with_output_key(OUTPUT_KEY)
}
