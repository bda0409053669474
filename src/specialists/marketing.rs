use std::sync::Arc;

use crate::agent::{Agent, AgentTool, LlmAgent, SequentialAgent};
use crate::gemini_client::GeminiClient;

pub const NAME: &str = "marketing_coordinator";
pub const PIPELINE_NAME: &str = "campaign_pipeline";

const INSTRUCTION: &str = "You coordinate a team of marketing specialists, each available as a tool that \
takes a single `request`. Work in this order and pass everything the next specialist needs in its request:\n\n\
1. research_specialist: research the company, market and audience.\n\
2. creative_director: turn the research into two campaign pitches (A and B).\n\
3. visual_concept_agent: only once the user picks a campaign, create its visual.\n\
4. script_writer_agent: write a Veo video script for the chosen campaign and visual.\n\
5. veo_generator_agent: render the approved script as a video.\n\n\
For a new company, run steps 1 and 2 and present the pitches exactly as the creative director wrote them, \
then ask which campaign to develop. Never invent results a specialist did not return.";

/// Root agent; every specialist is reachable as an [`AgentTool`]
pub fn marketing_coordinator(client: Arc<GeminiClient>, model: &str, specialists: &[Arc<dyn Agent>]) -> LlmAgent {
    specialists.iter().fold(
        LlmAgent::new(NAME, model, client)
            .with_description("Plans marketing campaigns end to end by delegating to specialist agents")
            .with_instruction(INSTRUCTION),
        |agent, specialist| agent.with_tool(Arc::new(AgentTool::new(specialist.clone()))),
    )
}

/// Research then creative, sharing one context so the report reaches the creative director
pub fn campaign_pipeline(research: Arc<dyn Agent>, creative: Arc<dyn Agent>) -> SequentialAgent {
    SequentialAgent::new(
        PIPELINE_NAME,
        "Researches a company and pitches two campaigns for it",
        vec![research, creative],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{InvocationContext, State};
    use crate::specialists::creative_director::{creative_director_agent, CreativeAssistant};
    use crate::specialists::research::research_agent;
    use crate::test_support::{self, ScriptedUpstream};
    use serde_json::json;

    async fn specialists(upstream: &ScriptedUpstream) -> (Arc<GeminiClient>, Arc<dyn Agent>, Arc<dyn Agent>) {
        let client = Arc::new(test_support::gemini_client(&upstream.spawn().await));
        let research: Arc<dyn Agent> = Arc::new(research_agent(client.clone(), "gemini-2.0-flash"));
        let creative: Arc<dyn Agent> = Arc::new(creative_director_agent(
            client.clone(),
            "gemini-2.0-flash",
            CreativeAssistant::new(None),
        ));
        (client, research, creative)
    }

    #[tokio::test]
    async fn test_coordinator_exposes_specialists_as_tools() {
        let upstream = ScriptedUpstream::new();
        let (client, research, creative) = specialists(&upstream).await;
        let coordinator = marketing_coordinator(client, "gemini-2.0-flash", &[research, creative]);
        assert_eq!(coordinator.tool_names(), vec!["research_specialist", "creative_director"]);
    }

    #[tokio::test]
    async fn test_coordinator_delegates_and_shares_state() {
        let upstream = ScriptedUpstream::new()
            .on("generateContent", test_support::call_reply("research_specialist", json!({"request": "Research Acme"})))
            .on("generateContent", test_support::text_reply("Acme sells anvils"))
            .on("generateContent", test_support::text_reply("Here is what I found."));
        let (client, research, creative) = specialists(&upstream).await;
        let coordinator = marketing_coordinator(client, "gemini-2.0-flash", &[research, creative]);

        let mut ctx = InvocationContext::for_message(State::new(), "Acme, sell more anvils");
        coordinator.run(&mut ctx).await.unwrap();

        assert_eq!(ctx.state["research_report"], "Acme sells anvils");
        let requests = upstream.requests_for("generateContent");
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].body["contents"][0]["parts"][0]["text"], "Research Acme");
        assert_eq!(
            requests[2].body["contents"][2]["parts"][0]["functionResponse"]["response"]["result"],
            "Acme sells anvils"
        );
    }

    #[tokio::test]
    async fn test_pipeline_hands_research_to_creative() {
        let upstream = ScriptedUpstream::new()
            .on("generateContent", test_support::text_reply("Report: Acme sells anvils"))
            .on("generateContent", test_support::text_reply("**CAMPAIGN A: Anvil Pride**"));
        let (_, research, creative) = specialists(&upstream).await;
        let pipeline = campaign_pipeline(research, creative);
        assert_eq!(pipeline.sub_agent_names(), vec!["research_specialist", "creative_director"]);

        let mut ctx = InvocationContext::for_message(State::new(), "Company: Acme");
        pipeline.run(&mut ctx).await.unwrap();

        assert_eq!(ctx.state["research_report"], "Report: Acme sells anvils");
        let creative_request = &upstream.requests_for("generateContent")[1].body;
        assert!(creative_request["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Report: Acme sells anvils"));
        assert_eq!(
            creative_request["contents"][1]["parts"][0]["text"],
            "For context: [research_specialist] said: Report: Acme sells anvils"
        );
        assert_eq!(ctx.last_model_text(), Some("**CAMPAIGN A: Anvil Pride**"));
    }
}
