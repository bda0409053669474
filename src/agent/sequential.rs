use async_trait::async_trait;
use std::sync::Arc;

use super::{Agent, InvocationContext};
use crate::error::AgentError;

/// Runs its sub-agents one after another over the same context, so each
/// sees the events and state the previous ones produced.
pub struct SequentialAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
}

impl SequentialAgent {
    pub fn new(name: &str, description: &str, sub_agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            sub_agents,
        }
    }

    pub fn sub_agent_names(&self) -> Vec<&str> {
        self.sub_agents.iter().map(|a| a.name()).collect()
    }
}

#[async_trait]
impl Agent for SequentialAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AgentError> {
        for (step, agent) in self.sub_agents.iter().enumerate() {
            tracing::info!(
                "{}: step {}/{} -> {}",
                self.name,
                step + 1,
                self.sub_agents.len(),
                agent.name()
            );
            agent.run(ctx).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Event, State};
    use serde_json::json;

    struct Step(&'static str);

    #[async_trait]
    impl Agent for Step {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test step"
        }

        async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AgentError> {
            let seen = ctx.events.len();
            ctx.state.insert(self.0.to_string(), json!(seen));
            ctx.events.push(Event::model(&ctx.invocation_id, self.0, format!("{} done", self.0)));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_runs_in_order_on_shared_context() {
        let pipeline = SequentialAgent::new(
            "campaign_pipeline",
            "research then creative",
            vec![Arc::new(Step("research")), Arc::new(Step("creative"))],
        );
        assert_eq!(pipeline.sub_agent_names(), vec!["research", "creative"]);

        let mut ctx = InvocationContext::for_message(State::new(), "Acme, grow signups");
        pipeline.run(&mut ctx).await.unwrap();

        assert_eq!(ctx.state["research"], 1);
        assert_eq!(ctx.state["creative"], 2);
        assert_eq!(ctx.last_model_text(), Some("creative done"));
    }
}
