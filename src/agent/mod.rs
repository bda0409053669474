// src/agent/mod.rs
//! Minimal LLM agent runtime: agents with instructions and tools, run over a
//! shared session state and event log.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AgentError;

pub mod llm_agent;
pub mod runner;
pub mod sequential;
pub mod session;
pub mod tool;

pub use llm_agent::LlmAgent;
pub use runner::{final_response, Runner};
pub use sequential::SequentialAgent;
pub use session::{Event, EventRole, InMemorySessionService, Session, State};
pub use tool::{AgentTool, FunctionTool, Tool};

/// Everything an agent sees and mutates during one invocation
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub invocation_id: String,
    pub state: State,
    pub events: Vec<Event>,
}

impl InvocationContext {
    pub fn new(state: State, events: Vec<Event>) -> Self {
        Self {
            invocation_id: format!("inv-{}", Uuid::new_v4()),
            state,
            events,
        }
    }

    /// A fresh context whose only event is `message` from the user
    pub fn for_message(state: State, message: &str) -> Self {
        let mut ctx = Self::new(state, Vec::new());
        ctx.add_user_message(message);
        ctx
    }

    pub fn add_user_message(&mut self, message: &str) {
        self.events.push(Event::user(&self.invocation_id, message));
    }

    /// Last non-empty text authored by a model in this context
    pub fn last_model_text(&self) -> Option<&str> {
        self.events
            .iter()
            .rev()
            .filter(|e| e.role == EventRole::Model)
            .map(|e| e.text.as_str())
            .find(|t| !t.trim().is_empty())
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AgentError>;
}
