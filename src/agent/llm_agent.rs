// LLM agent: instruction + tools over Gemini function calling
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{Agent, Event, EventRole, InvocationContext, State, Tool};
use crate::error::AgentError;
use crate::gemini_client::{
    Content, FunctionCall, FunctionResponse, GeminiClient, GenerateContentRequest, Part,
    Tool as ToolDeclarations,
};

pub const DEFAULT_MAX_ITERATIONS: usize = 8;

lazy_static! {
    static ref STATE_PLACEHOLDER: Regex = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)(\?)?\}").unwrap();
}

pub struct LlmAgent {
    name: String,
    description: String,
    model: String,
    instruction: String,
    tools: Vec<Arc<dyn Tool>>,
    output_key: Option<String>,
    max_iterations: usize,
    client: Arc<GeminiClient>,
}

impl LlmAgent {
    pub fn new(name: &str, model: &str, client: Arc<GeminiClient>) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            model: model.to_string(),
            instruction: String::new(),
            tools: Vec::new(),
            output_key: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            client,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Store the agent's final text in session state under `key`
    pub fn with_output_key(mut self, key: &str) -> Self {
        self.output_key = Some(key.to_string());
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    fn tool_declarations(&self) -> Option<Vec<ToolDeclarations>> {
        if self.tools.is_empty() {
            return None;
        }
        Some(vec![ToolDeclarations {
            function_declarations: self.tools.iter().map(|t| t.declaration()).collect(),
        }])
    }

    /// Conversation as this agent sees it. Turns by other agents are handed
    /// over as user context so the model does not mistake them for its own.
    fn history(&self, ctx: &InvocationContext) -> Vec<Content> {
        ctx.events
            .iter()
            .filter(|e| !e.text.trim().is_empty())
            .map(|event| match event.role {
                EventRole::User => Content::user(event.text.clone()),
                EventRole::Model if event.author == self.name => Content::model(event.text.clone()),
                EventRole::Model => Content::user(format!("For context: [{}] said: {}", event.author, event.text)),
            })
            .collect()
    }

    async fn dispatch(&self, call: &FunctionCall, state: &mut State) -> Value {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.name) else {
            tracing::warn!("{} requested unknown tool '{}'", self.name, call.name);
            return json!({ "error": format!("Tool '{}' not found", call.name) });
        };

        tracing::info!("{} calling tool: {}", self.name, call.name);
        let args = if call.args.is_null() { json!({}) } else { call.args.clone() };
        match tool.call(args, state).await {
            Ok(value) if value.is_object() => value,
            Ok(value) => json!({ "result": value }),
            Err(e) => {
                tracing::warn!("Tool '{}' failed: {}", call.name, e);
                json!({ "error": e.to_string() })
            }
        }
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AgentError> {
        let instruction = inject_state(&self.instruction, &ctx.state);
        let system_instruction = (!instruction.trim().is_empty()).then(|| Content::system(instruction));
        let tools = self.tool_declarations();
        let mut contents = self.history(ctx);
        let mut last_text: Option<String> = None;

        for iteration in 1..=self.max_iterations {
            let request = GenerateContentRequest {
                contents: contents.clone(),
                system_instruction: system_instruction.clone(),
                tools: tools.clone(),
                generation_config: None,
            };
            let response = self.client.generate_content(&self.model, &request).await?;

            let Some(content) = response.first_content().cloned() else {
                tracing::warn!("{} got a response with no content (iteration {})", self.name, iteration);
                return self.finish(ctx, last_text);
            };

            if let Some(text) = response.text() {
                ctx.events.push(Event::model(&ctx.invocation_id, &self.name, text.clone()));
                last_text = Some(text);
            }

            let calls = response.function_calls();
            contents.push(Content {
                parts: content.parts,
                role: Some("model".to_string()),
            });
            if calls.is_empty() {
                return self.finish(ctx, last_text);
            }

            let mut responses = Vec::with_capacity(calls.len());
            for call in &calls {
                let result = self.dispatch(call, &mut ctx.state).await;
                responses.push(Part::FunctionResponse {
                    function_response: FunctionResponse {
                        name: call.name.clone(),
                        response: result,
                    },
                });
            }
            contents.push(Content {
                parts: responses,
                role: Some("user".to_string()),
            });
        }

        Err(AgentError::IterationLimit {
            agent: self.name.clone(),
            limit: self.max_iterations,
        })
    }
}

impl LlmAgent {
    fn finish(&self, ctx: &mut InvocationContext, last_text: Option<String>) -> Result<(), AgentError> {
        if let (Some(key), Some(text)) = (&self.output_key, last_text) {
            tracing::debug!("{} stored {} chars under '{}'", self.name, text.len(), key);
            ctx.state.insert(key.clone(), Value::String(text));
        }
        Ok(())
    }
}

/// Replace `{key}` with the state value (strings verbatim, other JSON rendered).
/// `{key?}` renders as empty when the key is missing; unknown `{key}` is left alone.
pub fn inject_state(template: &str, state: &State) -> String {
    STATE_PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            match state.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None if caps.get(2).is_some() => String::new(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
