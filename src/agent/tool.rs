// Callable tools exposed to LLM agents through function declarations
use async_trait::async_trait;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::{Agent, InvocationContext, State};
use crate::error::AgentError;
use crate::gemini_client::FunctionDeclaration;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn declaration(&self) -> FunctionDeclaration;
    async fn call(&self, args: Value, state: &mut State) -> Result<Value, AgentError>;
}

type ToolFuture = Pin<Box<dyn Future<Output = Result<Value, AgentError>> + Send>>;
type ToolHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// A tool backed by an async function of its JSON arguments
#[derive(Clone)]
pub struct FunctionTool {
    declaration: FunctionDeclaration,
    handler: ToolHandler,
}

impl FunctionTool {
    pub fn new<F, Fut>(declaration: FunctionDeclaration, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, AgentError>> + Send + 'static,
    {
        Self {
            declaration,
            handler: Arc::new(move |args| -> ToolFuture { Box::pin(handler(args)) }),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.declaration.name
    }

    fn description(&self) -> &str {
        &self.declaration.description
    }

    fn declaration(&self) -> FunctionDeclaration {
        self.declaration.clone()
    }

    async fn call(&self, args: Value, _state: &mut State) -> Result<Value, AgentError> {
        (self.handler)(args).await
    }
}

/// Exposes an agent as a tool taking a single `request` string.
///
/// The wrapped agent runs on a copy of the caller's state and whatever it
/// writes is merged back, so `output_key` results stay visible to the caller.
pub struct AgentTool {
    agent: Arc<dyn Agent>,
}

impl AgentTool {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        self.agent.name()
    }

    fn description(&self) -> &str {
        self.agent.description()
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration::new(self.agent.name(), self.agent.description()).param(
            "request",
            "string",
            "What this specialist should do, with all the context it needs",
            true,
        )
    }

    async fn call(&self, args: Value, state: &mut State) -> Result<Value, AgentError> {
        let request = str_arg(&args, "request").unwrap_or_default();
        tracing::info!("Delegating to {} ({} chars of request)", self.agent.name(), request.len());

        let mut ctx = InvocationContext::for_message(state.clone(), &request);
        self.agent.run(&mut ctx).await?;

        let result = ctx.last_model_text().unwrap_or_default().to_string();
        state.extend(ctx.state);
        Ok(json!({ "result": result }))
    }
}

/// String argument, with non-string JSON values rendered as text
pub fn str_arg(args: &Value, name: &str) -> Option<String> {
    match args.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub fn required_str_arg(args: &Value, tool: &str, name: &str) -> Result<String, AgentError> {
    str_arg(args, name).ok_or_else(|| AgentError::tool(tool, format!("missing required argument '{}'", name)))
}

/// String-list argument; a single string is treated as a one-element list
pub fn str_list_arg(args: &Value, name: &str) -> Vec<String> {
    match args.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
