use std::sync::Arc;

use super::{Agent, Event, EventRole, InMemorySessionService, InvocationContext};
use crate::error::AgentError;

/// Runs an agent against a stored session and persists what it produced
pub struct Runner {
    agent: Arc<dyn Agent>,
    app_name: String,
    sessions: Arc<InMemorySessionService>,
}

impl Runner {
    pub fn new(agent: Arc<dyn Agent>, app_name: &str, sessions: Arc<InMemorySessionService>) -> Self {
        Self {
            agent,
            app_name: app_name.to_string(),
            sessions,
        }
    }

    /// Append `message` to the session, run the agent and return the new events.
    ///
    /// Events and state produced before a failure are still persisted.
    pub async fn run(&self, user_id: &str, session_id: &str, message: &str) -> Result<Vec<Event>, AgentError> {
        let session = self
            .sessions
            .get_session(&self.app_name, user_id, session_id)
            .await
            .ok_or_else(|| AgentError::Session(format!("Session {} not found", session_id)))?;

        let mut ctx = InvocationContext::new(session.state, session.events);
        let seeded = ctx.events.len();
        ctx.add_user_message(message);

        let started = std::time::Instant::now();
        let outcome = self.agent.run(&mut ctx).await;

        let new_events = ctx.events.split_off(seeded);
        self.sessions
            .append_events(&self.app_name, user_id, session_id, new_events.clone())
            .await?;
        self.sessions
            .update_state(&self.app_name, user_id, session_id, ctx.state)
            .await?;

        match &outcome {
            Ok(()) => tracing::info!(
                "{} finished in {:.1}s with {} events",
                self.agent.name(),
                started.elapsed().as_secs_f64(),
                new_events.len()
            ),
            Err(e) => tracing::error!("{} failed: {}", self.agent.name(), e),
        }
        outcome?;
        Ok(new_events)
    }
}

/// Pick the reply to show the caller: the last non-empty model text, or the
/// last two joined by a blank line when the last one is under 100 chars.
pub fn final_response(events: &[Event]) -> String {
    let responses: Vec<&str> = events
        .iter()
        .filter(|e| e.role == EventRole::Model && !e.text.trim().is_empty())
        .map(|e| e.text.as_str())
        .collect();

    match responses.as_slice() {
        [] => String::new(),
        [.., previous, last] if last.chars().count() < 100 => format!("{}\n\n{}", previous, last),
        [.., last] => last.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::State;
    use async_trait::async_trait;
    use serde_json::json;

    struct Scripted {
        replies: Vec<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl Agent for Scripted {
        fn name(&self) -> &str {
            "marketing_coordinator"
        }

        fn description(&self) -> &str {
            "test agent"
        }

        async fn run(&self, ctx: &mut InvocationContext) -> Result<(), AgentError> {
            for reply in &self.replies {
                ctx.events.push(Event::model(&ctx.invocation_id, "marketing_coordinator", *reply));
            }
            ctx.state.insert("turns".to_string(), json!(self.replies.len()));
            if self.fail {
                return Err(AgentError::tool("grok_creative_assistant", "boom"));
            }
            Ok(())
        }
    }

    fn model_events(texts: &[&str]) -> Vec<Event> {
        texts.iter().map(|t| Event::model("inv", "agent", *t)).collect()
    }

    #[test]
    fn test_final_response_rules() {
        assert_eq!(final_response(&[]), "");
        assert_eq!(final_response(&[Event::user("inv", "hello")]), "");

        let long = "x".repeat(120);
        assert_eq!(final_response(&model_events(&["first", long.as_str()])), long);
        assert_eq!(final_response(&model_events(&["Campaign details", "Pick A or B?"])), "Campaign details\n\nPick A or B?");
        assert_eq!(final_response(&model_events(&["only short"])), "only short");
        assert_eq!(final_response(&model_events(&["a", "b", "  "])), "a\n\nb");
    }

    #[tokio::test]
    async fn test_run_persists_events_and_state() {
        let sessions = Arc::new(InMemorySessionService::new());
        sessions.create_session("app", "api_user", Some("s1"), None).await.unwrap();
        let runner = Runner::new(
            Arc::new(Scripted { replies: vec!["Here are your campaigns"], fail: false }),
            "app",
            sessions.clone(),
        );

        let events = runner.run("api_user", "s1", "Tesla, dads").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].role, EventRole::User);
        assert_eq!(events[0].text, "Tesla, dads");

        let session = sessions.get_session("app", "api_user", "s1").await.unwrap();
        assert_eq!(session.events.len(), 2);
        assert_eq!(session.state["turns"], 1);

        // A second run only returns its own events
        let again = runner.run("api_user", "s1", "Pick A").await.unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(sessions.get_session("app", "api_user", "s1").await.unwrap().events.len(), 4);
    }

    #[tokio::test]
    async fn test_run_requires_session() {
        let runner = Runner::new(
            Arc::new(Scripted { replies: vec![], fail: false }),
            "app",
            Arc::new(InMemorySessionService::new()),
        );
        let err = runner.run("api_user", "nope", "hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Session(_)));
    }

    #[tokio::test]
    async fn test_failed_run_still_persists() {
        let sessions = Arc::new(InMemorySessionService::new());
        sessions.create_session("app", "u", Some("s"), Some(State::new())).await.unwrap();
        let runner = Runner::new(Arc::new(Scripted { replies: vec!["partial"], fail: true }), "app", sessions.clone());

        assert!(runner.run("u", "s", "go").await.is_err());
        assert_eq!(sessions.get_session("app", "u", "s").await.unwrap().events.len(), 2);
    }
}
