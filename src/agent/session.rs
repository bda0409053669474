//! Sessions, events and the in-memory session store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AgentError;

/// Key/value state shared by every agent that runs in a session
pub type State = HashMap<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventRole {
    User,
    Model,
}

/// One turn of conversation, attributed to the user or to a named agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub invocation_id: String,
    pub author: String,
    pub role: EventRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn user(invocation_id: &str, text: impl Into<String>) -> Self {
        Self::new(invocation_id, "user", EventRole::User, text)
    }

    pub fn model(invocation_id: &str, author: &str, text: impl Into<String>) -> Self {
        Self::new(invocation_id, author, EventRole::Model, text)
    }

    fn new(invocation_id: &str, author: &str, role: EventRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            invocation_id: invocation_id.to_string(),
            author: author.to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    pub state: State,
    pub events: Vec<Event>,
    pub created_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

type SessionKey = (String, String, String);

fn key(app_name: &str, user_id: &str, session_id: &str) -> SessionKey {
    (app_name.to_string(), user_id.to_string(), session_id.to_string())
}

/// Process-local session store keyed by (app, user, session)
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: Arc<RwLock<HashMap<SessionKey, Session>>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session. A random id is used when `session_id` is `None`.
    pub async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: Option<State>,
    ) -> Result<Session, AgentError> {
        let id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut sessions = self.sessions.write().await;

        let session_key = key(app_name, user_id, &id);
        if sessions.contains_key(&session_key) {
            return Err(AgentError::Session(format!("Session {} already exists", id)));
        }

        let now = Utc::now();
        let session = Session {
            id,
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            state: state.unwrap_or_default(),
            events: Vec::new(),
            created_at: now,
            last_update: now,
        };
        sessions.insert(session_key, session.clone());
        tracing::debug!("Created session {} for {}/{}", session.id, app_name, user_id);
        Ok(session)
    }

    pub async fn get_session(&self, app_name: &str, user_id: &str, session_id: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions.get(&key(app_name, user_id, session_id)).cloned()
    }

    pub async fn append_events(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        events: Vec<Event>,
    ) -> Result<(), AgentError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&key(app_name, user_id, session_id))
            .ok_or_else(|| AgentError::Session(format!("Session {} not found", session_id)))?;
        session.events.extend(events);
        session.last_update = Utc::now();
        Ok(())
    }

    /// Merge `delta` into the session state, overwriting existing keys
    pub async fn update_state(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        delta: State,
    ) -> Result<(), AgentError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&key(app_name, user_id, session_id))
            .ok_or_else(|| AgentError::Session(format!("Session {} not found", session_id)))?;
        session.state.extend(delta);
        session.last_update = Utc::now();
        Ok(())
    }

    /// Returns whether a session was removed
    pub async fn delete_session(&self, app_name: &str, user_id: &str, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&key(app_name, user_id, session_id)).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions that have not been touched for `max_idle`
    pub async fn cleanup_idle_sessions(&self, max_idle: chrono::Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let cutoff = Utc::now() - max_idle;

        let to_remove: Vec<SessionKey> = sessions
            .iter()
            .filter(|(_, session)| session.last_update < cutoff)
            .map(|(k, _)| k.clone())
            .collect();

        for session_key in &to_remove {
            sessions.remove(session_key);
            tracing::debug!("Cleaned up idle session: {}", session_key.2);
        }
        to_remove.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_get() {
        let service = InMemorySessionService::new();
        let created = service
            .create_session("marketing_campaign", "user", Some("s1"), None)
            .await
            .unwrap();
        assert_eq!(created.id, "s1");

        let fetched = service.get_session("marketing_campaign", "user", "s1").await.unwrap();
        assert!(fetched.events.is_empty());
        assert!(service.get_session("marketing_campaign", "other", "s1").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_session_is_rejected() {
        let service = InMemorySessionService::new();
        service.create_session("app", "user", Some("dup"), None).await.unwrap();

        let err = service.create_session("app", "user", Some("dup"), None).await.unwrap_err();
        assert!(matches!(err, AgentError::Session(_)));
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let service = InMemorySessionService::new();
        let a = service.create_session("app", "user", None, None).await.unwrap();
        let b = service.create_session("app", "user", None, None).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(service.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_events_and_state_persist() {
        let service = InMemorySessionService::new();
        service.create_session("app", "user", Some("s"), None).await.unwrap();

        service
            .append_events("app", "user", "s", vec![Event::user("inv", "hello")])
            .await
            .unwrap();
        let mut delta = State::new();
        delta.insert("research_report".to_string(), json!("Findings"));
        service.update_state("app", "user", "s", delta).await.unwrap();

        let session = service.get_session("app", "user", "s").await.unwrap();
        assert_eq!(session.events.len(), 1);
        assert_eq!(session.events[0].role, EventRole::User);
        assert_eq!(session.state["research_report"], "Findings");

        assert!(service.append_events("app", "user", "missing", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_cleanup() {
        let service = InMemorySessionService::new();
        service.create_session("app", "user", Some("a"), None).await.unwrap();
        service.create_session("app", "user", Some("b"), None).await.unwrap();

        assert!(service.delete_session("app", "user", "a").await);
        assert!(!service.delete_session("app", "user", "a").await);

        assert_eq!(service.cleanup_idle_sessions(chrono::Duration::hours(1)).await, 0);
        assert_eq!(service.cleanup_idle_sessions(chrono::Duration::seconds(-1)).await, 1);
        assert_eq!(service.session_count().await, 0);
    }
}
