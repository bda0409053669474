// Fake upstream APIs for tests: a local axum server that replays scripted JSON
use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use base64::prelude::*;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::AppConfig;
use crate::gemini_client::GeminiClient;
use crate::grok_client::GrokClient;
use crate::retry;
use crate::AppState;

/// Serve `app` on an ephemeral port and return its base url
pub async fn spawn_fake(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[derive(Debug, Clone)]
pub struct Captured {
    pub path: String,
    pub query: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Status(u16, String),
}

/// Scripted stand-in for the Gemini and Grok REST endpoints.
///
/// Replies are queued per action (`generateContent`, `predict`,
/// `predictLongRunning`, `operations`, `chat/completions`). The last reply of
/// a queue is repeated once the earlier ones are used up.
#[derive(Debug, Clone, Default)]
pub struct ScriptedUpstream {
    replies: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, action: &str, reply: Value) -> Self {
        self.push(action, Reply::Json(reply));
        self
    }

    pub fn fail(self, action: &str, status: u16, body: &str) -> Self {
        self.push(action, Reply::Status(status, body.to_string()));
        self
    }

    fn push(&self, action: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(action.to_string())
            .or_default()
            .push_back(reply);
    }

    pub async fn spawn(&self) -> String {
        let app = Router::new().fallback(handle).with_state(self.clone());
        spawn_fake(app).await
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_for(&self, action: &str) -> Vec<Captured> {
        self.requests()
            .into_iter()
            .filter(|c| action_of(&c.path) == action)
            .collect()
    }

    fn next_reply(&self, action: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(action)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

fn action_of(path: &str) -> String {
    if path.contains("/operations/") {
        "operations".to_string()
    } else if let Some((_, action)) = path.rsplit_once(':') {
        action.to_string()
    } else {
        path.trim_start_matches('/').to_string()
    }
}

async fn handle(State(upstream): State<ScriptedUpstream>, uri: Uri, body: Bytes) -> Response {
    let path = uri.path().to_string();
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    upstream.requests.lock().unwrap().push(Captured {
        path: path.clone(),
        query: uri.query().map(str::to_string),
        body,
    });

    match upstream.next_reply(&action_of(&path)) {
        Some(Reply::Json(value)) => Json(value).into_response(),
        Some(Reply::Status(status, body)) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body).into_response()
        }
        None => (StatusCode::NOT_FOUND, format!("no scripted reply for {}", path)).into_response(),
    }
}

pub fn gemini_client(base_url: &str) -> GeminiClient {
    GeminiClient::new("test-key", base_url, Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(retry::no_retry())
}

pub fn grok_client(base_url: &str) -> GrokClient {
    GrokClient::new("xai-test", base_url, "grok-3-latest")
        .unwrap()
        .with_retry_policy(retry::no_retry())
}

pub fn text_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

pub fn call_reply(name: &str, args: Value) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"functionCall": {"name": name, "args": args}}]},
            "finishReason": "STOP"
        }]
    })
}

pub fn image_reply(bytes: &[u8], mime_type: &str) -> Value {
    json!({
        "predictions": [{
            "bytesBase64Encoded": BASE64_STANDARD.encode(bytes),
            "mimeType": mime_type
        }]
    })
}

pub fn operation_pending(name: &str) -> Value {
    json!({ "name": name })
}

pub fn operation_done(name: &str, uris: &[&str]) -> Value {
    let samples: Vec<Value> = uris.iter().map(|uri| json!({"video": {"uri": uri}})).collect();
    json!({
        "name": name,
        "done": true,
        "response": {"generateVideoResponse": {"generatedSamples": samples}}
    })
}

pub fn grok_reply(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    })
}

/// App state whose Gemini client (when `gemini_base` is set) talks to a fake upstream
pub fn app_state(gemini_base: Option<&str>) -> Arc<AppState> {
    app_state_with(gemini_base, |_| {})
}

pub fn app_state_with<F: FnOnce(&mut AppConfig)>(gemini_base: Option<&str>, customize: F) -> Arc<AppState> {
    let mut config = AppConfig::from_lookup(|key| match key {
        "STATIC_DIR" => Some("/nonexistent-static-dir".to_string()),
        _ => None,
    })
    .unwrap();
    customize(&mut config);
    Arc::new(AppState::new(config, gemini_base.map(gemini_client), None))
}
