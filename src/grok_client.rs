use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ClientError;
use crate::retry;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the xAI chat completions API (OpenAI-compatible wire format)
#[derive(Debug, Clone)]
pub struct GrokClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry_policy: ExponentialBackoff,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    model: &'a str,
    stream: bool,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl GrokClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            retry_policy: retry::default_policy(),
        })
    }

    pub fn with_retry_policy(mut self, policy: ExponentialBackoff) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a single user message and return the first choice's content.
    /// A response without choices yields an empty string.
    pub async fn chat_completion(&self, prompt: &str, temperature: f32) -> Result<String, ClientError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            model: &self.model,
            stream: false,
            temperature,
        };

        tracing::info!("Calling Grok ({}) with {} chars of prompt", self.model, prompt.len());
        let response: ChatCompletionResponse = retry::send_json(self.retry_policy.clone(), "Grok API", || {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request)
        })
        .await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }
}
