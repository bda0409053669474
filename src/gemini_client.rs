use backoff::ExponentialBackoff;
use base64::prelude::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ClientError;
use crate::retry;

/// REST client for the Gemini family of Google APIs: text generation with
/// function calling, Imagen image generation and Veo long-running video jobs.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    retry_policy: ExponentialBackoff,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
            role: Some("user".to_string()),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
            role: Some("model".to_string()),
        }
    }

    /// System instructions carry no role
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::text(text)],
            role: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String, // base64 encoded data
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub args: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Tool {
    #[serde(rename = "functionDeclarations")]
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Parameters,
}

impl FunctionDeclaration {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Parameters {
                param_type: "object".to_string(),
                properties: HashMap::new(),
                required: Vec::new(),
            },
        }
    }

    /// Add a parameter of the given JSON schema type
    pub fn param(mut self, name: &str, prop_type: &str, description: &str, required: bool) -> Self {
        self.parameters.properties.insert(
            name.to_string(),
            PropertyDefinition {
                prop_type: prop_type.to_string(),
                description: description.to_string(),
                items: None,
            },
        );
        if required {
            self.parameters.required.push(name.to_string());
        }
        self
    }

    pub fn string_list_param(mut self, name: &str, description: &str, required: bool) -> Self {
        self.parameters.properties.insert(
            name.to_string(),
            PropertyDefinition {
                prop_type: "array".to_string(),
                description: description.to_string(),
                items: Some(Box::new(PropertyDefinition {
                    prop_type: "string".to_string(),
                    description: String::new(),
                    items: None,
                })),
            },
        );
        if required {
            self.parameters.required.push(name.to_string());
        }
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Parameters {
    #[serde(rename = "type")]
    pub param_type: String,
    pub properties: HashMap<String, PropertyDefinition>,
    pub required: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PropertyDefinition {
    #[serde(rename = "type")]
    pub prop_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertyDefinition>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(rename = "promptFeedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PromptFeedback {
    #[serde(rename = "blockReason")]
    pub block_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    pub candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    pub total_token_count: u32,
}

impl GenerateContentResponse {
    pub fn first_content(&self) -> Option<&Content> {
        self.candidates.first().and_then(|c| c.content.as_ref())
    }

    /// Concatenated text parts of the first candidate, if any are non-empty
    pub fn text(&self) -> Option<String> {
        let content = self.first_content()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn function_calls(&self) -> Vec<FunctionCall> {
        self.first_content()
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| match part {
                        Part::FunctionCall { function_call } => Some(function_call.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A decoded Imagen output
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<ImagePrediction>,
}

#[derive(Debug, Deserialize)]
struct ImagePrediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VideoGenerationConfig {
    pub aspect_ratio: String,
    pub person_generation: String,
}

impl Default for VideoGenerationConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
            person_generation: "allow_adult".to_string(),
        }
    }
}

/// Handle of a long-running Veo generation
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub error: Option<OperationError>,
    pub response: Option<OperationResponse>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OperationError {
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OperationResponse {
    #[serde(rename = "generateVideoResponse")]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateVideoResponse {
    #[serde(rename = "generatedSamples", default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneratedSample {
    pub video: Option<VideoFile>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VideoFile {
    pub uri: Option<String>,
}

impl Operation {
    /// One entry per generated sample; `None` when the sample carries no uri
    pub fn video_uris(&self) -> Vec<Option<String>> {
        self.response
            .as_ref()
            .and_then(|r| r.generate_video_response.as_ref())
            .map(|r| {
                r.generated_samples
                    .iter()
                    .map(|s| s.video.as_ref().and_then(|v| v.uri.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_policy: retry::default_policy(),
        })
    }

    pub fn with_retry_policy(mut self, policy: ExponentialBackoff) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ClientError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        tracing::debug!(
            "Gemini generateContent: model={}, contents={}, tools={}",
            model,
            request.contents.len(),
            request
                .tools
                .as_ref()
                .map_or(0, |t| t.iter().map(|t| t.function_declarations.len()).sum::<usize>())
        );

        let response: GenerateContentResponse = retry::send_json(self.retry_policy.clone(), "Gemini API", || {
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(request)
        })
        .await?;

        if let Some(reason) = response.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
            tracing::warn!("Gemini blocked the prompt: {}", reason);
        }
        if let Some(usage) = &response.usage_metadata {
            tracing::debug!(
                "Gemini usage: prompt={} candidates={} total={}",
                usage.prompt_token_count,
                usage.candidates_token_count,
                usage.total_token_count
            );
        }

        Ok(response)
    }

    /// Single-turn convenience wrapper around `generate_content`
    pub async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, ClientError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            ..Default::default()
        };
        self.generate_content(model, &request)
            .await?
            .text()
            .ok_or_else(|| ClientError::MissingData("No response from Gemini model".to_string()))
    }

    /// Generate one image with Imagen
    pub async fn generate_images(&self, model: &str, prompt: &str) -> Result<Vec<GeneratedImage>, ClientError> {
        let url = format!("{}/models/{}:predict", self.base_url, model);
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1 }
        });

        tracing::info!("Requesting image from {} ({} chars of prompt)", model, prompt.len());
        let response: PredictResponse = retry::send_json(self.retry_policy.clone(), "Imagen API", || {
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
        })
        .await?;

        let mut images = Vec::new();
        for prediction in response.predictions {
            let Some(encoded) = prediction.bytes_base64_encoded else {
                continue;
            };
            images.push(GeneratedImage {
                bytes: BASE64_STANDARD.decode(encoded)?,
                mime_type: prediction.mime_type.unwrap_or_else(|| "image/png".to_string()),
            });
        }

        if images.is_empty() {
            return Err(ClientError::MissingData("No images generated".to_string()));
        }
        Ok(images)
    }

    /// Start a Veo generation and return the operation handle to poll
    pub async fn start_video_generation(
        &self,
        model: &str,
        prompt: &str,
        config: &VideoGenerationConfig,
    ) -> Result<Operation, ClientError> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, model);
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "aspectRatio": config.aspect_ratio,
                "personGeneration": config.person_generation,
            }
        });

        let operation: Operation = retry::send_json(self.retry_policy.clone(), "Veo API", || {
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
        })
        .await?;

        if operation.name.is_empty() {
            return Err(ClientError::MissingData(
                "Veo API returned an operation without a name".to_string(),
            ));
        }
        tracing::info!("Started video generation: {}", operation.name);
        Ok(operation)
    }

    /// Fetch the current state of an operation by its full resource name
    pub async fn get_operation(&self, name: &str) -> Result<Operation, ClientError> {
        let url = format!("{}/{}", self.base_url, name.trim_start_matches('/'));
        retry::send_json(self.retry_policy.clone(), "Veo API", || {
            self.client.get(&url).query(&[("key", self.api_key.as_str())])
        })
        .await
    }
}
