// Veo video generation: start a long-running operation and poll it to completion
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agent::tool::required_str_arg;
use crate::agent::{FunctionTool, LlmAgent};
use crate::error::{AgentError, ClientError};
use crate::gemini_client::{FunctionDeclaration, GeminiClient, Operation, VideoGenerationConfig};
use crate::parsing::with_api_key;

pub const NAME: &str = "veo_generator_agent";

pub const NO_TEXT_SUFFIX: &str = "\n\nIMPORTANT: Generate video with NO visible text, words, letters, or typography \
on screen. Tell the story through action, emotion and imagery; convey any brand messaging visually, never with \
text overlays.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    InProgress,
    Completed,
    Failed,
    Timeout,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoFeatures {
    pub duration: String,
    pub aspect_ratio: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub index: usize,
    pub model: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Result of a generation or status check, returned to HTTP callers as-is
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoReport {
    pub success: bool,
    pub status: VideoStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<VideoFeatures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<VideoInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl VideoReport {
    fn new(success: bool, status: VideoStatus, message: impl Into<String>) -> Self {
        Self {
            success,
            status,
            message: message.into(),
            operation_name: None,
            elapsed_time: None,
            model: None,
            features: None,
            video_count: None,
            videos: None,
            video_url: None,
            error: None,
            error_type: None,
        }
    }

    fn errored(error: &ClientError, message: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            error_type: Some(error.kind().to_string()),
            ..Self::new(false, VideoStatus::Error, message)
        }
    }
}

/// What the `generate_single_video` tool reports back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleVideo {
    pub success: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<VideoFeatures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct VeoGenerator {
    client: Arc<GeminiClient>,
    model: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl VeoGenerator {
    pub fn new(client: Arc<GeminiClient>, model: &str, poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            client,
            model: model.to_string(),
            poll_interval,
            max_wait,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn features(&self) -> VideoFeatures {
        VideoFeatures {
            duration: "~5 seconds".to_string(),
            aspect_ratio: "16:9".to_string(),
            model: self.model.clone(),
        }
    }

    fn video_infos(&self, operation: &Operation) -> Vec<VideoInfo> {
        operation
            .video_uris()
            .into_iter()
            .enumerate()
            .map(|(index, uri)| VideoInfo {
                index,
                model: self.model.clone(),
                available: uri.is_some(),
                uri: uri.map(|u| with_api_key(&u, self.client.api_key())),
            })
            .collect()
    }

    /// Generate a video from `script`, blocking until the operation finishes or `max_wait` passes
    pub async fn generate_video(&self, script: &str) -> VideoReport {
        let started = Instant::now();
        match self.run_operation(script, started).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Video generation failed: {}", e);
                VideoReport::errored(&e, "Video generation failed")
            }
        }
    }

    async fn run_operation(&self, script: &str, started: Instant) -> Result<VideoReport, ClientError> {
        let mut operation = self
            .client
            .start_video_generation(&self.model, script, &VideoGenerationConfig::default())
            .await?;
        let name = operation.name.clone();

        while !operation.done && started.elapsed() < self.max_wait {
            tracing::info!("Waiting for video generation... {}s elapsed", started.elapsed().as_secs());
            tokio::time::sleep(self.poll_interval).await;
            operation = self.client.get_operation(&name).await?;
        }
        let elapsed = started.elapsed().as_secs();

        if !operation.done {
            tracing::warn!("Video generation {} still running after {}s", name, elapsed);
            return Ok(VideoReport {
                operation_name: Some(name),
                elapsed_time: Some(elapsed),
                error: Some("Generation timeout - video may still be processing in background".to_string()),
                ..VideoReport::new(
                    false,
                    VideoStatus::Timeout,
                    format!("Video generation timed out after {}s (may still be processing)", self.max_wait.as_secs()),
                )
            });
        }

        if let Some(error) = &operation.error {
            tracing::warn!("Video generation {} failed: {}", name, error.message);
            return Ok(VideoReport {
                operation_name: Some(name),
                elapsed_time: Some(elapsed),
                model: Some(self.model.clone()),
                error: Some(error.message.clone()),
                ..VideoReport::new(false, VideoStatus::Failed, "Video generation failed")
            });
        }

        let videos = self.video_infos(&operation);
        let video_url = videos.iter().find_map(|v| v.uri.clone());
        tracing::info!("Video generation completed in {}s with {} video(s)", elapsed, videos.len());

        Ok(VideoReport {
            operation_name: Some(name),
            elapsed_time: Some(elapsed),
            model: Some(self.model.clone()),
            features: Some(self.features()),
            video_count: Some(videos.len()),
            videos: Some(videos),
            video_url,
            ..VideoReport::new(true, VideoStatus::Completed, format!("Video generated successfully in {}s", elapsed))
        })
    }

    /// One look at an operation, without waiting
    pub async fn check_video_status(&self, operation_name: &str) -> VideoReport {
        let operation = match self.client.get_operation(operation_name).await {
            Ok(operation) => operation,
            Err(e) => return VideoReport::errored(&e, "Failed to check video status"),
        };

        let report = match (operation.done, &operation.error) {
            (false, _) => VideoReport::new(true, VideoStatus::InProgress, "Video generation in progress..."),
            (true, Some(error)) => VideoReport {
                error: Some(error.message.clone()),
                ..VideoReport::new(false, VideoStatus::Failed, "Video generation failed")
            },
            (true, None) => {
                let videos = self.video_infos(&operation);
                VideoReport {
                    video_count: Some(videos.len()),
                    video_url: videos.iter().find_map(|v| v.uri.clone()),
                    videos: Some(videos),
                    ..VideoReport::new(true, VideoStatus::Completed, "Video generation completed")
                }
            }
        };
        VideoReport {
            operation_name: Some(operation_name.to_string()),
            ..report
        }
    }

    /// Generate with the no-text suffix appended to the script
    pub async fn generate_single_video(&self, script: &str) -> SingleVideo {
        let report = self.generate_video(&format!("{}{}", script, NO_TEXT_SUFFIX)).await;
        if report.success {
            SingleVideo {
                success: true,
                model: self.model.clone(),
                video_url: report.video_url,
                script_used: Some(script.to_string()),
                operation_name: report.operation_name,
                features: Some(self.features()),
                message: Some(format!("Video generated successfully using {}", self.model)),
                error: None,
            }
        } else {
            SingleVideo {
                success: false,
                model: self.model.clone(),
                video_url: None,
                script_used: None,
                operation_name: report.operation_name,
                features: None,
                message: None,
                error: Some(report.error.unwrap_or_else(|| "Unknown error".to_string())),
            }
        }
    }
}

pub fn veo_generator_agent(client: Arc<GeminiClient>, model: &str, generator: VeoGenerator) -> LlmAgent {
    let single = generator.clone();
    let generate_tool = FunctionTool::new(
        FunctionDeclaration::new("generate_single_video", "Generate one marketing video from a Veo script")
            .param("script", "string", "The Veo script to render", true),
        move |args: Value| {
            let generator = single.clone();
            async move {
                let script = required_str_arg(&args, "generate_single_video", "script")?;
                let result = generator.generate_single_video(&script).await;
                serde_json::to_value(result).map_err(|e| AgentError::tool("generate_single_video", e.to_string()))
            }
        },
    );

    let status_tool = FunctionTool::new(
        FunctionDeclaration::new("check_video_status", "Check the status of a video generation operation")
            .param("operation_name", "string", "Operation name returned by generate_single_video", true),
        move |args: Value| {
            let generator = generator.clone();
            async move {
                let name = required_str_arg(&args, "check_video_status", "operation_name")?;
                let report = generator.check_video_status(&name).await;
                serde_json::to_value(report).map_err(|e| AgentError::tool("check_video_status", e.to_string()))
            }
        },
    );

    LlmAgent::new(NAME, model, client)
        .with_description("Generates single marketing videos from Veo scripts, with no text overlays")
        .with_instruction(
            "You turn video scripts into marketing videos. Videos must never show text, words or typography; \
             the story is told through action, emotion and imagery. Call generate_single_video with the script \
             you are given and report the video url. Use check_video_status when asked about an operation.",
        )
        .with_tool(Arc::new(generate_tool))
        .with_tool(Arc::new(status_tool))
}
