// Instagram copy and marketing images: Gemini writes the caption, Imagen draws the picture
use async_trait::async_trait;
use base64::prelude::*;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::agent::tool::required_str_arg;
use crate::agent::{LlmAgent, State, Tool};
use crate::error::{AgentError, ClientError};
use crate::gemini_client::{FunctionDeclaration, GeminiClient};
use crate::parsing::{parse_instagram_content, sanitize_visual_prompt, InstagramContent, CAPTION_MARKER, VISUAL_MARKER};

pub const NAME: &str = "visual_concept_agent";
/// State key holding the data url of the last image the agent generated
pub const IMAGE_STATE_KEY: &str = "generated_image";

const DEFAULT_IMAGE_CONCEPT: &str = "Professional marketing image";
const DEFAULT_CAPTION: &str = "Marketing content";

/// Outcome of one image generation, shaped for the HTTP response
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct VisualConcept {
    pub success: bool,
    pub image_data: Option<String>,
    pub filename: Option<String>,
    pub concept: Option<String>,
    pub caption: Option<String>,
    pub visual_description: Option<String>,
    pub error: Option<String>,
}

impl VisualConcept {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InstagramPost {
    pub success: bool,
    pub caption: String,
    pub visual_description: String,
    pub image_data: Option<String>,
    pub filename: String,
    pub concept: String,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct VisualConceptService {
    client: Arc<GeminiClient>,
    text_model: String,
    image_model: String,
}

impl VisualConceptService {
    pub fn new(client: Arc<GeminiClient>, text_model: &str, image_model: &str) -> Self {
        Self {
            client,
            text_model: text_model.to_string(),
            image_model: image_model.to_string(),
        }
    }

    /// Ask the copywriter model for a caption and an image description
    pub async fn instagram_copy(&self, campaign_content: &str, concept: &str) -> Result<InstagramContent, ClientError> {
        let prompt = instagram_prompt(campaign_content, concept);
        let reply = self.client.generate_text(&self.text_model, &prompt).await?;
        let content = parse_instagram_content(&reply);
        tracing::debug!(
            "Instagram copy for concept {}: caption={} chars, visual={} chars",
            concept,
            content.caption.len(),
            content.visual_description.len()
        );
        Ok(content)
    }

    /// Render `concept` as a text-free marketing image. Failures are reported in the result.
    pub async fn generate_visual_concept(&self, concept: &str) -> VisualConcept {
        let visual_prompt = sanitize_visual_prompt(concept);
        let prompt = format!(
            "Marketing visual: {}. Professional, high-quality, brand-appropriate, Instagram-worthy. \
             NO text, words, letters, or typography in the image. Tell the story through imagery, \
             colour and composition only.",
            visual_prompt
        );

        match self.client.generate_images(&self.image_model, &prompt).await {
            Ok(images) => {
                let Some(image) = images.into_iter().next() else {
                    return VisualConcept::failed("No image generated");
                };
                tracing::info!("Generated {} byte {} image", image.bytes.len(), image.mime_type);
                VisualConcept {
                    success: true,
                    image_data: Some(format!("data:{};base64,{}", image.mime_type, BASE64_STANDARD.encode(&image.bytes))),
                    filename: Some(image_filename(&image.mime_type)),
                    concept: Some(concept.to_string()),
                    caption: Some(concept.to_string()),
                    ..Default::default()
                }
            }
            Err(e) => {
                tracing::warn!("Image generation failed: {}", e);
                VisualConcept::failed(format!("Image generation failed: {}", e))
            }
        }
    }

    /// With campaign content the copywriter picks the image; without it the
    /// concept itself is the prompt, caption and description.
    pub async fn generate_visual(&self, concept: &str, campaign_content: Option<&str>) -> Result<VisualConcept, ClientError> {
        let (image_concept, caption, visual_description) = match campaign_content.filter(|c| !c.trim().is_empty()) {
            Some(campaign) => {
                let copy = self.instagram_copy(campaign, concept).await?;
                (copy.visual_description.clone(), copy.caption, copy.visual_description)
            }
            None if concept.trim().is_empty() => (
                DEFAULT_IMAGE_CONCEPT.to_string(),
                DEFAULT_CAPTION.to_string(),
                DEFAULT_IMAGE_CONCEPT.to_string(),
            ),
            None => (concept.to_string(), concept.to_string(), concept.to_string()),
        };

        let mut result = self.generate_visual_concept(&image_concept).await;
        result.caption = Some(caption);
        result.visual_description = Some(visual_description);
        result.concept = Some(format!("Concept {}", concept));
        Ok(result)
    }

    /// Caption, description and image for one concept of a campaign
    pub async fn generate_instagram_content(&self, campaign_content: &str, concept_number: u32) -> InstagramPost {
        let concept = format!("Concept {}", concept_number);
        let failed = |error: String, caption: String, visual_description: String| InstagramPost {
            success: false,
            caption,
            visual_description,
            image_data: None,
            filename: String::new(),
            concept: concept.clone(),
            error: Some(error),
        };

        let copy = match self.instagram_copy(campaign_content, &format!("#{}", concept_number)).await {
            Ok(copy) => copy,
            Err(e) => {
                tracing::warn!("Instagram content generation failed: {}", e);
                return failed(e.to_string(), String::new(), String::new());
            }
        };

        let image = self.generate_visual_concept(&copy.visual_description).await;
        match image.image_data {
            Some(image_data) if image.success => InstagramPost {
                success: true,
                caption: copy.caption,
                visual_description: copy.visual_description,
                image_data: Some(image_data),
                filename: image.filename.unwrap_or_default(),
                concept: concept.clone(),
                error: None,
            },
            _ => failed(
                image.error.unwrap_or_else(|| "No image generated".to_string()),
                copy.caption,
                copy.visual_description,
            ),
        }
    }
}

fn instagram_prompt(campaign_content: &str, concept: &str) -> String {
    format!(
        "You write Instagram posts for marketing campaigns.\n\n\
         CAMPAIGN:\n{campaign_content}\n\n\
         CONCEPT: {concept}\n\n\
         Write two things:\n\
         1. A shareable Instagram caption in the campaign's tone, with emojis and 5-8 relevant hashtags.\n\
         2. A description of the image to post with it: setting, people, objects, mood and lighting. \
         Give concept 2 a different angle from concept 1. End it with \"NO text or words in image\".\n\n\
         Reply in exactly this format:\n\
         {CAPTION_MARKER} <caption>\n\
         {VISUAL_MARKER} <image description>"
    )
}

fn image_filename(mime_type: &str) -> String {
    let extension = match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    };
    format!("marketing_{}.{}", chrono::Local::now().format("%Y%m%d_%H%M%S"), extension)
}

/// `generate_single_image` tool. The image itself goes into state rather than
/// back to the model, which only needs to know it exists.
pub struct GenerateImageTool {
    service: VisualConceptService,
}

impl GenerateImageTool {
    pub fn new(service: VisualConceptService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn name(&self) -> &str {
        "generate_single_image"
    }

    fn description(&self) -> &str {
        "Generate one text-free marketing image from a visual concept"
    }

    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration::new(self.name(), self.description()).param(
            "request",
            "string",
            "The marketing concept to visualise, e.g. 'Modern family enjoying a road trip'",
            true,
        )
    }

    async fn call(&self, args: Value, state: &mut State) -> Result<Value, AgentError> {
        let request = required_str_arg(&args, self.name(), "request")?;
        let result = self.service.generate_visual_concept(&request).await;

        let Some(image_data) = result.image_data.filter(|_| result.success) else {
            return Ok(json!({ "success": false, "error": result.error }));
        };
        state.insert(IMAGE_STATE_KEY.to_string(), Value::String(image_data));
        Ok(json!({
            "success": true,
            "filename": result.filename,
            "concept": result.concept,
        }))
    }
}

pub fn visual_concept_agent(client: Arc<GeminiClient>, model: &str, service: VisualConceptService) -> LlmAgent {
    LlmAgent::new(NAME, model, client)
        .with_description("Generates single marketing images from concepts, with no text in the image")
        .with_instruction(
            "You create marketing visuals. Images must never contain visible text, words or typography. \
             Turn the concept you are given into a vivid visual description and call generate_single_image \
             with it, then report the filename of the generated image.",
        )
        .with_tool(Arc::new(GenerateImageTool::new(service)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, InvocationContext};
    use crate::test_support::{self, ScriptedUpstream};

    async fn service_for(upstream: &ScriptedUpstream) -> VisualConceptService {
        let client = Arc::new(test_support::gemini_client(&upstream.spawn().await));
        VisualConceptService::new(client, "gemini-2.0-flash", "imagen-3.0-generate-002")
    }

    #[tokio::test]
    async fn test_generate_visual_concept() {
        let upstream = ScriptedUpstream::new().on("predict", test_support::image_reply(b"jpegbytes", "image/jpeg"));
        let service = service_for(&upstream).await;

        let result = service.generate_visual_concept("Sunny road trip 🚗 #adventure").await;
        assert!(result.success);
        assert_eq!(
            result.image_data.as_deref(),
            Some(format!("data:image/jpeg;base64,{}", BASE64_STANDARD.encode(b"jpegbytes")).as_str())
        );
        let filename = result.filename.unwrap();
        assert!(filename.starts_with("marketing_") && filename.ends_with(".jpg"));
        assert_eq!(result.caption.as_deref(), Some("Sunny road trip 🚗 #adventure"));

        let prompt = upstream.requests()[0].body["instances"][0]["prompt"].as_str().unwrap().to_string();
        assert!(prompt.starts_with("Marketing visual: Sunny road trip."));
        assert!(prompt.contains("NO text, words, letters, or typography"));
    }

    #[tokio::test]
    async fn test_generate_visual_concept_reports_failure() {
        let upstream = ScriptedUpstream::new().on("predict", json!({"predictions": []}));
        let service = service_for(&upstream).await;

        let result = service.generate_visual_concept("anything").await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Image generation failed: No images generated"));
        assert!(result.image_data.is_none());
    }

    #[tokio::test]
    async fn test_generate_visual_without_campaign() {
        let upstream = ScriptedUpstream::new().on("predict", test_support::image_reply(b"png", "image/png"));
        let service = service_for(&upstream).await;

        let result = service.generate_visual("Family picnic", None).await.unwrap();
        assert_eq!(result.concept.as_deref(), Some("Concept Family picnic"));
        assert_eq!(result.caption.as_deref(), Some("Family picnic"));
        assert_eq!(result.visual_description.as_deref(), Some("Family picnic"));
        assert!(upstream.requests_for("generateContent").is_empty());

        let result = service.generate_visual("", Some("  ")).await.unwrap();
        assert_eq!(result.caption.as_deref(), Some("Marketing content"));
        assert_eq!(result.visual_description.as_deref(), Some("Professional marketing image"));
    }

    #[tokio::test]
    async fn test_generate_visual_with_campaign() {
        let upstream = ScriptedUpstream::new()
            .on(
                "generateContent",
                test_support::text_reply("INSTAGRAM_CAPTION: Weekend mode ☀️ #roadtrip\nVISUAL_DESCRIPTION: A car on a coastal road at dusk, NO text or words in image"),
            )
            .on("predict", test_support::image_reply(b"img", "image/jpeg"));
        let service = service_for(&upstream).await;

        let result = service.generate_visual("1", Some("**CAMPAIGN A: Road Trips**")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.caption.as_deref(), Some("Weekend mode ☀️ #roadtrip"));
        assert_eq!(result.concept.as_deref(), Some("Concept 1"));

        let text_prompt = upstream.requests_for("generateContent")[0].body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(text_prompt.contains("**CAMPAIGN A: Road Trips**"));
        let image_prompt = upstream.requests_for("predict")[0].body["instances"][0]["prompt"].clone();
        assert!(image_prompt.as_str().unwrap().contains("A car on a coastal road at dusk"));
    }

    #[tokio::test]
    async fn test_generate_visual_text_failure_is_error() {
        let upstream = ScriptedUpstream::new().fail("generateContent", 500, "internal");
        let service = service_for(&upstream).await;
        assert!(service.generate_visual("1", Some("campaign")).await.is_err());
    }

    #[tokio::test]
    async fn test_instagram_content() {
        let upstream = ScriptedUpstream::new()
            .on("generateContent", test_support::text_reply("Just a caption with no markers"))
            .on("predict", test_support::image_reply(b"img", "image/jpeg"));
        let service = service_for(&upstream).await;

        let post = service.generate_instagram_content("campaign", 2).await;
        assert!(post.success);
        assert_eq!(post.concept, "Concept 2");
        assert_eq!(post.caption, "Just a caption with no markers");
        assert_eq!(post.visual_description, crate::parsing::GENERIC_VISUAL_DESCRIPTION);
        assert!(post.image_data.unwrap().starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_instagram_content_failures_are_in_body() {
        let upstream = ScriptedUpstream::new().fail("generateContent", 400, "bad");
        let post = service_for(&upstream).await.generate_instagram_content("campaign", 1).await;
        assert!(!post.success);
        assert!(post.error.is_some());
        assert_eq!(post.caption, "");

        let upstream = ScriptedUpstream::new()
            .on("generateContent", test_support::text_reply("INSTAGRAM_CAPTION: hi\nVISUAL_DESCRIPTION: a dog"))
            .fail("predict", 400, "blocked");
        let post = service_for(&upstream).await.generate_instagram_content("campaign", 1).await;
        assert!(!post.success);
        assert_eq!(post.caption, "hi");
        assert!(post.error.unwrap().starts_with("Image generation failed"));
    }

    #[tokio::test]
    async fn test_agent_tool_stores_image_in_state() {
        let upstream = ScriptedUpstream::new()
            .on("generateContent", test_support::call_reply("generate_single_image", json!({"request": "a dog"})))
            .on("generateContent", test_support::text_reply("Image ready"))
            .on("predict", test_support::image_reply(b"img", "image/jpeg"));
        let service = service_for(&upstream).await;
        let client = Arc::new(test_support::gemini_client(&upstream.spawn().await));
        let agent = visual_concept_agent(client, "gemini-2.0-flash", service);

        let mut ctx = InvocationContext::for_message(State::new(), "Dog in a park");
        agent.run(&mut ctx).await.unwrap();

        assert!(ctx.state[IMAGE_STATE_KEY].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
        let response = &upstream.requests_for("generateContent")[1].body["contents"][2]["parts"][0]["functionResponse"]["response"];
        assert_eq!(response["success"], true);
        assert!(response.get("image_data").is_none());
    }
}
