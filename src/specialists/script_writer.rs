// Script writer: deterministic Veo prompt builders plus the agent that uses them
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::agent::tool::{required_str_arg, str_arg, str_list_arg};
use crate::agent::{FunctionTool, LlmAgent};
use crate::error::AgentError;
use crate::gemini_client::{FunctionDeclaration, GeminiClient};

pub const NAME: &str = "script_writer_agent";
pub const DEFAULT_MAX_PROMPT_LENGTH: usize = 1000;
pub const DEFAULT_REQUIRED_ELEMENTS: [&str; 4] = ["camera", "lighting", "audio", "duration"];

const SEQUENCE_ANGLES: [&str; 4] = [
    "establishing wide shot",
    "medium tracking shot",
    "close-up detail shot",
    "dynamic movement shot",
];
const MAX_KEY_MOMENTS: usize = 3;
const VEO_HINTS: [&str; 3] = ["16:9", "5 second", "audio"];

/// Fixed multi-shot script around the request
pub fn create_veo_script(request: &str) -> String {
    format!(
        "[OPENING SHOT]: Wide establishing shot setting the scene. Camera smoothly transitions to medium shot \
         showing the main subject in action related to: {}. [CLOSE-UP]: Detail shot capturing the key emotional \
         moment. [AUDIO]: Upbeat background music with natural sound effects. [LIGHTING]: Professional lighting \
         with warm tones. [BRAND INTEGRATION]: Subtle branding woven naturally into the scene. [FINAL MOMENT]: \
         Memorable closing shot. Duration: ~5 seconds. Aspect ratio: 16:9.",
        request.trim()
    )
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SequenceBreakdown {
    pub opening: String,
    pub key_moments: Vec<String>,
    pub brand_integration: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TechnicalSpecs {
    pub angles_used: usize,
    pub transition_style: String,
    pub pacing: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultiAngleSequence {
    pub success: bool,
    pub multi_angle_prompt: String,
    pub sequence_breakdown: SequenceBreakdown,
    pub technical_specs: TechnicalSpecs,
}

fn transition_phrase(style: &str) -> &'static str {
    match style {
        "smooth" => "seamlessly transitions",
        "dynamic" => "dynamically cuts",
        "cut" => "quickly cuts",
        _ => "smoothly transitions",
    }
}

/// Opening shot, up to three key moments on successive angles, then optional branding
pub fn create_multi_angle_sequence(
    scene_description: &str,
    key_moments: &[String],
    brand_elements: &str,
    transition_style: &str,
) -> MultiAngleSequence {
    let transition = transition_phrase(transition_style);
    let opening = format!("Opening {} of {}", SEQUENCE_ANGLES[0], scene_description);

    let moments: Vec<String> = key_moments
        .iter()
        .take(MAX_KEY_MOMENTS)
        .enumerate()
        .map(|(i, moment)| {
            let angle = SEQUENCE_ANGLES[(i + 1).min(SEQUENCE_ANGLES.len() - 1)];
            format!("Camera {} to {} capturing {}", transition, angle, moment)
        })
        .collect();

    let brand = (!brand_elements.trim().is_empty()).then(|| format!("Subtle integration of {}", brand_elements));

    let mut parts = vec![opening.clone()];
    parts.extend(moments.iter().cloned());
    parts.extend(brand.iter().cloned());

    tracing::debug!("Built multi-angle sequence with {} key moments", moments.len());
    MultiAngleSequence {
        success: true,
        multi_angle_prompt: format!("{}.", parts.join(". ")),
        sequence_breakdown: SequenceBreakdown {
            opening,
            key_moments: moments,
            brand_integration: brand.unwrap_or_else(|| "None".to_string()),
        },
        technical_specs: TechnicalSpecs {
            angles_used: parts.len(),
            transition_style: transition_style.to_string(),
            pacing: "~5-second optimization".to_string(),
        },
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PromptValidation {
    pub length_check: bool,
    pub current_length: usize,
    pub max_length: usize,
    pub required_elements: BTreeMap<String, bool>,
    pub suggestions: Vec<String>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationReport {
    pub success: bool,
    pub validation: PromptValidation,
    pub prompt: String,
    pub optimization_score: u32,
}

/// Check length and required keywords, suggest Veo hints, and score 0-100.
///
/// Score: 20 for length, up to 60 for required elements present, 20 when
/// there is nothing to suggest.
pub fn validate_veo_prompt(prompt: &str, max_length: usize, required_elements: &[String]) -> ValidationReport {
    let lower = prompt.to_lowercase();
    let current_length = prompt.chars().count();
    let length_check = current_length <= max_length;

    let presence: BTreeMap<String, bool> = required_elements
        .iter()
        .map(|e| (e.clone(), lower.contains(&e.to_lowercase())))
        .collect();
    // Request order, each element once
    let mut missing: Vec<&str> = Vec::new();
    for element in required_elements {
        if !presence[element] && !missing.contains(&element.as_str()) {
            missing.push(element);
        }
    }

    let mut suggestions = Vec::new();
    if !length_check {
        suggestions.push("Prompt is too long, consider shortening".to_string());
    }
    if !missing.is_empty() {
        suggestions.push(format!("Consider adding: {}", missing.join(", ")));
    }
    for hint in VEO_HINTS {
        if !lower.contains(hint) {
            suggestions.push(format!("Consider specifying {} for Veo 2.0 optimization", hint));
        }
    }

    let validation = PromptValidation {
        length_check,
        current_length,
        max_length,
        is_valid: length_check && missing.is_empty(),
        required_elements: presence,
        suggestions,
    };
    let optimization_score = optimization_score(&validation);
    tracing::info!("Prompt validation score: {}/100", optimization_score);

    ValidationReport {
        success: true,
        validation,
        prompt: prompt.to_string(),
        optimization_score,
    }
}

fn optimization_score(validation: &PromptValidation) -> u32 {
    let mut score = 0;
    if validation.length_check {
        score += 20;
    }
    let required = validation.required_elements.len();
    if required > 0 {
        let present = validation.required_elements.values().filter(|p| **p).count();
        score += (present * 60 / required) as u32;
    }
    if validation.suggestions.is_empty() {
        score += 20;
    }
    score.min(100)
}

fn to_tool_value<T: Serialize>(tool: &str, value: &T) -> Result<Value, AgentError> {
    serde_json::to_value(value).map_err(|e| AgentError::tool(tool, e.to_string()))
}

pub fn script_writer_agent(client: Arc<GeminiClient>, model: &str) -> LlmAgent {
    let script_tool = FunctionTool::new(
        FunctionDeclaration::new("create_veo_script", "Create a multi-shot Veo script from campaign and visual concept details")
            .param("request", "string", "Campaign and visual concept details", true),
        |args: Value| async move {
            let request = required_str_arg(&args, "create_veo_script", "request")?;
            Ok(json!({ "script": create_veo_script(&request) }))
        },
    );

    let sequence_tool = FunctionTool::new(
        FunctionDeclaration::new("create_multi_angle_sequence", "Build a multi-angle shot sequence with transitions")
            .param("scene_description", "string", "Main scene description", true)
            .string_list_param("key_moments", "Up to three key moments to highlight", true)
            .param("brand_elements", "string", "Brand elements to integrate", false)
            .param("transition_style", "string", "smooth, dynamic or cut", false),
        |args: Value| async move {
            let scene = required_str_arg(&args, "create_multi_angle_sequence", "scene_description")?;
            let sequence = create_multi_angle_sequence(
                &scene,
                &str_list_arg(&args, "key_moments"),
                &str_arg(&args, "brand_elements").unwrap_or_default(),
                &str_arg(&args, "transition_style").unwrap_or_else(|| "smooth".to_string()),
            );
            to_tool_value("create_multi_angle_sequence", &sequence)
        },
    );

    let validate_tool = FunctionTool::new(
        FunctionDeclaration::new("validate_veo_prompt", "Check a Veo prompt for length and required elements and score it")
            .param("prompt", "string", "The Veo prompt to validate", true)
            .param("max_length", "integer", "Maximum prompt length in characters (default 1000)", false)
            .string_list_param("required_elements", "Keywords the prompt must contain", false),
        |args: Value| async move {
            let prompt = required_str_arg(&args, "validate_veo_prompt", "prompt")?;
            let max_length = args
                .get("max_length")
                .and_then(Value::as_u64)
                .map_or(DEFAULT_MAX_PROMPT_LENGTH, |n| n as usize);
            let mut required = str_list_arg(&args, "required_elements");
            if required.is_empty() {
                required = DEFAULT_REQUIRED_ELEMENTS.map(String::from).to_vec();
            }
            to_tool_value("validate_veo_prompt", &validate_veo_prompt(&prompt, max_length, &required))
        },
    );

    LlmAgent::new(NAME, model, client)
        .with_description("Writes cinematic ~5 second Veo video scripts from a campaign and visual concept")
        .with_instruction(
            "You write prompts for the Veo video model. Given a campaign and an approved visual concept, \
             produce one script of about 5 seconds in 16:9 that moves through several camera angles \
             (establishing, medium, close-up), describes setting, lighting, colour and mood, shows the product \
             in use with real human emotion, integrates the brand naturally and ends on a memorable moment. \
             The video must contain NO visible text, words, letters, or typography.\n\n\
             Use create_veo_script or create_multi_angle_sequence as a starting structure, check your draft \
             with validate_veo_prompt, and reply with the final script only.",
        )
        .with_tool(Arc::new(script_tool))
        .with_tool(Arc::new(sequence_tool))
        .with_tool(Arc::new(validate_tool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, InvocationContext, State};
    use crate::test_support::{self, ScriptedUpstream};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_veo_script_template() {
        let script = create_veo_script("  family road trip ");
        assert!(script.starts_with("[OPENING SHOT]: Wide establishing shot"));
        assert!(script.contains("related to: family road trip."));
        for section in ["[CLOSE-UP]", "[AUDIO]", "[LIGHTING]", "[BRAND INTEGRATION]", "[FINAL MOMENT]"] {
            assert!(script.contains(section), "missing {}", section);
        }
        assert!(script.ends_with("Duration: ~5 seconds. Aspect ratio: 16:9."));
    }

    #[test]
    fn test_multi_angle_sequence() {
        let moments = strings(&["kids laughing", "dad charging the car", "sunset drive", "ignored"]);
        let sequence = create_multi_angle_sequence("a coastal road", &moments, "Tesla logo", "dynamic");

        assert_eq!(
            sequence.multi_angle_prompt,
            "Opening establishing wide shot of a coastal road. \
             Camera dynamically cuts to medium tracking shot capturing kids laughing. \
             Camera dynamically cuts to close-up detail shot capturing dad charging the car. \
             Camera dynamically cuts to dynamic movement shot capturing sunset drive. \
             Subtle integration of Tesla logo."
        );
        assert_eq!(sequence.sequence_breakdown.key_moments.len(), 3);
        assert_eq!(sequence.sequence_breakdown.brand_integration, "Subtle integration of Tesla logo");
        assert_eq!(sequence.technical_specs.angles_used, 5);
    }

    #[test]
    fn test_multi_angle_sequence_without_brand() {
        let sequence = create_multi_angle_sequence("a kitchen", &strings(&["pouring coffee"]), "", "unknown");
        assert_eq!(
            sequence.multi_angle_prompt,
            "Opening establishing wide shot of a kitchen. Camera smoothly transitions to medium tracking shot capturing pouring coffee."
        );
        assert_eq!(sequence.sequence_breakdown.brand_integration, "None");
        assert_eq!(sequence.technical_specs.angles_used, 2);

        let empty = create_multi_angle_sequence("a park", &[], "", "cut");
        assert_eq!(empty.multi_angle_prompt, "Opening establishing wide shot of a park.");
        assert!(empty.sequence_breakdown.key_moments.is_empty());
    }

    #[test]
    fn test_validate_complete_prompt() {
        let prompt = "Camera pans, warm lighting, upbeat audio, duration 5 seconds, 16:9.";
        let report = validate_veo_prompt(prompt, 1000, &strings(&DEFAULT_REQUIRED_ELEMENTS));
        assert!(report.validation.is_valid);
        assert!(report.validation.suggestions.is_empty());
        assert_eq!(report.optimization_score, 100);
    }

    #[test]
    fn test_validate_incomplete_prompt() {
        let report = validate_veo_prompt("A CAMERA glides over a city", 10, &strings(&DEFAULT_REQUIRED_ELEMENTS));
        let v = &report.validation;

        assert!(!v.length_check);
        assert_eq!(v.current_length, 27);
        assert!(v.required_elements["camera"]);
        assert!(!v.required_elements["lighting"]);
        assert!(!v.is_valid);
        assert_eq!(
            v.suggestions,
            vec![
                "Prompt is too long, consider shortening",
                "Consider adding: lighting, audio, duration",
                "Consider specifying 16:9 for Veo 2.0 optimization",
                "Consider specifying 5 second for Veo 2.0 optimization",
                "Consider specifying audio for Veo 2.0 optimization",
            ]
        );
        // 0 for length + 1/4 of 60 + 0 for suggestions
        assert_eq!(report.optimization_score, 15);
    }

    #[test]
    fn test_validate_repeated_required_element() {
        let required = strings(&["lighting", "camera", "lighting"]);
        let report = validate_veo_prompt("A camera glides, 16:9, 5 seconds, audio", 1000, &required);
        let v = &report.validation;

        assert_eq!(v.required_elements.len(), 2);
        assert_eq!(v.suggestions, vec!["Consider adding: lighting"]);
        // 20 for length + 1/2 of 60
        assert_eq!(report.optimization_score, 50);
    }

    #[test]
    fn test_validate_without_required_elements() {
        let report = validate_veo_prompt("16:9, 5 seconds with audio", 1000, &[]);
        assert!(report.validation.is_valid);
        assert_eq!(report.optimization_score, 40);
    }

    #[tokio::test]
    async fn test_agent_uses_tools() {
        let upstream = ScriptedUpstream::new()
            .on("generateContent", test_support::call_reply("validate_veo_prompt", json!({"prompt": "camera lighting"})))
            .on("generateContent", test_support::text_reply("Final script"));
        let client = Arc::new(test_support::gemini_client(&upstream.spawn().await));
        let agent = script_writer_agent(client, "gemini-2.0-flash");
        assert_eq!(
            agent.tool_names(),
            vec!["create_veo_script", "create_multi_angle_sequence", "validate_veo_prompt"]
        );

        let mut ctx = InvocationContext::for_message(State::new(), "Write a script");
        agent.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.last_model_text(), Some("Final script"));

        let response = &upstream.requests_for("generateContent")[1].body["contents"][2]["parts"][0]["functionResponse"]["response"];
        assert_eq!(response["validation"]["max_length"], 1000);
        assert_eq!(response["validation"]["required_elements"]["audio"], false);
    }
}
