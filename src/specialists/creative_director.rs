// Creative director: campaign ideas from Grok, with static fallbacks, formatted as pitches
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::agent::tool::{required_str_arg, str_arg};
use crate::agent::{FunctionTool, LlmAgent};
use crate::error::AgentError;
use crate::gemini_client::{FunctionDeclaration, GeminiClient};
use crate::grok_client::GrokClient;
use crate::parsing::extract_json_object;

pub const NAME: &str = "creative_director";
pub const GROK_SOURCE: &str = "Grok API (X.AI)";
pub const FALLBACK_SOURCE: &str = "Fallback ideas (Grok API unavailable)";

const GROK_TEMPERATURE: f32 = 0.7;
const PITCH_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct CampaignIdea {
    pub title: String,
    pub description: String,
    pub target_audience: String,
    pub approach: String,
    pub key_messages: Vec<String>,
    pub content_pillars: Vec<String>,
    pub channels: Vec<String>,
    pub tone: String,
}

/// What `grok_creative_assistant` hands back to the creative director
#[derive(Debug, Clone, Serialize)]
pub struct CreativeIdeas {
    pub status: String,
    pub company_name: String,
    pub generated_date: String,
    pub campaign_ideas: Vec<CampaignIdea>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<Vec<String>>,
}

impl CreativeIdeas {
    pub fn is_fallback(&self) -> bool {
        self.source != GROK_SOURCE
    }
}

/// Generates campaign ideas through Grok; any failure degrades to fallback ideas.
#[derive(Clone)]
pub struct CreativeAssistant {
    grok: Option<Arc<GrokClient>>,
}

impl CreativeAssistant {
    pub fn new(grok: Option<Arc<GrokClient>>) -> Self {
        Self { grok }
    }

    pub async fn campaign_ideas(&self, research_report: &str, goals_audience: &str, company_name: &str) -> CreativeIdeas {
        let Some(grok) = &self.grok else {
            tracing::warn!("GROK_API_KEY not set, using fallback campaign ideas");
            return fallback_ideas(research_report, goals_audience, company_name);
        };

        let prompt = creative_prompt(research_report, goals_audience, company_name);
        let reply = match grok.chat_completion(&prompt, GROK_TEMPERATURE).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Grok request failed, using fallback campaign ideas: {}", e);
                return fallback_ideas(research_report, goals_audience, company_name);
            }
        };

        match parse_grok_ideas(&reply) {
            Some(campaign_ideas) => {
                tracing::info!("Grok returned {} campaign ideas for {}", campaign_ideas.len(), company_name);
                CreativeIdeas {
                    status: "success".to_string(),
                    company_name: company_name.to_string(),
                    generated_date: chrono::Utc::now().to_rfc3339(),
                    campaign_ideas,
                    source: GROK_SOURCE.to_string(),
                    next_steps: None,
                }
            }
            None => {
                tracing::warn!("Could not parse campaign ideas from Grok reply, using fallback");
                fallback_ideas(research_report, goals_audience, company_name)
            }
        }
    }
}

fn creative_prompt(research_report: &str, goals_audience: &str, company_name: &str) -> String {
    format!(
        "Act as a creative director planning marketing campaigns.\n\n\
         Company: {company_name}\n\
         Goals and audience: {goals_audience}\n\n\
         Research:\n{research_report}\n\n\
         Propose exactly 2 distinct campaign ideas that fit the audience, play to the company's \
         strengths, stand apart from competitors and can actually be executed.\n\n\
         Answer with JSON only, shaped like:\n\
         {{\"campaign_ideas\": [{{\"title\": \"\", \"description\": \"\", \"target_audience\": \"\", \
         \"approach\": \"\", \"key_messages\": [\"\"], \"content_pillars\": [\"\"], \"channels\": [\"\"], \
         \"tone\": \"\"}}]}}"
    )
}

fn parse_grok_ideas(reply: &str) -> Option<Vec<CampaignIdea>> {
    let parsed: Value = serde_json::from_str(extract_json_object(reply)?).ok()?;
    let ideas: Vec<CampaignIdea> = parsed
        .get("campaign_ideas")?
        .as_array()?
        .iter()
        .filter_map(CampaignIdea::from_json)
        .collect();
    (!ideas.is_empty()).then_some(ideas)
}

impl CampaignIdea {
    /// Lenient read of one model-written idea; `None` unless it is a JSON object
    fn from_json(value: &Value) -> Option<Self> {
        let idea = value.as_object()?;
        let text = |key: &str| idea.get(key).map(text_value).unwrap_or_default();
        let list = |key: &str| -> Vec<String> {
            match idea.get(key) {
                Some(Value::Array(items)) => items
                    .iter()
                    .map(text_value)
                    .filter(|item| !item.is_empty())
                    .collect(),
                Some(other) => Some(text_value(other)).filter(|item| !item.is_empty()).into_iter().collect(),
                None => Vec::new(),
            }
        };
        Some(Self {
            title: text("title"),
            description: text("description"),
            target_audience: text("target_audience"),
            approach: text("approach"),
            key_messages: list("key_messages"),
            content_pillars: list("content_pillars"),
            channels: list("channels"),
            tone: text("tone"),
        })
    }
}

fn text_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Canned ideas chosen from what the request mentions
pub fn fallback_ideas(research_report: &str, goals_audience: &str, company_name: &str) -> CreativeIdeas {
    let goals = goals_audience.to_lowercase();
    let is_tesla = company_name.to_lowercase().contains("tesla");
    let is_family = goals.contains("family") || goals.contains("dad");
    let is_tech = research_report.to_lowercase().contains("technology") || goals.contains("tech");

    let campaign_ideas = if is_tesla && is_family {
        family_ideas()
    } else if is_tech {
        tech_ideas(company_name)
    } else {
        generic_ideas(company_name)
    };

    CreativeIdeas {
        status: "success".to_string(),
        company_name: company_name.to_string(),
        generated_date: chrono::Utc::now().to_rfc3339(),
        campaign_ideas,
        source: FALLBACK_SOURCE.to_string(),
        next_steps: Some(
            [
                "Pick one campaign for visual concept development",
                "Write the creative brief and messaging framework",
                "Set the visual style and concept guidelines",
                "Plan the content calendar and production timeline",
            ]
            .map(String::from)
            .to_vec(),
        ),
    }
}

fn idea(
    title: &str,
    description: &str,
    target_audience: &str,
    approach: &str,
    key_messages: &[&str],
    content_pillars: &[&str],
    channels: &[&str],
    tone: &str,
) -> CampaignIdea {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    CampaignIdea {
        title: title.to_string(),
        description: description.to_string(),
        target_audience: target_audience.to_string(),
        approach: approach.to_string(),
        key_messages: owned(key_messages),
        content_pillars: owned(content_pillars),
        channels: owned(channels),
        tone: tone.to_string(),
    }
}

fn family_ideas() -> Vec<CampaignIdea> {
    vec![
        idea(
            "Road Trips For Tomorrow",
            "Tesla as the car for families who want weekend adventures and a cleaner world for their kids. Real families on real trips, from school runs to national parks.",
            "Dads aged 30-45 who care about family time and the environment",
            "Documentary-style stories of families on the road, told from the kids' point of view",
            &["Adventure without compromise", "Safety you can feel", "Teach sustainability by example"],
            &["Family road trips", "Safety features", "Kids and clean energy", "Everyday moments"],
            &["Instagram", "YouTube", "Facebook", "Parenting podcasts"],
            "Warm, adventurous, hopeful",
        ),
        idea(
            "The Smart Dad Choice",
            "Frames buying a Tesla as a practical decision a thoughtful father makes: lower running costs, top safety ratings and tech the whole family enjoys.",
            "Practical fathers comparing family vehicles",
            "Side-by-side cost and safety comparisons hosted by real dads",
            &["Smart money, smarter car", "Safety first, always", "Tech the kids love"],
            &["Cost of ownership", "Crash safety", "Over-the-air updates", "Dad testimonials"],
            &["YouTube", "Facebook", "Search", "Automotive review sites"],
            "Confident, practical, friendly",
        ),
    ]
}

fn tech_ideas(company_name: &str) -> Vec<CampaignIdea> {
    vec![
        idea(
            "Built Ahead",
            &format!("Tells the story of how {} ships what others are still planning, with engineers showing the breakthroughs behind the product.", company_name),
            "Early adopters and technical decision makers",
            "Behind-the-scenes engineering stories and live product demos",
            &["Innovation you can use today", "Engineered in the open", "Leading, not following"],
            &["Engineering stories", "Product demos", "Customer wins", "Roadmap previews"],
            &["LinkedIn", "YouTube", "Tech podcasts", "Developer communities"],
            "Bold, precise, optimistic",
        ),
        idea(
            "Technology With A Human Face",
            &format!("Shows the people whose days {} makes easier, putting customers rather than specs at the centre of the story.", company_name),
            "Mainstream buyers wary of complicated technology",
            "Short customer portraits contrasting life before and after",
            &["Simple on the surface", "Made for people", "Real results"],
            &["Customer portraits", "Everyday use", "Support stories", "Accessibility"],
            &["Instagram", "TikTok", "Facebook", "Email"],
            "Empathetic, clear, reassuring",
        ),
    ]
}

fn generic_ideas(company_name: &str) -> Vec<CampaignIdea> {
    vec![
        idea(
            &format!("The {} Story", company_name),
            &format!("An honest look at why {} exists and who it serves, told through the founders and the team.", company_name),
            "Values-driven customers who buy from brands they trust",
            "Founder interviews and team profiles released as a short series",
            &["Why we started", "People behind the product", "Promises we keep"],
            &["Origin story", "Team profiles", "Customer promises", "Milestones"],
            &["Instagram", "LinkedIn", "YouTube", "Blog"],
            "Authentic, personal, confident",
        ),
        idea(
            "Local Heroes",
            &format!("Celebrates the customers and communities {} works with, turning their achievements into the campaign's centrepiece.", company_name),
            "Local communities and existing customers",
            "User-generated stories collected through a community challenge",
            &["Your success is our story", "Rooted in the community", "Better together"],
            &["Customer spotlights", "Community events", "Partnerships", "Giving back"],
            &["Instagram", "Facebook", "Local media", "Community events"],
            "Inclusive, celebratory, grounded",
        ),
    ]
}

/// Lay ideas out as `**CAMPAIGN A: Title**` pitches with the four labelled fields
pub fn render_pitches(ideas: &[CampaignIdea]) -> String {
    ideas
        .iter()
        .zip(PITCH_LETTERS.iter())
        .map(|(idea, letter)| {
            let mut why = idea.approach.clone();
            if !idea.key_messages.is_empty() {
                why = format!("{} Key messages: {}.", why.trim_end_matches('.'), idea.key_messages.join("; "));
            }
            let mut bottom_line = format!("Tone: {}.", idea.tone.trim_end_matches('.'));
            if !idea.channels.is_empty() {
                bottom_line.push_str(&format!(" Channels: {}.", idea.channels.join(", ")));
            }

            format!(
                "**CAMPAIGN {}: {}**\n**The Big Idea:** {}\n**Target Impact:** {}\n**Why It Works:** {}\n**Bottom Line:** {}",
                *letter as char,
                idea.title.trim(),
                idea.description.trim(),
                idea.target_audience.trim(),
                why.trim(),
                bottom_line
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn creative_director_agent(client: Arc<GeminiClient>, model: &str, assistant: CreativeAssistant) -> LlmAgent {
    let declaration = FunctionDeclaration::new(
        "grok_creative_assistant",
        "Generate two campaign ideas from the research report, goals and audience",
    )
    .param("research_report", "string", "Research findings about the company and market", true)
    .param("goals_audience", "string", "Campaign goals and target audience", true)
    .param("company_name", "string", "Company name", true);

    let tool = FunctionTool::new(declaration, move |args: Value| {
        let assistant = assistant.clone();
        async move {
            let company_name = required_str_arg(&args, "grok_creative_assistant", "company_name")?;
            let research_report = str_arg(&args, "research_report").unwrap_or_default();
            let goals_audience = str_arg(&args, "goals_audience").unwrap_or_default();

            let ideas = assistant
                .campaign_ideas(&research_report, &goals_audience, &company_name)
                .await;
            let pitches = render_pitches(&ideas.campaign_ideas);
            let mut result = serde_json::to_value(&ideas)
                .map_err(|e| AgentError::tool("grok_creative_assistant", e.to_string()))?;
            result["formatted_pitches"] = json!(pitches);
            Ok(result)
        }
    });

    LlmAgent::new(NAME, model, client)
        .with_description("Turns research into two campaign pitches the user can choose from")
        .with_instruction(
            "You are a creative director. Call grok_creative_assistant once with the research report, \
             the goals and audience, and the company name from the conversation.\n\n\
             Research so far:\n{research_report?}\n\n\
             Present every returned idea in this exact layout, one block per campaign, lettered A, B:\n\n\
             **CAMPAIGN A: <title>**\n\
             **The Big Idea:** <core concept>\n\
             **Target Impact:** <who it reaches and what it achieves>\n\
             **Why It Works:** <strategic rationale>\n\
             **Bottom Line:** <key benefit and call to action>\n\n\
             The tool result includes formatted_pitches in this layout; refine the wording but keep the \
             structure. Finish by asking which campaign to develop.",
        )
        .with_tool(Arc::new(tool))
        .with_output_key("campaign_pitches")
}
