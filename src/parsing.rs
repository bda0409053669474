// Best-effort parsing of free-form model output
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const CAPTION_MARKER: &str = "INSTAGRAM_CAPTION:";
pub const VISUAL_MARKER: &str = "VISUAL_DESCRIPTION:";

/// Used when the model gives no usable visual description
pub const GENERIC_VISUAL_DESCRIPTION: &str = "Professional marketing image showcasing the campaign concept, \
high-quality commercial photography, engaging composition, NO text or words in image";

const PITCH_FIELDS: [&str; 4] = ["The Big Idea", "Target Impact", "Why It Works", "Bottom Line"];

lazy_static! {
    static ref HASHTAG: Regex = Regex::new(r"#\w+").unwrap();
    static ref NON_PROMPT_CHARS: Regex = Regex::new(r"[^\w\s.,!?-]").unwrap();
    static ref CAMPAIGN_MARKER: Regex = Regex::new(r"(?m)^[^\n*]*\*\*CAMPAIGN ([A-Z]):[ \t]*(.*?)\*\*([^\n]*)").unwrap();
    static ref FIELD_LABEL: Regex = Regex::new(r"\*\*(The Big Idea|Target Impact|Why It Works|Bottom Line):\*\*").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstagramContent {
    pub caption: String,
    pub visual_description: String,
}

/// One campaign idea as rendered in the creative director's pitch layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignPitch {
    pub letter: String,
    pub title: String,
    pub big_idea: Option<String>,
    pub target_impact: Option<String>,
    pub why_it_works: Option<String>,
    pub bottom_line: Option<String>,
    pub raw: String,
}

/// Slice from the first `{` to the last `}` inclusive
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Split a copywriter reply into caption and image description.
///
/// Tries the marker lines first, then a split on the description marker, and
/// finally falls back to the whole text and a generic description.
pub fn parse_instagram_content(text: &str) -> InstagramContent {
    let content = text.trim();
    let mut caption = String::new();
    let mut visual_description = String::new();

    for line in content.lines() {
        if let Some(rest) = line.strip_prefix(CAPTION_MARKER) {
            caption = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix(VISUAL_MARKER) {
            visual_description = rest.trim().to_string();
        }
    }

    if caption.is_empty() || visual_description.is_empty() {
        if content.contains(CAPTION_MARKER) && content.contains(VISUAL_MARKER) {
            let mut parts = content.split(VISUAL_MARKER);
            let head = parts.next().unwrap_or_default().replace(CAPTION_MARKER, "");
            let tail = parts.next().unwrap_or_default().trim();

            if caption.is_empty() && !head.trim().is_empty() {
                caption = head.trim().to_string();
            }
            if visual_description.is_empty() && !tail.is_empty() {
                visual_description = tail.to_string();
            }
        }

        if caption.is_empty() {
            caption = if content.is_empty() {
                "Generated Instagram content".to_string()
            } else {
                content.to_string()
            };
        }
        if visual_description.is_empty() {
            visual_description = GENERIC_VISUAL_DESCRIPTION.to_string();
        }
    }

    InstagramContent {
        caption,
        visual_description,
    }
}

/// Strip hashtags and anything that is not a word char, whitespace or basic punctuation
pub fn sanitize_visual_prompt(text: &str) -> String {
    let without_tags = HASHTAG.replace_all(text, "");
    NON_PROMPT_CHARS.replace_all(&without_tags, "").trim().to_string()
}

/// Append the API key as a query parameter so the uri can be fetched directly
pub fn with_api_key(uri: &str, key: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}key={}", uri, separator, urlencoding::encode(key))
}

/// Pull every `**CAMPAIGN X: Title**` block out of a pitch document.
/// `**CAMPAIGN X:** Title` is accepted too.
pub fn parse_campaign_pitches(text: &str) -> Vec<CampaignPitch> {
    let markers: Vec<_> = CAMPAIGN_MARKER.captures_iter(text).collect();
    let mut pitches = Vec::with_capacity(markers.len());

    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(letter), Some(title)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let block = &text[whole.start()..end];
        let mut title = title.as_str().trim();
        if title.is_empty() {
            title = caps.get(3).map_or("", |rest| rest.as_str().trim());
        }

        pitches.push(CampaignPitch {
            letter: letter.as_str().to_string(),
            title: title.to_string(),
            big_idea: pitch_field(block, PITCH_FIELDS[0]),
            target_impact: pitch_field(block, PITCH_FIELDS[1]),
            why_it_works: pitch_field(block, PITCH_FIELDS[2]),
            bottom_line: pitch_field(block, PITCH_FIELDS[3]),
            raw: block.trim().to_string(),
        });
    }

    pitches
}

// A field runs from its label to the next label, blank line or end of block
fn pitch_field(block: &str, label: &str) -> Option<String> {
    let marker = format!("**{}:**", label);
    let mut lines = block.lines();
    let mut value = Vec::new();

    for line in lines.by_ref() {
        if let Some(pos) = line.find(&marker) {
            value.push(line[pos + marker.len()..].trim());
            break;
        }
    }
    if value.is_empty() {
        return None;
    }

    for line in lines {
        if line.trim().is_empty() || FIELD_LABEL.is_match(line) {
            break;
        }
        value.push(line.trim());
    }

    let joined = value.join("\n").trim().to_string();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
