use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MoodError, MoodResult};

/// Keys a model reply must carry, in display order.
pub const RESPONSE_KEYS: [&str; 4] = ["mood", "quote", "author", "suggested_action"];

/// The record a model produces for one mood check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotivationResponse {
    pub mood: String,
    pub quote: String,
    pub author: String,
    pub suggested_action: String,
}

impl MotivationResponse {
    pub fn new(
        mood: impl Into<String>,
        quote: impl Into<String>,
        author: impl Into<String>,
        suggested_action: impl Into<String>,
    ) -> Self {
        Self {
            mood: mood.into(),
            quote: quote.into(),
            author: author.into(),
            suggested_action: suggested_action.into(),
        }
    }

    /// Reply used when the offline model has nothing better to offer.
    pub fn fallback(mood: &str) -> Self {
        Self::new(
            mood,
            "Keep going, you're doing better than you think.",
            "AI Coach",
            "Pause and breathe.",
        )
    }

    /// Parse raw model text into a response.
    ///
    /// The object may be wrapped in a markdown code fence or surrounded by
    /// chatter. It must have exactly the four keys and every value must be a
    /// string.
    pub fn parse_strict(text: &str) -> MoodResult<Self> {
        let json = extract_json(text)
            .ok_or_else(|| MoodError::InvalidResponse("no JSON object found".to_string()))?;

        let value: Value = serde_json::from_str(json)
            .map_err(|e| MoodError::InvalidResponse(format!("malformed JSON: {}", e)))?;

        let object = value
            .as_object()
            .ok_or_else(|| MoodError::InvalidResponse("expected a JSON object".to_string()))?;

        let missing: Vec<&str> = RESPONSE_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(MoodError::InvalidResponse(format!(
                "missing keys: {}",
                missing.join(", ")
            )));
        }

        let mut extra: Vec<&str> = object
            .keys()
            .map(String::as_str)
            .filter(|key| !RESPONSE_KEYS.contains(key))
            .collect();
        if !extra.is_empty() {
            extra.sort_unstable();
            return Err(MoodError::InvalidResponse(format!(
                "unexpected keys: {}",
                extra.join(", ")
            )));
        }

        for key in RESPONSE_KEYS {
            if !object[key].is_string() {
                return Err(MoodError::InvalidResponse(format!(
                    "value of `{}` must be a string",
                    key
                )));
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Compact JSON with keys in display order.
    pub fn to_json(&self) -> String {
        // A struct of four strings always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Locate the JSON object inside a model reply.
pub fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body_start = start + "```json".len();
        if let Some(end) = text[body_start..].find("```") {
            return Some(text[body_start..body_start + end].trim());
        }
    }

    if let Some(start) = text.find("```") {
        let body_start = start + 3;
        if let Some(end) = text[body_start..].find("```") {
            let body = text[body_start..body_start + end].trim();
            if body.starts_with('{') {
                return Some(body);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].trim())
}
