//! Prompt construction
//!
//! Every prompt follows the RFTC layout (Role, Format, Tone, Context) and may
//! carry worked examples ahead of the user's mood. The dynamic mode tunes the
//! tone to how strongly the user phrases their feelings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::motivation::MotivationResponse;

const ROLE: &str = "You are a supportive motivational coach. \
You read how someone feels and answer with one fitting quote from a real, \
well-known person and one small action they can take right now.";

const FORMAT: &str = "Respond with a single JSON object and nothing else. \
It must have exactly these string keys: \"mood\", \"quote\", \"author\", \"suggested_action\". \
\"mood\" is one lowercase word naming the feeling. \
Do not wrap the JSON in markdown and do not add commentary.";

/// Marker the final context line starts with.
pub const MOOD_MARKER: &str = "Mood: ";

const MILD_PHRASES: &[&str] = &[
    "just a bit",
    "a bit",
    "a little",
    "slightly",
    "somewhat",
    "kind of",
    "kinda",
    "sort of",
];

const STRONG_PHRASES: &[&str] = &[
    "extremely",
    "incredibly",
    "really really",
    "so so",
    "very",
    "super",
    "totally",
    "completely",
    "terribly",
    "overwhelmed",
];

/// How many worked examples go in front of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShotMode {
    Zero,
    One,
    #[default]
    Multi,
    /// Multi-shot examples plus a tone adjusted to the detected intensity.
    Dynamic,
}

impl ShotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShotMode::Zero => "zero",
            ShotMode::One => "one",
            ShotMode::Multi => "multi",
            ShotMode::Dynamic => "dynamic",
        }
    }

    fn example_count(&self) -> usize {
        match self {
            ShotMode::Zero => 0,
            ShotMode::One => 1,
            ShotMode::Multi | ShotMode::Dynamic => EXAMPLES.len(),
        }
    }
}

impl fmt::Display for ShotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zero" | "zero-shot" | "0" => Ok(ShotMode::Zero),
            "one" | "one-shot" | "1" => Ok(ShotMode::One),
            "multi" | "multi-shot" | "few" => Ok(ShotMode::Multi),
            "dynamic" => Ok(ShotMode::Dynamic),
            other => Err(format!(
                "unknown shot mode '{}', expected zero, one, multi or dynamic",
                other
            )),
        }
    }
}

/// How strongly the user phrased their mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Mild,
    Moderate,
    Strong,
}

impl Intensity {
    /// Case-insensitive phrase match. Strong wins over mild.
    pub fn detect(text: &str) -> Self {
        let padded = format!(" {} ", normalize(text));
        let has = |phrase: &&str| padded.contains(&format!(" {} ", phrase));

        if STRONG_PHRASES.iter().any(has) {
            Intensity::Strong
        } else if MILD_PHRASES.iter().any(has) {
            Intensity::Mild
        } else {
            Intensity::Moderate
        }
    }

    fn tone(&self) -> &'static str {
        match self {
            Intensity::Mild => "Keep it light and upbeat. A short, cheerful quote is enough.",
            Intensity::Moderate => "Be warm and encouraging without being preachy.",
            Intensity::Strong => {
                "Be calm, gentle and grounding. Acknowledge that this feels heavy \
                 and suggest a very small, doable action."
            }
        }
    }
}

/// Lowercase and collapse everything that is not a letter, digit or apostrophe into
/// single spaces so phrase matching works on word boundaries.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

struct Example {
    input: &'static str,
    output: (&'static str, &'static str, &'static str, &'static str),
}

const EXAMPLES: &[Example] = &[
    Example {
        input: "I'm feeling anxious today",
        output: (
            "anxious",
            "You don't have to control your thoughts. You just have to stop letting them control you.",
            "Dan Millman",
            "Try a 2-minute breathing exercise.",
        ),
    },
    Example {
        input: "I'm so tired, I can't focus on anything",
        output: (
            "tired",
            "Rest when you're weary. Refresh and renew yourself, your body, your mind, your spirit. Then get back to work.",
            "Ralph Marston",
            "Take a 10-minute walk away from your screen.",
        ),
    },
    Example {
        input: "Just a bit unmotivated this morning",
        output: (
            "unmotivated",
            "The secret of getting ahead is getting started.",
            "Mark Twain",
            "Pick one task and work on it for five minutes.",
        ),
    },
];

/// Builds RFTC prompts for a given shot mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    mode: ShotMode,
}

impl PromptBuilder {
    pub fn new(mode: ShotMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ShotMode {
        self.mode
    }

    pub fn build(&self, mood_text: &str) -> String {
        let mood_text = mood_text.trim();
        let intensity = match self.mode {
            ShotMode::Dynamic => Intensity::detect(mood_text),
            _ => Intensity::Moderate,
        };

        let mut prompt = String::new();
        prompt.push_str("Role: ");
        prompt.push_str(ROLE);
        prompt.push_str("\n\nFormat: ");
        prompt.push_str(FORMAT);
        prompt.push_str("\n\nTone: ");
        prompt.push_str(intensity.tone());

        let examples = &EXAMPLES[..self.mode.example_count()];
        if !examples.is_empty() {
            prompt.push_str("\n\nExamples:");
            for example in examples {
                let (mood, quote, author, action) = example.output;
                let reply = MotivationResponse::new(mood, quote, author, action);
                prompt.push_str(&format!(
                    "\n{}{}\nResponse: {}",
                    MOOD_MARKER,
                    quote_text(example.input),
                    reply.to_json()
                ));
            }
        }

        prompt.push_str("\n\nContext: the user described how they feel today.\n");
        prompt.push_str(MOOD_MARKER);
        prompt.push_str(&quote_text(mood_text));
        prompt
    }
}

/// JSON string literal, so newlines and quotes stay on the marker line.
fn quote_text(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Recover the user's mood text from a prompt built by [`PromptBuilder`].
pub fn mood_from_prompt(prompt: &str) -> Option<String> {
    let line = prompt.lines().rev().find(|l| l.starts_with(MOOD_MARKER))?;
    serde_json::from_str::<String>(line[MOOD_MARKER.len()..].trim()).ok()
}
