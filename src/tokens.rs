//! Token accounting for model calls.
//!
//! Providers that report usage are trusted; otherwise a rough four
//! characters per token estimate is logged instead.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Build from raw provider counts, clamping anything past `u32::MAX`.
    pub fn from_counts(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self::new(clamp_count(prompt_tokens), clamp_count(completion_tokens))
    }
}

pub fn clamp_count(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageSource {
    Api,
    Heuristic,
}

impl fmt::Display for UsageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageSource::Api => write!(f, "from API"),
            UsageSource::Heuristic => write!(f, "estimated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenReport {
    pub usage: Usage,
    pub source: UsageSource,
}

impl TokenReport {
    pub fn from_call(usage: Option<Usage>, prompt: &str, response: &str) -> Self {
        match usage {
            Some(usage) => Self {
                usage,
                source: UsageSource::Api,
            },
            None => Self {
                usage: Usage::new(estimate_tokens(prompt), estimate_tokens(response)),
                source: UsageSource::Heuristic,
            },
        }
    }

    pub fn log(&self) {
        tracing::info!(
            prompt = self.usage.prompt_tokens,
            completion = self.usage.completion_tokens,
            total = self.usage.total_tokens,
            source = %self.source,
            "token usage"
        );
    }
}

impl fmt::Display for TokenReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prompt={} completion={} total={} ({})",
            self.usage.prompt_tokens, self.usage.completion_tokens, self.usage.total_tokens, self.source
        )
    }
}

/// Rough token count: one token per four characters, at least one for any
/// non-empty text.
pub fn estimate_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    (chars / 4).max(1)
}
