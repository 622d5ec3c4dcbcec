//! Error types shared by the library modules.
//!
//! The binary wraps these in `anyhow` at the edges; inside the library every
//! fallible call returns [`MoodResult`].

use thiserror::Error;

pub type MoodResult<T> = Result<T, MoodError>;

#[derive(Debug, Error)]
pub enum MoodError {
    #[error("mood input is empty; tell me how you feel in a few words")]
    EmptyInput,

    #[error("model returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("model returned no text")]
    EmptyCompletion,

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot parse embeddings from provider response: {0}")]
    InvalidEmbeddings(String),

    #[error("corrupt journal: {0}")]
    Journal(String),

    #[error("dataset error: {0}")]
    Dataset(String),
}

impl MoodError {
    /// Whether a fresh attempt at the same prompt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MoodError::InvalidResponse(_) | MoodError::EmptyCompletion)
    }
}
