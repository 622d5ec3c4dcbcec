// Library exports for the mood-quote CLI

pub mod agent;
pub mod api;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod evaluate;
pub mod input_handler;
pub mod journal;
pub mod motivation;
pub mod output;
pub mod prompt;
pub mod tokens;

// Re-export commonly used types
pub use agent::{Interaction, MoodAgent};
pub use api::{ApiClient, Completion, GenerativeModel};
pub use config::{AiConfig, Config, GenerationSettings};
pub use error::{MoodError, MoodResult};
pub use motivation::MotivationResponse;
pub use output::OutputHandler;
pub use prompt::{Intensity, PromptBuilder, ShotMode};
pub use tokens::{TokenReport, Usage};
