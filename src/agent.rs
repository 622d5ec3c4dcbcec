//! One mood check-in: prompt the model, validate its reply, retry when the
//! reply is malformed.

use crate::api::GenerativeModel;
use crate::config::GenerationSettings;
use crate::error::{MoodError, MoodResult};
use crate::motivation::MotivationResponse;
use crate::prompt::PromptBuilder;
use crate::tokens::TokenReport;

/// Everything produced while answering one mood.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub response: MotivationResponse,
    pub prompt: String,
    pub raw_text: String,
    pub tokens: TokenReport,
    pub attempts: u32,
}

pub struct MoodAgent<M: GenerativeModel> {
    model: M,
    prompt_builder: PromptBuilder,
    settings: GenerationSettings,
}

impl<M: GenerativeModel> MoodAgent<M> {
    pub fn new(model: M, prompt_builder: PromptBuilder, settings: GenerationSettings) -> Self {
        Self {
            model,
            prompt_builder,
            settings,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn build_prompt(&self, mood_text: &str) -> String {
        self.prompt_builder.build(mood_text)
    }

    /// Ask the model for a quote matching `mood_text`.
    ///
    /// Malformed or empty replies are retried up to `max_attempts` times in
    /// total; transport and API errors are returned at once.
    pub async fn respond(&self, mood_text: &str) -> MoodResult<Interaction> {
        let mood_text = mood_text.trim();
        if mood_text.is_empty() {
            return Err(MoodError::EmptyInput);
        }

        let prompt = self.build_prompt(mood_text);
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = MoodError::EmptyCompletion;

        for attempt in 1..=max_attempts {
            let outcome = match self.model.generate(&prompt, &self.settings).await {
                Ok(completion) => {
                    let tokens = TokenReport::from_call(completion.usage, &prompt, &completion.text);
                    tokens.log();
                    MotivationResponse::parse_strict(&completion.text).map(|response| Interaction {
                        response,
                        prompt: prompt.clone(),
                        raw_text: completion.text,
                        tokens,
                        attempts: attempt,
                    })
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(interaction) => {
                    tracing::info!(
                        model = %self.model.name(),
                        attempt,
                        mood = %interaction.response.mood,
                        "model reply accepted"
                    );
                    return Ok(interaction);
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(attempt, max_attempts, error = %e, "rejected model reply");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Completion;
    use crate::prompt::ShotMode;
    use crate::tokens::{Usage, UsageSource};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned replies in order.
    struct Scripted {
        replies: Mutex<Vec<MoodResult<Completion>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(mut replies: Vec<MoodResult<Completion>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl GenerativeModel for Scripted {
        async fn generate(&self, _prompt: &str, _settings: &GenerationSettings) -> MoodResult<Completion> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(MoodError::EmptyCompletion))
        }

        fn name(&self) -> String {
            "scripted".to_string()
        }
    }

    fn text(s: &str) -> MoodResult<Completion> {
        Ok(Completion {
            text: s.to_string(),
            usage: None,
        })
    }

    const GOOD: &str = r#"{"mood":"sad","quote":"This too shall pass.","author":"Persian adage","suggested_action":"Call a friend."}"#;

    fn agent(model: Scripted) -> MoodAgent<Scripted> {
        MoodAgent::new(model, PromptBuilder::new(ShotMode::Zero), GenerationSettings::default())
    }

    #[tokio::test]
    async fn test_respond_first_try() {
        let agent = agent(Scripted::new(vec![text(GOOD)]));
        let interaction = agent.respond("  feeling sad  ").await.unwrap();

        assert_eq!(interaction.response.mood, "sad");
        assert_eq!(interaction.attempts, 1);
        assert_eq!(interaction.tokens.source, UsageSource::Heuristic);
        assert!(interaction.prompt.ends_with("Mood: \"feeling sad\""));
    }

    #[tokio::test]
    async fn test_retries_malformed_reply() {
        let agent = agent(Scripted::new(vec![
            text("Sure! Here's a quote: stay strong"),
            Ok(Completion {
                text: GOOD.to_string(),
                usage: Some(Usage::new(100, 20)),
            }),
        ]));

        let interaction = agent.respond("sad").await.unwrap();
        assert_eq!(interaction.attempts, 2);
        assert_eq!(interaction.tokens.source, UsageSource::Api);
        assert_eq!(agent.model().calls(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let agent = agent(Scripted::new(vec![
            text(r#"{"mood":"sad"}"#),
            text(r#"{"mood":"sad"}"#),
            text(r#"{"mood":"sad"}"#),
            text(GOOD),
        ]));

        let err = agent.respond("sad").await.unwrap_err();
        assert_matches!(err, MoodError::InvalidResponse(_));
        assert_eq!(agent.model().calls(), 3);
    }

    #[tokio::test]
    async fn test_api_error_not_retried() {
        let agent = agent(Scripted::new(vec![
            Err(MoodError::Api {
                status: 503,
                body: "overloaded".into(),
            }),
            text(GOOD),
        ]));

        let err = agent.respond("sad").await.unwrap_err();
        assert_matches!(err, MoodError::Api { status: 503, .. });
        assert_eq!(agent.model().calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_skips_model() {
        let agent = agent(Scripted::new(vec![text(GOOD)]));
        let err = agent.respond("   ").await.unwrap_err();
        assert_matches!(err, MoodError::EmptyInput);
        assert_eq!(agent.model().calls(), 0);
    }
}
