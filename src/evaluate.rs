//! Offline evaluation harness.
//!
//! Runs a labelled dataset through a [`MoodAgent`] and scores each reply
//! against the expected one with a weighted text similarity. The bundled
//! [`MockModel`] answers from a local quotes file so the whole pipeline can
//! be exercised without network access.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use crate::agent::MoodAgent;
use crate::api::{Completion, GenerativeModel};
use crate::config::GenerationSettings;
use crate::error::{MoodError, MoodResult};
use crate::motivation::MotivationResponse;
use crate::prompt::mood_from_prompt;

const MOOD_WEIGHT: f64 = 0.25;
const QUOTE_WEIGHT: f64 = 0.45;
const AUTHOR_WEIGHT: f64 = 0.15;
const ACTION_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub input: String,
    pub expected: MotivationResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub mood_score: f64,
    pub quote_score: f64,
    pub author_score: f64,
    pub action_score: f64,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleResult {
    pub id: Option<serde_json::Value>,
    pub input: String,
    pub expected: MotivationResponse,
    pub actual: Option<MotivationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scores: Scores,
    pub latency_s: f64,
    pub temperature: f32,
    pub top_k: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub average_overall_score: f64,
    pub average_latency_s: f64,
    pub num_samples: usize,
    pub num_failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub summary: Summary,
    pub results: Vec<SampleResult>,
}

fn read_json_file<T: for<'de> Deserialize<'de>>(path: &Path) -> MoodResult<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| MoodError::Dataset(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| MoodError::Dataset(format!("invalid JSON in {}: {}", path.display(), e)))
}

pub fn load_dataset(path: &Path) -> MoodResult<Vec<Sample>> {
    read_json_file(path)
}

pub fn load_quotes(path: &Path) -> MoodResult<Vec<MotivationResponse>> {
    read_json_file(path)
}

/// Character-level similarity in `[0, 1]`, case and surrounding whitespace
/// ignored.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    similar::TextDiff::from_chars(a.as_str(), b.as_str()).ratio() as f64
}

pub fn auto_judge(expected: &MotivationResponse, actual: &MotivationResponse) -> Scores {
    let mood_score = similarity(&expected.mood, &actual.mood);
    let quote_score = similarity(&expected.quote, &actual.quote);
    let author_score = similarity(&expected.author, &actual.author);
    let action_score = similarity(&expected.suggested_action, &actual.suggested_action);

    Scores {
        mood_score,
        quote_score,
        author_score,
        action_score,
        overall_score: MOOD_WEIGHT * mood_score
            + QUOTE_WEIGHT * quote_score
            + AUTHOR_WEIGHT * author_score
            + ACTION_WEIGHT * action_score,
    }
}

/// Answers from a fixed quotes list, imitating how sampling settings change
/// a real model's output.
///
/// `top_k` caps the candidate pool and `temperature > 0` picks randomly
/// within it; otherwise the first candidate wins.
pub struct MockModel {
    quotes: Vec<MotivationResponse>,
    rng: Mutex<fastrand::Rng>,
}

impl MockModel {
    pub fn new(quotes: Vec<MotivationResponse>) -> Self {
        Self {
            quotes,
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_seed(quotes: Vec<MotivationResponse>, seed: u64) -> Self {
        Self {
            quotes,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    pub fn pick(&self, user_input: &str, temperature: f32, top_k: Option<u32>) -> MotivationResponse {
        let input = user_input.to_lowercase();
        let matches: Vec<&MotivationResponse> = self
            .quotes
            .iter()
            .filter(|q| input.contains(&q.mood.to_lowercase()))
            .collect();

        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let pool: Vec<&MotivationResponse> = match top_k {
            Some(k) if k > 0 => {
                let k = k as usize;
                if matches.is_empty() {
                    let mut all: Vec<&MotivationResponse> = self.quotes.iter().collect();
                    rng.shuffle(&mut all);
                    all.truncate(k);
                    all
                } else if matches.len() <= k {
                    matches
                } else {
                    let mut sampled = matches;
                    rng.shuffle(&mut sampled);
                    sampled.truncate(k);
                    sampled
                }
            }
            _ if matches.is_empty() => self.quotes.iter().collect(),
            _ => matches,
        };

        let chosen = if pool.is_empty() {
            None
        } else if temperature <= 0.0 {
            pool.first().copied()
        } else {
            pool.get(rng.usize(..pool.len())).copied()
        };

        chosen
            .cloned()
            .unwrap_or_else(|| MotivationResponse::fallback(user_input))
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(&self, prompt: &str, settings: &GenerationSettings) -> MoodResult<Completion> {
        let user_input = mood_from_prompt(prompt).unwrap_or_else(|| prompt.to_string());
        let reply = self.pick(&user_input, settings.temperature, settings.top_k);
        Ok(Completion {
            text: reply.to_json(),
            usage: None,
        })
    }

    fn name(&self) -> String {
        "mock".to_string()
    }
}

/// Score every sample in `dataset` using `agent`.
///
/// A sample whose reply cannot be obtained scores zero and carries the
/// error; transport failures are not fatal to the run.
pub async fn run_evaluation<M: GenerativeModel>(
    dataset: &[Sample],
    agent: &MoodAgent<M>,
) -> MoodResult<EvaluationReport> {
    if dataset.is_empty() {
        return Err(MoodError::Dataset("dataset has no samples".to_string()));
    }

    let settings = agent.settings().clone();
    tracing::info!(
        temperature = settings.temperature,
        top_k = ?settings.top_k,
        samples = dataset.len(),
        "running evaluation"
    );

    let mut results = Vec::with_capacity(dataset.len());
    let mut total_latency = 0.0;

    for sample in dataset {
        let start = Instant::now();
        let outcome = agent.respond(&sample.input).await;
        let latency_s = start.elapsed().as_secs_f64();
        total_latency += latency_s;

        let (actual, error, scores) = match outcome {
            Ok(interaction) => {
                let scores = auto_judge(&sample.expected, &interaction.response);
                (Some(interaction.response), None, scores)
            }
            Err(e) => {
                tracing::warn!(input = %sample.input, error = %e, "sample failed");
                (None, Some(e.to_string()), Scores::default())
            }
        };

        tracing::info!(
            id = ?sample.id,
            overall = scores.overall_score,
            latency_s,
            "sample scored"
        );

        results.push(SampleResult {
            id: sample.id.clone(),
            input: sample.input.clone(),
            expected: sample.expected.clone(),
            actual,
            error,
            scores,
            latency_s,
            temperature: settings.temperature,
            top_k: settings.top_k,
        });
    }

    let count = results.len() as f64;
    let summary = Summary {
        average_overall_score: results.iter().map(|r| r.scores.overall_score).sum::<f64>() / count,
        average_latency_s: total_latency / count,
        num_samples: results.len(),
        num_failed: results.iter().filter(|r| r.error.is_some()).count(),
    };

    Ok(EvaluationReport { summary, results })
}

pub fn save_report(report: &EvaluationReport, path: &Path) -> MoodResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotes() -> Vec<MotivationResponse> {
        vec![
            MotivationResponse::new("anxious", "Breathe.", "A", "Breathe slowly."),
            MotivationResponse::new("anxious", "Let go.", "B", "Stretch."),
            MotivationResponse::new("tired", "Rest.", "C", "Nap."),
            MotivationResponse::new("happy", "Enjoy.", "D", "Smile."),
        ]
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("Hello", "  hello "), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        let partial = similarity("abcd", "abxy");
        assert!(partial > 0.4 && partial < 0.6, "got {}", partial);
    }

    #[test]
    fn test_auto_judge_weights() {
        let expected = MotivationResponse::new("sad", "q", "a", "s");
        let perfect = auto_judge(&expected, &expected);
        assert!((perfect.overall_score - 1.0).abs() < 1e-9);

        let only_quote = MotivationResponse::new("xxx", "q", "yyy", "zzz");
        let scores = auto_judge(&expected, &only_quote);
        assert!((scores.overall_score - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_mock_deterministic_at_zero_temperature() {
        let model = MockModel::with_seed(quotes(), 7);
        let reply = model.pick("I'm feeling anxious today", 0.0, None);
        assert_eq!(reply.quote, "Breathe.");
    }

    #[test]
    fn test_mock_without_match_uses_whole_db() {
        let model = MockModel::with_seed(quotes(), 7);
        let reply = model.pick("meh", 0.0, None);
        assert_eq!(reply.mood, "anxious");
    }

    #[test]
    fn test_mock_top_k_limits_pool() {
        let model = MockModel::with_seed(quotes(), 42);
        for _ in 0..20 {
            let reply = model.pick("so anxious", 1.0, Some(1));
            assert_eq!(reply.mood, "anxious");
        }
        for _ in 0..20 {
            let reply = model.pick("anxious", 1.0, Some(5));
            assert_eq!(reply.mood, "anxious");
        }
    }

    #[test]
    fn test_mock_empty_db_falls_back() {
        let model = MockModel::new(Vec::new());
        let reply = model.pick("lost", 0.5, Some(3));
        assert_eq!(reply, MotivationResponse::fallback("lost"));
    }
}
