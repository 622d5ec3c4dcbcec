//! Offline evaluation through the full agent pipeline

use mood_quote::agent::MoodAgent;
use mood_quote::config::GenerationSettings;
use mood_quote::evaluate::{self, MockModel};
use mood_quote::prompt::{PromptBuilder, ShotMode};
use mood_quote::{MotivationResponse, MoodError};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn write_fixtures(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let quotes = json!([
        {
            "mood": "anxious",
            "quote": "You don't have to control your thoughts. You just have to stop letting them control you.",
            "author": "Dan Millman",
            "suggested_action": "Try a 2-minute breathing exercise."
        },
        {
            "mood": "tired",
            "quote": "Rest is not idleness.",
            "author": "John Lubbock",
            "suggested_action": "Take a short nap."
        }
    ]);
    let dataset = json!([
        {
            "id": 1,
            "input": "I'm feeling anxious today",
            "expected": quotes[0].clone()
        },
        {
            "id": "tired-1",
            "input": "So tired after work",
            "expected": quotes[1].clone()
        }
    ]);

    let quotes_path = dir.path().join("quotes.json");
    let dataset_path = dir.path().join("evaluation_dataset.json");
    fs::write(&quotes_path, quotes.to_string()).unwrap();
    fs::write(&dataset_path, dataset.to_string()).unwrap();
    (dataset_path, quotes_path)
}

#[tokio::test]
async fn test_mock_evaluation_scores_perfectly_at_zero_temperature() {
    let dir = TempDir::new().unwrap();
    let (dataset_path, quotes_path) = write_fixtures(&dir);

    let dataset = evaluate::load_dataset(&dataset_path).unwrap();
    let model = MockModel::new(evaluate::load_quotes(&quotes_path).unwrap());
    let settings = GenerationSettings {
        temperature: 0.0,
        ..GenerationSettings::default()
    };
    let agent = MoodAgent::new(model, PromptBuilder::new(ShotMode::Multi), settings);

    let report = evaluate::run_evaluation(&dataset, &agent).await.unwrap();
    assert_eq!(report.summary.num_samples, 2);
    assert_eq!(report.summary.num_failed, 0);
    assert!((report.summary.average_overall_score - 1.0).abs() < 1e-9);
    assert_eq!(report.results[1].id, Some(json!("tired-1")));
    assert_eq!(report.results[0].temperature, 0.0);

    let out = dir.path().join("reports").join("report.json");
    evaluate::save_report(&report, &out).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(saved["summary"]["num_samples"], 2);
    assert!(saved["results"][0]["scores"]["overall_score"].is_number());
}

#[tokio::test]
async fn test_multiline_input_matches_its_own_mood() {
    let model = MockModel::new(vec![
        MotivationResponse::new("anxious", "Breathe.", "Someone", "Slow down."),
        MotivationResponse::new("sad", "This too shall pass.", "Persian adage", "Call a friend."),
    ]);
    let settings = GenerationSettings {
        temperature: 0.0,
        ..GenerationSettings::default()
    };
    let agent = MoodAgent::new(model, PromptBuilder::new(ShotMode::Multi), settings);

    let interaction = agent.respond("feeling sad\nafter work").await.unwrap();
    assert_eq!(interaction.response.mood, "sad");
}

#[tokio::test]
async fn test_empty_dataset_is_error() {
    let model = MockModel::new(Vec::new());
    let agent = MoodAgent::new(model, PromptBuilder::default(), GenerationSettings::default());
    let err = evaluate::run_evaluation(&[], &agent).await.unwrap_err();
    assert!(matches!(err, MoodError::Dataset(_)));
}

#[test]
fn test_bad_dataset_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("evaluation_dataset.json");
    fs::write(&path, "[{\"input\": 3}]").unwrap();
    assert!(matches!(evaluate::load_dataset(&path), Err(MoodError::Dataset(_))));
    assert!(matches!(
        evaluate::load_dataset(&dir.path().join("missing.json")),
        Err(MoodError::Dataset(_))
    ));
}
