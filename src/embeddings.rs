//! Quote embeddings
//!
//! Sends quote texts to a provider's embeddings endpoint, stores the vectors
//! as JSON Lines and offers cosine-similarity lookups over a stored file.
//! Provider response shapes differ, so parsing tries the common layouts
//! before searching the body for anything that looks like a vector.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::{MoodError, MoodResult};

const MAX_ERROR_BODY: usize = 1000;

pub type Embedding = Vec<f32>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedText {
    pub text: String,
    pub embedding: Embedding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub index: usize,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl EmbeddingClient {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> MoodResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("mood-quote/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    pub async fn embed(&self, texts: &[String]) -> MoodResult<Vec<Embedding>> {
        let mut request = self.client.post(&self.api_url).json(&json!({ "input": texts }));
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MoodError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let embeddings = parse_embeddings(&body)?;
        tracing::info!(count = embeddings.len(), "received embeddings");
        Ok(embeddings)
    }
}

/// Pull embedding vectors out of a provider response.
pub fn parse_embeddings(body: &Value) -> MoodResult<Vec<Embedding>> {
    // {"embeddings": [{"embedding": [...]}, [...], ...]}
    if let Some(items) = body.get("embeddings").and_then(Value::as_array) {
        let parsed: Option<Vec<Embedding>> = items
            .iter()
            .map(|item| item.get("embedding").unwrap_or(item))
            .map(as_vector)
            .collect();
        if let Some(embeddings) = parsed {
            return Ok(embeddings);
        }
    }

    // OpenAI: {"data": [{"embedding": [...]}, ...]}
    if let Some(items) = body.get("data").and_then(Value::as_array) {
        let parsed: Vec<Embedding> = items
            .iter()
            .filter_map(|item| item.get("embedding").and_then(as_vector))
            .collect();
        if !parsed.is_empty() {
            return Ok(parsed);
        }
    }

    if body.is_object() {
        if let Some(found) = find_vectors(body) {
            return Ok(found);
        }
    }

    let mut raw = body.to_string();
    if raw.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !raw.is_char_boundary(cut) {
            cut -= 1;
        }
        raw.truncate(cut);
    }
    Err(MoodError::InvalidEmbeddings(raw))
}

fn as_vector(value: &Value) -> Option<Embedding> {
    value
        .as_array()?
        .iter()
        .map(|n| n.as_f64().map(|f| f as f32))
        .collect()
}

/// Depth-first search for the first list of numbers (one vector) or list of
/// number lists (several vectors).
fn find_vectors(value: &Value) -> Option<Vec<Embedding>> {
    match value {
        Value::Array(items) if !items.is_empty() => {
            if let Some(vector) = as_vector(value) {
                return Some(vec![vector]);
            }
            if items.iter().all(Value::is_array) {
                let vectors: Option<Vec<Embedding>> = items.iter().map(as_vector).collect();
                if let Some(vectors) = vectors {
                    return Some(vectors);
                }
            }
            items.iter().find_map(find_vectors)
        }
        Value::Object(map) => map.values().find_map(find_vectors),
        _ => None,
    }
}

/// Texts to embed from a quotes JSON document: the `quote` of each object,
/// strings as they are, anything else stringified.
pub fn quote_texts(quotes: &Value) -> MoodResult<Vec<String>> {
    let items = quotes
        .as_array()
        .ok_or_else(|| MoodError::Dataset("quotes file must hold a JSON array".to_string()))?;

    Ok(items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("quote") {
                Some(Value::String(s)) => s.clone(),
                _ => item.to_string(),
            },
            other => other.to_string(),
        })
        .collect())
}

pub fn save_jsonl(texts: &[String], embeddings: &[Embedding], path: &Path) -> MoodResult<usize> {
    if texts.len() != embeddings.len() {
        return Err(MoodError::InvalidEmbeddings(format!(
            "got {} embeddings for {} texts",
            embeddings.len(),
            texts.len()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for (text, embedding) in texts.iter().zip(embeddings) {
        let record = json!({ "text": text, "embedding": embedding });
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    tracing::info!(count = texts.len(), path = %path.display(), "saved embeddings");
    Ok(texts.len())
}

pub fn load_jsonl(path: &Path) -> MoodResult<Vec<EmbeddedText>> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(MoodError::from))
        .collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// The `k` entries most similar to `query`, best first.
pub fn top_k(query: &[f32], entries: &[Embedding], k: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = entries
        .iter()
        .enumerate()
        .map(|(index, embedding)| SearchHit {
            index,
            score: cosine_similarity(query, embedding),
        })
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(k);
    hits
}
