//! Append-only JSON Lines file of saved quotes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{MoodError, MoodResult};
use crate::motivation::MotivationResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub saved_at: DateTime<Utc>,
    #[serde(flatten)]
    pub response: MotivationResponse,
}

#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, response: &MotivationResponse) -> MoodResult<JournalEntry> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let entry = JournalEntry {
            saved_at: Utc::now(),
            response: response.clone(),
        };

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;

        tracing::debug!(path = %self.path.display(), "saved quote");
        Ok(entry)
    }

    /// All entries in file order. A missing file reads as empty.
    pub fn read_all(&self) -> MoodResult<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    MoodError::Journal(format!(
                        "{} line {}: {}",
                        self.path.display(),
                        index + 1,
                        e
                    ))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample(mood: &str) -> MotivationResponse {
        MotivationResponse::new(mood, "Quote", "Author", "Action")
    }

    #[test]
    fn test_append_creates_dirs_and_appends() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::new(dir.path().join("a").join("b").join("quotes.jsonl"));

        journal.append(&sample("happy")).unwrap();
        journal.append(&sample("tired")).unwrap();

        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].response, sample("happy"));
        assert_eq!(entries[1].response.mood, "tired");
    }

    #[test]
    fn test_line_format_is_flat() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::new(dir.path().join("quotes.jsonl"));
        journal.append(&sample("calm")).unwrap();

        let content = fs::read_to_string(journal.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["mood"], "calm");
        assert!(value["saved_at"].is_string());
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::new(dir.path().join("none.jsonl"));
        assert!(journal.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_line_reports_line_number() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::new(dir.path().join("quotes.jsonl"));
        journal.append(&sample("ok")).unwrap();
        let mut file = OpenOptions::new().append(true).open(journal.path()).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not json").unwrap();

        let err = journal.read_all().unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
