use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::embeddings::SearchHit;
use crate::evaluate::EvaluationReport;
use crate::motivation::MotivationResponse;
use crate::tokens::TokenReport;

pub struct OutputHandler {
    debug: bool,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self { debug: false }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn print_banner(&self) -> io::Result<()> {
        println!("{}", style("╔═══════════════════════════════════════╗").cyan().bold());
        println!("{}", style("║      MOOD QUOTE - daily motivation    ║").cyan().bold());
        println!("{}", style("╚═══════════════════════════════════════╝").cyan().bold());
        Ok(())
    }

    /// Spinner shown while waiting on the model. Hidden when stderr is not a
    /// terminal.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    pub fn print_quote(&self, response: &MotivationResponse) -> io::Result<()> {
        println!();
        println!("{} {}", style("Mood:").cyan().bold(), style(&response.mood).yellow());
        println!("  {}", style(format!("\u{201c}{}\u{201d}", response.quote)).white().bold());
        println!("  {}", style(format!("- {}", response.author)).dim());
        println!(
            "{} {}",
            style("Try this:").green().bold(),
            response.suggested_action
        );
        println!();
        println!("{}", style(response.to_json_pretty()).dim());
        Ok(())
    }

    pub fn print_json(&self, response: &MotivationResponse) -> io::Result<()> {
        println!("{}", response.to_json());
        Ok(())
    }

    pub fn print_token_usage(&self, report: &TokenReport, attempts: u32) -> io::Result<()> {
        let mut line = format!("Token usage: {}", report);
        if attempts > 1 {
            line.push_str(&format!(" after {} attempts", attempts));
        }
        println!("{}", style(line).dim());
        Ok(())
    }

    pub fn print_saved(&self, path: &Path) -> io::Result<()> {
        println!("{} {}", style("Saved to").green(), path.display());
        Ok(())
    }

    pub fn print_debug(&self, label: &str, content: &str) -> io::Result<()> {
        if self.debug {
            eprintln!("{}", style(format!("── {} ──", label)).magenta().bold());
            eprintln!("{}", style(content).dim());
        }
        Ok(())
    }

    pub fn print_error(&self, content: &str) -> io::Result<()> {
        eprintln!("{} {}", style("Error:").red().bold(), content);
        Ok(())
    }

    pub fn print_system(&self, content: &str) -> io::Result<()> {
        println!("{}", style(content).yellow().dim());
        Ok(())
    }

    pub fn print_evaluation(&self, report: &EvaluationReport) -> io::Result<()> {
        for result in &report.results {
            let id = result
                .id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            let score = format!("{:.3}", result.scores.overall_score);
            let score = if result.error.is_some() {
                style(score).red()
            } else if result.scores.overall_score >= 0.75 {
                style(score).green()
            } else {
                style(score).yellow()
            };
            println!(
                "  sample {} overall_score={} time={:.3}s",
                style(id).cyan(),
                score,
                result.latency_s
            );
            if let Some(error) = &result.error {
                println!("    {}", style(error).red().dim());
            }
        }

        let summary = &report.summary;
        println!();
        println!("{}", style("=== EVALUATION SUMMARY ===").cyan().bold());
        println!("Samples: {}", summary.num_samples);
        if summary.num_failed > 0 {
            println!("Failed: {}", style(summary.num_failed).red());
        }
        println!("Average overall score: {:.3}", summary.average_overall_score);
        println!("Average latency (s): {:.3}", summary.average_latency_s);
        Ok(())
    }

    pub fn print_search_hits(&self, hits: &[(SearchHit, &str)]) -> io::Result<()> {
        if hits.is_empty() {
            println!("{}", style("No stored embeddings to search").dim());
            return Ok(());
        }
        for (rank, (hit, text)) in hits.iter().enumerate() {
            println!(
                "{} {} {}",
                style(format!("{}.", rank + 1)).cyan().bold(),
                style(format!("[{:.3}]", hit.score)).dim(),
                text
            );
        }
        Ok(())
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
