use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use mood_quote::agent::MoodAgent;
use mood_quote::api::ApiClient;
use mood_quote::config::Config;
use mood_quote::embeddings::{self, EmbeddingClient};
use mood_quote::evaluate::{self, MockModel};
use mood_quote::input_handler::{normalize_mood, read_mood, QuestionTarget};
use mood_quote::journal::Journal;
use mood_quote::output::OutputHandler;
use mood_quote::prompt::{PromptBuilder, ShotMode};
use mood_quote::GenerativeModel;

#[derive(Parser)]
#[command(name = "mood-quote", version)]
#[command(about = "Tell it how you feel, get a motivational quote as JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    quote: QuoteArgs,

    /// Config file (default: ~/.mood-quote/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run in verbose mode
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug mode (prints prompts and raw model replies)
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Args)]
struct QuoteArgs {
    /// Mood text; skips the interactive question
    #[arg(short, long)]
    mood: Option<String>,

    /// Prompting style: zero, one, multi or dynamic
    #[arg(long)]
    shot: Option<ShotMode>,

    #[command(flatten)]
    sampling: SamplingArgs,

    /// AI provider (gemini, openai, ollama or a custom endpoint)
    #[arg(long)]
    provider: Option<String>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    api_url: Option<String>,

    /// Append the quote to a JSON Lines file (default: ~/.mood-quote/quotes.jsonl)
    #[arg(long, num_args = 0..=1)]
    save: Option<Option<PathBuf>>,

    /// Print only the compact JSON response
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SamplingArgs {
    #[arg(long)]
    temperature: Option<f32>,

    /// Limit sampling to the K most likely tokens (or K candidate quotes offline)
    #[arg(long)]
    top_k: Option<u32>,

    #[arg(long)]
    top_p: Option<f32>,
}

#[derive(Subcommand)]
enum Command {
    /// Score replies against a labelled dataset
    Evaluate {
        #[arg(long, default_value = "evaluation_dataset.json")]
        dataset: PathBuf,

        /// Quotes database used by the offline model
        #[arg(long, default_value = "quotes.json")]
        quotes: PathBuf,

        #[command(flatten)]
        sampling: SamplingArgs,

        #[arg(long)]
        shot: Option<ShotMode>,

        /// Query the configured API instead of the offline model
        #[arg(long)]
        live: bool,

        /// Write the full report as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Embed every quote through a provider endpoint and store the vectors
    Embed {
        #[arg(long, default_value = "quotes.json")]
        quotes: PathBuf,

        /// Provider embeddings URL
        #[arg(long)]
        api_url: String,

        #[arg(long, env = "MOOD_QUOTE_EMBEDDINGS_KEY")]
        api_key: Option<String>,

        #[arg(long, default_value = "embeddings.jsonl")]
        out: PathBuf,
    },
    /// Find the stored quotes closest to a piece of text
    Search {
        #[arg(long, default_value = "embeddings.jsonl")]
        embeddings: PathBuf,

        #[arg(long)]
        text: String,

        #[arg(long)]
        api_url: String,

        #[arg(long, env = "MOOD_QUOTE_EMBEDDINGS_KEY")]
        api_key: Option<String>,

        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("MOOD_QUOTE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("mood_quote={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn apply_sampling(config: &mut Config, sampling: &SamplingArgs) {
    if let Some(temperature) = sampling.temperature {
        config.generation.temperature = temperature;
    }
    if sampling.top_k.is_some() {
        config.generation.top_k = sampling.top_k;
    }
    if sampling.top_p.is_some() {
        config.generation.top_p = sampling.top_p;
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set debug environment variable if debug flag is enabled
    if cli.debug {
        std::env::set_var("MOOD_QUOTE_DEBUG", "1");
    }
    init_tracing(cli.verbose);

    let debug = cli.debug || std::env::var("MOOD_QUOTE_DEBUG").is_ok_and(|v| v == "1");
    let output = OutputHandler::new().with_debug(debug);

    if let Err(err) = run(cli, &output).await {
        let _ = output.print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &OutputHandler) -> Result<()> {
    let mut config = Config::load_or_default(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        None => run_quote(cli.quote, config, output).await,
        Some(Command::Evaluate {
            dataset,
            quotes,
            sampling,
            shot,
            live,
            out,
        }) => {
            apply_sampling(&mut config, &sampling);
            let samples = evaluate::load_dataset(&dataset)?;
            let prompt_builder = PromptBuilder::new(shot.unwrap_or_default());
            output.print_system(&format!(
                "Running evaluation with temperature={} top_k={:?}",
                config.generation.temperature, config.generation.top_k
            ))?;

            let report = if live {
                let client = ApiClient::new(&config.ai)?;
                let agent = MoodAgent::new(client, prompt_builder, config.generation.clone());
                evaluate::run_evaluation(&samples, &agent).await?
            } else {
                let model = MockModel::new(evaluate::load_quotes(&quotes)?);
                let agent = MoodAgent::new(model, prompt_builder, config.generation.clone());
                evaluate::run_evaluation(&samples, &agent).await?
            };

            output.print_evaluation(&report)?;

            if let Some(path) = out {
                evaluate::save_report(&report, &path)?;
                output.print_saved(&path)?;
            }
            Ok(())
        }
        Some(Command::Embed {
            quotes,
            api_url,
            api_key,
            out,
        }) => {
            let content = std::fs::read_to_string(&quotes)
                .with_context(|| format!("Failed to read {}", quotes.display()))?;
            let value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", quotes.display()))?;
            let texts = embeddings::quote_texts(&value)?;

            output.print_system(&format!("Embedding {} quotes via {}", texts.len(), api_url))?;
            let client = EmbeddingClient::new(api_url, api_key)?;
            let spinner = output.spinner("Requesting embeddings...");
            let result = client.embed(&texts).await;
            spinner.finish_and_clear();

            let count = embeddings::save_jsonl(&texts, &result?, &out)?;
            output.print_system(&format!("Saved {} embeddings", count))?;
            output.print_saved(&out)?;
            Ok(())
        }
        Some(Command::Search {
            embeddings: path,
            text,
            api_url,
            api_key,
            top_k,
        }) => {
            let stored = embeddings::load_jsonl(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let client = EmbeddingClient::new(api_url, api_key)?;
            let query = client
                .embed(&[text])
                .await?
                .into_iter()
                .next()
                .context("Provider returned no embedding for the query")?;

            let vectors: Vec<_> = stored.iter().map(|e| e.embedding.clone()).collect();
            let hits: Vec<_> = embeddings::top_k(&query, &vectors, top_k)
                .into_iter()
                .map(|hit| {
                    let text = stored[hit.index].text.as_str();
                    (hit, text)
                })
                .collect();
            output.print_search_hits(&hits)?;
            Ok(())
        }
    }
}

async fn run_quote(args: QuoteArgs, mut config: Config, output: &OutputHandler) -> Result<()> {
    if let Some(provider) = args.provider {
        config.ai.provider = provider;
    }
    if let Some(model) = args.model {
        config.ai.model = model;
    }
    if let Some(api_url) = args.api_url {
        config.ai.api_url = api_url;
    }
    apply_sampling(&mut config, &args.sampling);

    let interactive = args.mood.is_none() && io::stdin().is_terminal();
    if interactive && !args.json {
        output.print_banner()?;
    }

    let mood = match args.mood {
        Some(text) => normalize_mood(&text)?,
        None => {
            let stdin = io::stdin();
            let mut question_out =
                QuestionTarget::for_session(args.json, stdin.is_terminal()).writer();
            read_mood(&mut stdin.lock(), &mut question_out)?
        }
    };

    let client = ApiClient::new(&config.ai)?;
    if config.ai.api_key.is_empty() {
        tracing::warn!(provider = %client.provider, "no API key configured");
    }

    let agent = MoodAgent::new(
        client,
        PromptBuilder::new(args.shot.unwrap_or_default()),
        config.generation.clone(),
    );
    output.print_debug("prompt", &agent.build_prompt(&mood))?;

    let spinner = output.spinner(&format!("Asking {}...", agent.model().name()));
    let result = agent.respond(&mood).await;
    spinner.finish_and_clear();
    let interaction = result?;

    output.print_debug("raw reply", &interaction.raw_text)?;

    if args.json {
        output.print_json(&interaction.response)?;
    } else {
        output.print_quote(&interaction.response)?;
        output.print_token_usage(&interaction.tokens, interaction.attempts)?;
    }

    if let Some(path) = config.save_target(args.save) {
        save_quote(&path, &interaction.response, output, args.json)?;
    }

    Ok(())
}

fn save_quote(
    path: &Path,
    response: &mood_quote::MotivationResponse,
    output: &OutputHandler,
    quiet: bool,
) -> Result<()> {
    Journal::new(path)
        .append(response)
        .with_context(|| format!("Failed to save quote to {}", path.display()))?;
    if !quiet {
        output.print_saved(path)?;
    }
    Ok(())
}
