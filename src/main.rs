//! cscorpus CLI - code-switching corpus generation and annotation.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use cscorpus::models::{CsLevel, Language, RunStats};
use cscorpus::pipeline::{export_prompt_table, set_prompt, try_prompt};
use cscorpus::{
    AnnotationStore, BatchOutput, Config, DialogueBatch, LlmClient, ParameterSpace,
    PromptRenderer, ScriptBatch, ScriptRecord, Session,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "cscorpus")]
#[command(version)]
#[command(about = "English/Korean code-switching corpus generation and annotation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "cscorpus.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch generation driver
    Generate {
        #[command(subcommand)]
        kind: GenerateKind,
    },

    /// Inspect, export or try prompts
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },

    /// Work on one annotator's store
    Store {
        /// Worker name (store file is scripts_<worker>.json)
        worker: String,

        #[command(subcommand)]
        action: StoreAction,
    },

    /// List workers with an existing store
    StoreWorkers,

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

#[derive(Subcommand)]
enum GenerateKind {
    /// Code-switched scripts per (topic, level, language, model)
    Scripts {
        /// Output JSON file (defaults to output.scripts_path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Calls per model for each group
        #[arg(short, long)]
        samples: Option<usize>,

        /// Ignore any prior output instead of resuming
        #[arg(long)]
        fresh: bool,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },

    /// Monolingual dialogues per (topic, language pair, model)
    Dialogues {
        /// Output JSON file (defaults to output.dialogues_path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ignore any prior output instead of resuming
        #[arg(long)]
        fresh: bool,

        /// Hide progress bars
        #[arg(short, long)]
        quiet: bool,
    },
}

#[derive(Subcommand)]
enum PromptsAction {
    /// Write the topic → level → language → prompt table
    Export {
        /// Output JSON file (defaults to output.prompts_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print one rendered prompt
    Show {
        #[arg(short, long)]
        topic: String,

        #[arg(short, long)]
        level: CsLevel,

        /// Primary language (English or Korean)
        #[arg(short = 'L', long, default_value = "English")]
        language: Language,
    },

    /// Replace one entry of the prompt table, creating the file from defaults if needed
    #[command(group(ArgGroup::new("source").required(true).args(["text", "file"])))]
    Set {
        #[arg(short, long)]
        topic: String,

        #[arg(short, long)]
        level: CsLevel,

        /// Primary language (English or Korean)
        #[arg(short = 'L', long, default_value = "English")]
        language: Language,

        /// New prompt text
        #[arg(long)]
        text: Option<String>,

        /// Read the new prompt text from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Table to edit (defaults to generation.prompt_overrides, then output.prompts_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Send one rendered prompt to a model and print the reply
    Test {
        #[arg(short, long)]
        topic: String,

        #[arg(short, long)]
        level: CsLevel,

        /// Primary language (English or Korean)
        #[arg(short = 'L', long, default_value = "English")]
        language: Language,

        #[arg(short, long)]
        model: String,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Append a labeled script
    Add {
        /// Script text
        text: String,

        #[arg(short, long)]
        level: CsLevel,

        /// Primary language (English or Korean)
        #[arg(short, long)]
        main: Language,

        #[arg(short = 'k', long)]
        category: String,
    },

    /// Show scripts, newest first, with their positions
    List {
        /// Show at most this many
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Delete the script at a position shown by `list`
    Delete { position: usize },

    /// Per-category counts
    Counts,

    /// Replace the store with a JSON list of scripts
    Import { path: PathBuf },

    /// Write the store to a JSON file
    Export { path: PathBuf },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# cscorpus configuration file

[endpoint]
# API key (defaults to the LITELLM_API_KEY env var; ${VAR} is expanded)
# api_key = "${LITELLM_API_KEY}"
api_key_env = "LITELLM_API_KEY"
base_url = "http://localhost:4000"
timeout_secs = 180

[retry]
max_attempts = 3         # 1 disables retries
initial_backoff_ms = 1000
max_backoff_ms = 30000
multiplier = 2.0

[generation]
topics = ["Business", "Everyday Conversation", "Travel", "Academic"]
models = ["gpt-4o-mini", "gpt-4.1-nano", "gpt-4.1-mini", "claude-3.7-sonnet"]
temperature = 0.7
samples_per_model = 1
call_delay_ms = 1000
# prompt_overrides = "prompts.json"

[output]
scripts_path = "scripts/samples.json"
dialogues_path = "dialogues.json"
prompts_path = "prompts.json"

[annotation]
dir = "."
workers = []   # empty allows any name
categories = [
    "business", "everyday conversation", "language education", "entertainment",
    "slang/neologisms", "travel", "software development", "medical",
    "academic", "traditional culture",
]
"#;
    println!("{example}");
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_or_default(path)
        .with_context(|| format!("Failed to load config from {path:?}"))
}

fn renderer_for(config: &Config) -> Result<PromptRenderer> {
    match &config.generation.prompt_overrides {
        Some(path) => PromptRenderer::from_file(path)
            .with_context(|| format!("Failed to load prompt overrides from {path:?}")),
        None => Ok(PromptRenderer::new()),
    }
}

fn print_stats(title: &str, stats: &RunStats, output: &Path) {
    println!("\n=== {title} ===");
    println!("Tasks:       {}", stats.total_tasks);
    println!("Skipped:     {}", stats.skipped_tasks);
    println!("Calls:       {}", stats.calls);
    println!("Succeeded:   {}", stats.succeeded);
    println!("Failed:      {}", stats.failed);
    println!("Success:     {:.1}%", stats.success_rate * 100.0);
    println!("Records:     {}", stats.records_written);
    println!(
        "Tokens:      {} in / {} out",
        stats.prompt_tokens, stats.completion_tokens
    );
    println!("Runtime:     {:.1}s", stats.runtime_secs);
    println!("Output:      {output:?}");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
            return Ok(());
        }

        Commands::Validate => {
            let config = Config::from_file(&cli.config)
                .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

            config
                .resolve_api_key()
                .context("Failed to resolve API key")?;

            let space = ParameterSpace::from_config(&config.generation);
            info!("Configuration is valid");
            info!(
                "  Topics: {}, models: {}",
                space.topics().len(),
                space.models().len()
            );
            info!(
                "  Script tasks: {}, dialogue tasks: {}",
                space.script_task_count(),
                space.dialogue_task_count()
            );
            info!(
                "  Retry: {} attempts, {}ms initial backoff",
                config.retry.max_attempts, config.retry.initial_backoff_ms
            );
            return Ok(());
        }

        Commands::Generate { kind } => {
            let mut config = load_config(&cli.config)?;

            // Credential first: no network call or output file is touched without it
            let client = Arc::new(
                LlmClient::from_config(&config).context("Failed to create endpoint client")?,
            );
            let renderer = renderer_for(&config)?;

            match kind {
                GenerateKind::Scripts {
                    output,
                    samples,
                    fresh,
                    quiet,
                } => {
                    if let Some(samples) = samples {
                        config.generation.samples_per_model = samples;
                    }
                    let path = output.unwrap_or_else(|| config.output.scripts_path.clone());
                    let mut batch_output = if fresh {
                        BatchOutput::fresh(&path)
                    } else {
                        BatchOutput::resume(&path)?
                    };

                    let space = ParameterSpace::from_config(&config.generation);
                    let stats = ScriptBatch::new(client, renderer, space, &config.generation)
                        .with_progress(!quiet)
                        .run(&mut batch_output)
                        .await?;
                    print_stats("Script Generation Complete", &stats, &path);
                }

                GenerateKind::Dialogues {
                    output,
                    fresh,
                    quiet,
                } => {
                    let path = output.unwrap_or_else(|| config.output.dialogues_path.clone());
                    let mut batch_output = if fresh {
                        BatchOutput::fresh(&path)
                    } else {
                        BatchOutput::resume(&path)?
                    };

                    let space = ParameterSpace::from_config(&config.generation);
                    let stats = DialogueBatch::new(client, renderer, space, &config.generation)
                        .with_progress(!quiet)
                        .run(&mut batch_output)
                        .await?;
                    print_stats("Dialogue Generation Complete", &stats, &path);
                }
            }
        }

        Commands::Prompts { action } => {
            let config = load_config(&cli.config)?;
            // The table being edited may be the overrides file itself, so seed from built-ins
            let renderer = match &action {
                PromptsAction::Set { .. } => PromptRenderer::new(),
                _ => renderer_for(&config)?,
            };

            match action {
                PromptsAction::Export { output } => {
                    let path = output.unwrap_or_else(|| config.output.prompts_path.clone());
                    let space = ParameterSpace::from_config(&config.generation);
                    let count = export_prompt_table(&renderer, &space, &path)?;
                    println!("Wrote {count} prompts to {path:?}");
                }

                PromptsAction::Set {
                    topic,
                    level,
                    language,
                    text,
                    file,
                    output,
                } => {
                    let text = match (text, file) {
                        (Some(text), _) => text,
                        (None, Some(file)) => std::fs::read_to_string(&file)
                            .with_context(|| format!("Failed to read prompt from {file:?}"))?,
                        (None, None) => anyhow::bail!("either --text or --file is required"),
                    };
                    let path = output
                        .or_else(|| config.generation.prompt_overrides.clone())
                        .unwrap_or_else(|| config.output.prompts_path.clone());
                    let space = ParameterSpace::from_config(&config.generation);
                    set_prompt(&path, &renderer, &space, &topic, level, language, &text)?;
                    println!("Updated {topic} / {level} / {language} in {path:?}");
                }

                PromptsAction::Show {
                    topic,
                    level,
                    language,
                } => {
                    println!("{}", renderer.script_text(&topic, level, language));
                }

                PromptsAction::Test {
                    topic,
                    level,
                    language,
                    model,
                } => {
                    let client =
                        LlmClient::from_config(&config).context("Failed to create endpoint client")?;
                    let text = try_prompt(
                        &client,
                        &renderer,
                        &topic,
                        level,
                        language,
                        &model,
                        config.generation.temperature,
                    )
                    .await?;
                    println!("{text}");
                }
            }
        }

        Commands::StoreWorkers => {
            let config = load_config(&cli.config)?;
            for worker in AnnotationStore::list_workers(&config.annotation.dir)? {
                println!("{worker}");
            }
        }

        Commands::Store { worker, action } => {
            let config = load_config(&cli.config)?;
            let mut session = Session::new(&config.annotation.dir, config.annotation.workers.clone());
            let store = session.sign_in(&worker)?;

            match action {
                StoreAction::Add {
                    text,
                    level,
                    main,
                    category,
                } => {
                    let count = store.append(ScriptRecord::new(text, level, main, category))?;
                    println!("Saved. {} now has {count} scripts", store.worker());
                }

                StoreAction::List { limit } => {
                    let view = store.list();
                    let shown = limit.unwrap_or(view.len());
                    for (position, record) in view.into_iter().take(shown) {
                        println!(
                            "[{position}] {} | {} | {} | {}",
                            record.cs_level,
                            record.main_language,
                            record.category,
                            record.preview(80)
                        );
                    }
                    println!("{} scripts", store.len());
                }

                StoreAction::Delete { position } => {
                    let removed = store.delete_at(position)?;
                    println!("Deleted [{position}] {}", removed.preview(60));
                }

                StoreAction::Counts => {
                    let counts = store.category_counts(&config.annotation.categories);
                    for (label, n) in counts.iter() {
                        println!("{label:<24} {n}");
                    }
                    println!("{:<24} {}", "(unrecognized)", counts.unrecognized());
                    println!("{:<24} {}", "total", counts.total());
                }

                StoreAction::Import { path } => {
                    let count = store
                        .import_file(&path)
                        .with_context(|| format!("Import from {path:?} rejected"))?;
                    println!("Imported {count} scripts");
                }

                StoreAction::Export { path } => {
                    let count = store.export(&path)?;
                    println!("Exported {count} scripts to {path:?}");
                }
            }

            session.sign_out();
        }
    }

    Ok(())
}
