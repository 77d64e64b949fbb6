//! CLI binary for lodestar.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lodestar::llm::OpenAiConfig;
use lodestar::planner::Planner;
use lodestar::{
    Depth, OpenAiCompatibleClient, ProgressEvent, ResearchConfig, ResearchPipeline, Stage,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Lodestar: automated, citation-backed web research.
#[derive(Parser)]
#[command(name = "lodestar", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Research a topic and write a report.
    Research {
        /// The topic to research.
        topic: String,

        /// beginner, intermediate or expert.
        #[arg(short, long)]
        depth: Option<Depth>,

        /// Directory reports are written to.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report instead of saving it.
        #[arg(long)]
        no_save: bool,
    },

    /// Show the sub-questions a topic would be split into.
    Plan {
        topic: String,

        #[arg(short, long)]
        depth: Option<Depth>,
    },

    /// Write a default configuration file.
    InitConfig {
        /// Destination; defaults to the standard config location.
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lodestar=info,lodestar_search=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Research {
            topic,
            depth,
            output,
            no_save,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_research(config, &topic, depth, output, no_save).await
        }
        Command::Plan { topic, depth } => {
            let config = load_config(cli.config.as_deref())?;
            run_plan(config, &topic, depth).await
        }
        Command::InitConfig { path } => init_config(path.or(cli.config)),
    }
}

/// Explicit path, else the default location if it exists, else defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<ResearchConfig> {
    let config = match path {
        Some(path) => ResearchConfig::from_file(path)?,
        None => {
            let default_path = ResearchConfig::default_config_path();
            if default_path.exists() {
                info!(path = %default_path.display(), "loading config");
                ResearchConfig::from_file(&default_path)?
            } else {
                ResearchConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

async fn run_research(
    mut config: ResearchConfig,
    topic: &str,
    depth: Option<Depth>,
    output: Option<PathBuf>,
    no_save: bool,
) -> anyhow::Result<()> {
    let depth = depth.unwrap_or(config.depth);
    if let Some(dir) = output {
        config.output.directory = dir;
    }

    println!("Lodestar v{}", env!("CARGO_PKG_VERSION"));
    println!("Researching \"{topic}\" at {depth} depth\n");

    let output_dir = (!no_save).then(|| config.output.directory.clone());
    let pipeline = ResearchPipeline::from_config(&config)?
        .with_output_dir(output_dir)
        .with_progress(Box::new(print_progress));

    let outcome = pipeline.run(topic, depth).await;

    for failure in &outcome.failures {
        eprintln!("warning: {} stage failed: {}", failure.stage, failure.message);
    }
    println!(
        "\n{} sub-questions, {} sources, {} citations",
        outcome.summary.sub_questions,
        outcome.summary.sources_collected,
        outcome.report.metadata.citation_count
    );

    match &outcome.saved {
        Some(saved) => {
            println!("Report saved to {}", saved.markdown.display());
            if let Some(json) = &saved.json {
                println!("JSON saved to {}", json.display());
            }
        }
        None => println!("\n{}", outcome.report.markdown),
    }
    Ok(())
}

fn print_progress(event: ProgressEvent) {
    match event {
        ProgressEvent::StageStarted { stage } => eprintln!("[{}] started", stage_label(stage)),
        ProgressEvent::QuestionsPlanned { questions } => {
            for (i, question) in questions.iter().enumerate() {
                eprintln!("  {}. {question}", i + 1);
            }
        }
        ProgressEvent::SourcesGathered {
            sources,
            empty_questions,
        } => eprintln!("  {sources} sources gathered ({empty_questions} questions without sources)"),
        ProgressEvent::StageCompleted {
            stage,
            duration_secs,
        } => eprintln!("[{}] done in {duration_secs:.1}s", stage_label(stage)),
        ProgressEvent::StageFailed { stage, message } => {
            eprintln!("[{}] failed: {message}", stage_label(stage));
        }
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Plan => "planning",
        Stage::Retrieve => "retrieval",
        Stage::Analyze => "analysis",
        Stage::Write => "report",
    }
}

async fn run_plan(config: ResearchConfig, topic: &str, depth: Option<Depth>) -> anyhow::Result<()> {
    let depth = depth.unwrap_or(config.depth);
    let client = OpenAiCompatibleClient::new(OpenAiConfig::from_llm_config(&config.llm)?)?;
    let planner = Planner::new(Arc::new(client), config.llm.completion_options());

    for (i, question) in planner.decompose(topic, depth).await.iter().enumerate() {
        println!("{}. {question}", i + 1);
    }
    Ok(())
}

fn init_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(ResearchConfig::default_config_path);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    ResearchConfig::default().save_to_file(&path)?;
    println!("Wrote default configuration to {}", path.display());
    println!(
        "API keys are read from {} and {}",
        lodestar::config::LLM_API_KEY_ENV,
        lodestar::config::SEARCH_API_KEY_ENV
    );
    Ok(())
}
