//! rubricon CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rubricon", version, about = "Automated rubric-based grading")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a JSON file of question blocks
    Run {
        /// Path to the question blocks JSON file
        #[arg(long)]
        input: PathBuf,

        /// Optional JSON file of context documents (rubrics, ideal
        /// answers, graded exemplars) for retrieval backfill
        #[arg(long)]
        context: Option<PathBuf>,

        /// Max question blocks graded concurrently (overrides config)
        #[arg(long)]
        parallelism: Option<usize>,

        /// Output directory for the report (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Oracle model name (overrides config)
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a question blocks JSON file
    Validate {
        /// Path to the question blocks JSON file
        #[arg(long)]
        input: PathBuf,
    },

    /// Create starter config and example question blocks
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rubricon=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            context,
            parallelism,
            output,
            model,
            config,
        } => commands::run::execute(input, context, parallelism, output, model, config).await,
        Commands::Validate { input } => commands::validate::execute(input),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
