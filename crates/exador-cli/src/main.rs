//! exador CLI: terminal quizzes, question import, and dashboards.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use exador_core::model::Continent;

mod commands;

#[derive(Parser)]
#[command(name = "exador", version, about = "Exador Math quiz engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and sample question CSV
    Init,

    /// Check a question CSV without importing it
    Validate {
        /// Path to the question CSV
        #[arg(long)]
        csv: PathBuf,
    },

    /// Validate and load a question CSV into the backend
    Import {
        /// Path to the question CSV
        #[arg(long)]
        csv: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the chapters of a continent
    Chapters {
        /// Continent id (arithmia, algebria, geometria, analysia, probabilia)
        #[arg(long)]
        continent: Continent,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Play a chapter quiz in the terminal
    Play {
        /// Chapter id
        #[arg(long)]
        chapter: Uuid,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the signed-in student's progress
    Dashboard {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the coach overview of all students
    Coach {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "exador=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { csv } => commands::validate::execute(csv),
        Commands::Import { csv, config } => commands::import::execute(csv, config).await,
        Commands::Chapters { continent, config } => {
            commands::chapters::execute(continent, config).await
        }
        Commands::Play { chapter, config } => commands::play::execute(chapter, config).await,
        Commands::Dashboard { config } => commands::dashboard::execute(config).await,
        Commands::Coach { config } => commands::coach::execute(config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
