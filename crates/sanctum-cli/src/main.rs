//! sanctum CLI: generate flashcard decks and grade answers against them.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "sanctum",
    version,
    about = "LLM-generated flashcard decks with semantic answer grading"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a flashcard deck about a topic
    Generate {
        /// Study topic
        #[arg(long)]
        prompt: String,

        /// Number of cards at which generation stops
        #[arg(long)]
        target: Option<usize>,

        /// Maximum generation rounds, seeding included
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Output format: text, sse, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Directory to save the finished deck in
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Grade an answer against a stored card
    Grade {
        /// Card id
        #[arg(long)]
        id: String,

        /// Answer to grade
        #[arg(long)]
        answer: String,

        /// Report only the numeric score
        #[arg(long)]
        no_letter: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Store a single card
    AddCard {
        /// Question text
        #[arg(long)]
        pattern: String,

        /// Answer text
        #[arg(long)]
        answer: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Remove a stored card
    RemoveCard {
        /// Card id
        #[arg(long)]
        id: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Suggest a more detailed version of a study topic
    Suggest {
        /// Study topic
        #[arg(long)]
        prompt: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show vector index statistics
    Stats {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print a saved deck
    Show {
        /// Deck JSON file
        #[arg(long)]
        deck: PathBuf,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sanctum=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            prompt,
            target,
            max_rounds,
            format,
            output,
            config,
        } => commands::generate::execute(prompt, target, max_rounds, format, output, config).await,
        Commands::Grade {
            id,
            answer,
            no_letter,
            format,
            config,
        } => commands::grade::execute(id, answer, no_letter, format, config).await,
        Commands::AddCard {
            pattern,
            answer,
            config,
        } => commands::cards::add(pattern, answer, config).await,
        Commands::RemoveCard { id, config } => commands::cards::remove(id, config).await,
        Commands::Suggest { prompt, config } => commands::suggest::execute(prompt, config).await,
        Commands::Stats { config } => commands::stats::execute(config).await,
        Commands::Show { deck } => commands::show::execute(deck),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
