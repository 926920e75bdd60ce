use clap::{Parser, Subcommand};
use docqa::Result;
use docqa::commands::{ask_question, ingest_document, init_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Question answering over your PDFs with grounded LLM answers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or initialize the configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
    /// Ingest a PDF document into the vector index
    Ingest {
        /// Path to the PDF file
        file: PathBuf,
        /// Display name for citations; defaults to the file name
        #[arg(long)]
        source: Option<String>,
    },
    /// Ask a question answered from the ingested documents
    Ask {
        /// The question to answer
        question: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { init } => {
            if init {
                init_config()?;
            } else {
                show_config()?;
            }
        }
        Commands::Ingest { file, source } => {
            ingest_document(&file, source.as_deref())?;
        }
        Commands::Ask { question } => {
            ask_question(&question)?;
        }
    }

    Ok(())
}
