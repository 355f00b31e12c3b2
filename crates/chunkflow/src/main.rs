use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use chunkflow_common::{logger, AppConfig};
use chunkflow_pipeline::{
    ChatPipeline, EmbeddingsPipeline, HttpModelClient, ProcessingOptions, PromptSet,
};

#[derive(Parser)]
#[command(name = "chunkflow")]
#[command(about = "Chunkflow - token-budgeted chunked processing against chat/embedding APIs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a long text through the chat pipeline
    Chat {
        /// File containing the context text (reads stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Initial prompt for the first chunk
        #[arg(long)]
        initial: String,

        /// Follow-up template with a {last_chunk_end} placeholder
        #[arg(long)]
        follow_up: Option<String>,

        /// Carry the tail of the previous response into follow-up prompts
        #[arg(long)]
        include_last_chunk: bool,

        /// Trailing tokens carried over between chunks
        #[arg(long, default_value_t = 50)]
        last_chunk_tokens: u32,
    },
    /// Generate embeddings, one message per input line
    Embed {
        /// File with one message per line (reads stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Maximum concurrent requests
        #[arg(long, default_value_t = 4)]
        max_in_flight: usize,
    },
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            use std::io::Read;
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    logger::setup_console_logging(&config.log_level);

    tracing::info!("Chunkflow starting...");
    tracing::info!("  Endpoint: {}", config.endpoint);
    tracing::info!("  Model: {}", config.model_name);

    let client = Arc::new(HttpModelClient::new(
        config.connection(),
        config.model_name.clone(),
    )?);

    match cli.command {
        Commands::Chat {
            file,
            initial,
            follow_up,
            include_last_chunk,
            last_chunk_tokens,
        } => {
            let context = read_input(file.as_ref())?;

            let mut prompts = PromptSet::new(initial);
            if let Some(template) = follow_up {
                prompts = prompts.with_follow_up(template);
            }
            let options = ProcessingOptions {
                include_last_chunk,
                last_chunk_token_count: last_chunk_tokens,
                ..Default::default()
            };

            let pipeline = ChatPipeline::new(client, config.model_settings())?;
            let outcome = pipeline.process(&context, &prompts, &options).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Embed { file, max_in_flight } => {
            let input = read_input(file.as_ref())?;
            let messages: Vec<String> = input
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();

            let options = ProcessingOptions {
                max_in_flight,
                ..Default::default()
            };

            // Embeddings never reserve response tokens
            let mut settings = config.model_settings();
            settings.response_ratio = None;

            let pipeline = EmbeddingsPipeline::new(client, settings)?;
            let outcome = pipeline.process(&messages, &options).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
