//! Sommelier CLI - wine quality prediction server
//!
//! # Commands
//!
//! - `serve` - Start the web front-end
//! - `info` - Show version and feature order

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sommelier::{
    api::{create_router, AppState, DEMO_PREDICTION},
    config::{PipelineSource, ServerConfig},
    error::Result,
    features::FEATURE_NAMES,
    pipeline::ArtifactPipeline,
    train::{TrainCommand, TrainMode},
};
use tracing_subscriber::EnvFilter;

/// Sommelier - wine quality prediction server
///
/// Serves an input form, triggers model training, and predicts wine quality
/// from eleven physicochemical measurements.
#[derive(Parser)]
#[command(name = "sommelier")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web front-end
    ///
    /// Examples:
    ///   sommelier serve --demo
    ///   sommelier serve --model artifacts/model_trainer/model.json --port 8080
    ///   sommelier serve --train-mode background
    Serve(ServeArgs),
    /// Show version and feature order
    Info,
}

#[derive(Args)]
struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long, env = "SOMMELIER_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "SOMMELIER_PORT", default_value = "8080")]
    port: u16,

    /// Model artifact read on every prediction
    #[arg(short, long, env = "SOMMELIER_MODEL", default_value = ArtifactPipeline::DEFAULT_PATH)]
    model: PathBuf,

    /// Answer every prediction with a fixed demo value (ignores --model)
    #[arg(long)]
    demo: bool,

    /// Directory whose index.html / results.html / error.html replace the built-in pages
    #[arg(long, env = "SOMMELIER_TEMPLATES")]
    templates: Option<PathBuf>,

    /// Training executable
    #[arg(long, env = "SOMMELIER_TRAIN_PROGRAM", default_value = "python")]
    train_program: String,

    /// Training argument (repeatable)
    #[arg(long = "train-arg", default_value = "main.py", allow_hyphen_values = true)]
    train_args: Vec<String>,

    /// Wait for training inside the request, or queue it
    #[arg(long, value_enum, env = "SOMMELIER_TRAIN_MODE", default_value_t = TrainMode::Blocking)]
    train_mode: TrainMode,
}

impl ServeArgs {
    fn into_config(self) -> ServerConfig {
        let pipeline = if self.demo {
            PipelineSource::Demo(DEMO_PREDICTION)
        } else {
            PipelineSource::Artifact(self.model)
        };
        ServerConfig {
            host: self.host,
            port: self.port,
            pipeline,
            templates_dir: self.templates,
            train_command: TrainCommand::new(self.train_program, self.train_args),
            train_mode: self.train_mode,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args.into_config()).await?,
        Commands::Info => {
            println!("Sommelier v{}", sommelier::VERSION);
            println!("Wine quality prediction server");
            println!();
            println!("Feature order:");
            for (i, name) in FEATURE_NAMES.iter().enumerate() {
                println!("  {i:>2} {name}");
            }
        },
    }

    Ok(())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sommelier=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.socket_addr()?;
    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        pipeline = ?config.pipeline,
        train_command = %config.train_command,
        train_mode = ?config.train_mode,
        "server listening"
    );

    println!("Server listening on http://{addr}");
    println!();
    println!("Endpoints:");
    println!("  GET  /         - Input form");
    println!("  GET  /predict  - Input form");
    println!("  POST /predict  - Predict wine quality");
    println!("  GET  /train    - Run training ({})", config.train_command);
    println!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
