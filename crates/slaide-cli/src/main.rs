use std::path::PathBuf;

use clap::{Parser, Subcommand};
use slaide_config::SlaideConfig;
use slaide_core::ArtifactKind;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "slaide", version, about = "slaide - artifact gateway for the Host agent")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Strip stray code fences from an HTML file
    Sanitize {
        /// HTML file to clean
        file: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Wait for a file to stop changing (exit code 0 if stable, 1 on timeout)
    Wait {
        /// File to watch
        path: PathBuf,
        /// html or pdf (inferred from the extension if omitted)
        #[arg(short, long)]
        kind: Option<ArtifactKind>,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Ask the Host for an artifact and print its descriptor
    Generate {
        /// Prompt to send
        prompt: String,
    },
    /// Show effective configuration
    Config,
}

fn find_config() -> Option<PathBuf> {
    // 1. SLAIDE_CONFIG environment variable
    if let Ok(path) = std::env::var("SLAIDE_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. slaide.yaml in current directory
    let cwd_config = PathBuf::from("slaide.yaml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. ~/.config/slaide/config.yaml
    if let Some(home) = dirs_next::home_dir() {
        let home_config = home.join(".config/slaide/config.yaml");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    // No file means defaults plus environment overrides.
    let config_path = cli.config.or_else(find_config);
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "loading configuration");
    }
    let config = SlaideConfig::load(config_path.as_deref())?;

    match cli.command {
        Commands::Serve { bind, port } => {
            commands::serve::run(config, bind, port).await?;
        }
        Commands::Sanitize { file, output } => {
            commands::sanitize::run(&file, output.as_deref())?;
        }
        Commands::Wait {
            path,
            kind,
            timeout_ms,
            interval_ms,
        } => {
            commands::wait::run(config.stability, &path, kind, timeout_ms, interval_ms).await?;
        }
        Commands::Generate { prompt } => {
            commands::generate::run(&config, &prompt).await?;
        }
        Commands::Config => {
            commands::config::run(&config)?;
        }
    }

    Ok(())
}
