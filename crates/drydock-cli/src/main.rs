mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::Overrides;

#[derive(Parser)]
#[command(
    name = "drydock",
    about = "Build a docker image, ship it to a drydock server, and deploy it"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, upload and deploy a service
    Deploy {
        /// Deployment file (docker stack file)
        #[arg(long, short = 'f')]
        file: PathBuf,
        /// Service name on the server
        service: String,
        /// Server base URL (overrides [remote].url)
        #[arg(long, env = "DRYDOCK_SERVER")]
        server: Option<String>,
        /// Docker build context (overrides [build].context)
        #[arg(long)]
        context: Option<PathBuf>,
        /// Service entry whose image to build (default: first entry with an image)
        #[arg(long)]
        entry: Option<String>,
        /// Path to drydock.toml (defaults to ./drydock.toml if present)
        #[arg(long, env = "DRYDOCK_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print the fingerprint of a deployment file
    Hash {
        /// Deployment file
        #[arg(long, short = 'f')]
        file: PathBuf,
    },
    /// Compare a deployment file with the one stored on the server
    Status {
        /// Deployment file
        #[arg(long, short = 'f')]
        file: PathBuf,
        /// Service name on the server
        service: String,
        /// Server base URL (overrides [remote].url)
        #[arg(long, env = "DRYDOCK_SERVER")]
        server: Option<String>,
        /// Path to drydock.toml (defaults to ./drydock.toml if present)
        #[arg(long, env = "DRYDOCK_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy {
            file,
            service,
            server,
            context,
            entry,
            config,
        } => {
            let overrides = Overrides {
                config,
                server,
                context,
            };
            commands::deploy(&file, &service, entry.as_deref(), &overrides).await?
        }
        Commands::Hash { file } => commands::hash(&file).await?,
        Commands::Status {
            file,
            service,
            server,
            config,
        } => {
            let overrides = Overrides {
                config,
                server,
                context: None,
            };
            commands::status(&file, &service, &overrides).await?
        }
    }

    Ok(())
}
