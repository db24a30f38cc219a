//! Taskhub server binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskhub::adapters::sqlite::{create_pool, Migrator};
use taskhub::domain::models::Config;
use taskhub::infrastructure::config::ConfigLoader;
use taskhub::infrastructure::mcp;

#[derive(Parser)]
#[command(name = "taskhub", version, about = "Agentic task-management and context-orchestration MCP server")]
struct Cli {
    /// Path to a config file (defaults to .taskhub/config.yaml merging)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server
    Serve {
        /// Override the listen port
        #[arg(long)]
        port: Option<u16>,
        /// Override the database URL
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
    /// Apply pending schema migrations and exit
    Migrate {
        /// Override the database URL
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;

    match cli.command {
        Command::Serve { port, database_url } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(url) = database_url {
                config.database.url = url;
            }
            init_tracing(&config);

            let pool = create_pool(&config.database)
                .await
                .context("Failed to create database pool")?;

            mcp::serve(Arc::new(config), pool).await
        }
        Command::Migrate { database_url } => {
            if let Some(url) = database_url {
                config.database.url = url;
            }
            init_tracing(&config);

            let pool = create_pool(&config.database)
                .await
                .context("Failed to create database pool")?;
            let applied = Migrator::new(pool).run().await?;
            println!("Applied {applied} migration(s)");
            Ok(())
        }
    }
}
