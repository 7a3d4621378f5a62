//! persona-chat - Chat with AI-agent personas
//!
#![doc = "Main entry point for the persona-chat CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use persona_chat::cli::{Cli, Commands};
use persona_chat::commands;
use persona_chat::config::Config;
use persona_chat::persona::CatalogSource;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // One catalog per process, loaded on first use
    let catalog = CatalogSource::new(&config.personas.catalog);

    match cli.command {
        Commands::Chat { persona } => {
            if let Some(p) = &persona {
                tracing::debug!("Using persona override: {}", p);
            }
            commands::chat::run_chat(config, &catalog, persona).await?;
            Ok(())
        }
        Commands::Ask { persona, prompt } => {
            commands::ask::run_ask(config, &catalog, persona, prompt.join(" ")).await?;
            Ok(())
        }
        Commands::Personas => {
            commands::personas::list_personas(&catalog).await?;
            Ok(())
        }
    }
}

/// Initialize tracing to stderr so streamed replies on stdout stay clean
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "persona_chat=debug"
    } else {
        "persona_chat=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
