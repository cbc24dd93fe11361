//! Formcraft - form mock-up to Formily schema generator
//!
#![doc = "Formcraft - form mock-up to Formily schema generator"]
#![doc = "Main entry point for the formcraft binary."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use formcraft::cli::{Cli, Commands};
use formcraft::commands;
use formcraft::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!("Starting HTTP server");
            commands::serve::run_serve(config, bind).await?;
        }
        Commands::Generate {
            image,
            prompt,
            remote,
            output,
        } => {
            tracing::debug!("Generating schema for {}", image.display());
            commands::generate::run_generate(config, image, prompt, remote, output).await?;
        }
        Commands::History { command } => {
            commands::history::handle_history(&config, command)?;
        }
        Commands::Remote { command } => {
            commands::remote::handle_remote(&config, command).await?;
        }
    }
    Ok(())
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so generated schemas can be piped from stdout.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "formcraft=debug"
    } else {
        "formcraft=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
