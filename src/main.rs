use clap::Parser;
use modal_forms::ClientConfig;
use modal_forms::app::{self, Cli};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = ClientConfig::from_env()?;
    if let Err(err) = app::run(&config, cli.command).await {
        error!("{err}");
        std::process::exit(1);
    }

    Ok(())
}
