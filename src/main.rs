use clap::Parser;
use loanform::cli::Cli;
use loanform::commands;
use loanform::config::Settings;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::new_with_cli(&cli)?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Loaded configuration from {}", cli.config.display());

    let stdout = std::io::stdout();
    let ok = commands::run(&cli.command, &settings, &mut stdout.lock())?;

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
