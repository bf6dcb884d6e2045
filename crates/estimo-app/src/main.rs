// estimo entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (log to file, stdout carries command output)
// 3. Load config (copying defaults on first run)
// 4. Open session storage and restore any persisted session
// 5. Run the command

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use estimo_app::app::App;
use estimo_app::cli::Cli;
use estimo_app::commands;
use estimo_core::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    init_tracing(&base_dir, cli.verbose)?;
    info!("estimo starting up");

    let config = config::load_config_in(&base_dir).context("failed to load configuration")?;
    let mut app = App::bootstrap(config).await?;
    info!(authenticated = app.is_authenticated(), "ready");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = commands::run(&mut app, cli.command, &mut out).await {
        error!("command failed: {e:#}");
        return Err(e);
    }
    Ok(())
}

/// Log to `logs/estimo.log` under `base_dir`, never to the terminal.
fn init_tracing(base_dir: &Path, verbose: u8) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("estimo.log"))
        .context("failed to open log file")?;

    let filter = if verbose > 0 {
        EnvFilter::new("estimo=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("estimo=info,warn"))
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
