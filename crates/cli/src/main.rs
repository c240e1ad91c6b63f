use crate::{
    commands::{Commands, TransferArgs},
    env::EnvManager,
    error::CliError,
    output::TransferReport,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use engine_runtime::{execution::factory, run_transfer};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "rowshift",
    version,
    about = "Split-and-copy rows between SQL tables"
)]
struct Cli {
    /// Extra `KEY=VALUE` file; `./.env` is used when present and no file is given
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "rowshift failed");
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let env = load_env(cli.env_file.as_deref())?;

    match cli.command {
        Commands::Transfer { args, output } => transfer(&args, output.as_deref(), &env).await,
        Commands::TestConn { url } => {
            let format = factory::test_connection(&url).await?;
            info!(format = %format, "Connection succeeded");
            Ok(ExitCode::Success)
        }
        Commands::Config { args } => {
            let (settings, endpoints) = config::resolve(&args, &env)?;
            println!("{}", output::config_json(&settings, &endpoints)?);
            Ok(ExitCode::Success)
        }
    }
}

fn load_env(path: Option<&Path>) -> Result<EnvManager, CliError> {
    let mut env = EnvManager::new();
    match path {
        Some(path) => env.load_from_file(path)?,
        None if Path::new(".env").is_file() => env.load_from_file(".env")?,
        None => {}
    }
    Ok(env)
}

async fn transfer(
    args: &TransferArgs,
    output: Option<&str>,
    env: &EnvManager,
) -> Result<ExitCode, CliError> {
    let (settings, endpoints) = config::resolve(args, env)?;

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let result = run_transfer(settings, &endpoints, shutdown.cancel_token()).await;
    output::emit_report(&TransferReport::from_result(&result), output).await?;

    match result {
        Ok(_) => Ok(ExitCode::Success),
        Err(err) if err.is_cancelled() || shutdown.is_shutdown_requested() => {
            info!("Transfer stopped by shutdown request");
            Ok(ExitCode::ShutdownRequested)
        }
        Err(err) => Err(err.into()),
    }
}
