use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pageflow_rust::{run_activation, ActivationRequest, AppConfig, AppError, FileSessionStore};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Ejecuta una activación de un page-flow y guarda la sesión en disco.
#[derive(Parser, Debug)]
#[command(name = "main-core", version, about)]
struct Cli {
    /// Flow ID (nombre del archivo de definición sin extensión).
    flow_id: String,
    /// Ticket devuelto por una activación anterior.
    #[arg(long)]
    ticket: Option<String>,
    #[arg(long)]
    event: Option<String>,
    /// Payload JSON de la petición.
    #[arg(long)]
    payload: Option<String>,
    #[arg(long)]
    flow_dir: Option<PathBuf>,
    #[arg(long)]
    session: Option<PathBuf>,
    /// Borra la sesión guardada antes de activar.
    #[arg(long)]
    reset: bool,
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.flow_dir {
        config.flow_dir = dir;
    }
    if let Some(session) = cli.session {
        config.session_file = session;
    }
    if cli.reset {
        FileSessionStore::new(&config.session_file).clear()?;
        tracing::info!("session {} cleared", config.session_file.display());
    }

    let payload = match cli.payload.as_deref() {
        Some(raw) => serde_json::from_str(raw)?,
        None => Value::Null,
    };
    let request = ActivationRequest { flow_id: cli.flow_id,
                                      ticket: cli.ticket,
                                      event: cli.event,
                                      payload };
    tracing::debug!(?request, "activating");
    let report = run_activation(&config, &request)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env())
                             .with_writer(std::io::stderr)
                             .init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
