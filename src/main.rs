use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use autoscp::cli::{Cli, Commands};
use autoscp::transfer::Ssh2Transport;
use autoscp::{commands, config, logging};

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    logging::flush_logs();
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let log_dir = config::ensure_app_dir()?.join("logs");
    logging::init_tracing(cli.verbose, Some(&log_dir))?;

    let profile_path = match cli.profile {
        Some(p) => p,
        None => config::default_profile_path()?,
    };

    match cli.command {
        Commands::Run { job } => {
            commands::handle_run(&profile_path, &job, Arc::new(Ssh2Transport::default()))?;
        }
        Commands::Once { job, json } => {
            let summary = commands::handle_once(&profile_path, &job, json, &Ssh2Transport::default())?;
            if !summary.is_clean() {
                return Ok(2);
            }
        }
        Commands::Resolve { endpoint } => commands::handle_resolve(&endpoint)?,
        Commands::Init { force } => commands::handle_init(&profile_path, force)?,
    }
    Ok(0)
}
