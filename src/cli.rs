use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::JobProfile;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(short, long, global = true, help = "Print verbose diagnostic logs for debugging")]
    pub verbose: bool,
    #[clap(long, global = true, help = "Profile file (default ~/.autoscp/profile.json)")]
    pub profile: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Commands,
}

/// Job settings given on the command line. Each one overrides the profile.
// no Debug: carries the password
#[derive(Args, Clone, Default)]
pub struct JobArgs {
    #[clap(short = 's', long = "source", help = "Local directory holding files to send")]
    pub source_dir: Option<PathBuf>,
    #[clap(short = 'r', long = "remote", help = "Remote endpoint user@host:/path")]
    pub remote_endpoint: Option<String>,
    #[clap(short = 'd', long = "dest", help = "Local directory receiving sent files")]
    pub dest_dir: Option<PathBuf>,
    #[clap(short = 't', long = "time", help = "Daily run time, HH:MM (24-hour)")]
    pub daily_time: Option<String>,
    #[clap(long = "pattern", help = "File suffix or glob, default .txt")]
    pub file_pattern: Option<String>,
    #[clap(short = 'p', long, help = "SSH port, default 22")]
    pub port: Option<u16>,
    #[clap(short = 'k', long = "key", help = "Private key file used for authentication")]
    pub key_path: Option<PathBuf>,
    #[clap(long, help = "Authenticate with the running ssh-agent")]
    pub agent: bool,
    #[clap(long, env = "AUTOSCP_PASSWORD", hide_env_values = true, help = "SSH password")]
    pub password: Option<String>,
    #[clap(long = "poll-secs", help = "Scheduler poll interval in seconds")]
    pub poll_secs: Option<u64>,
}

impl JobArgs {
    pub fn to_profile(&self) -> JobProfile {
        JobProfile {
            source_dir: self.source_dir.clone(),
            remote_endpoint: self.remote_endpoint.clone(),
            dest_dir: self.dest_dir.clone(),
            daily_time: self.daily_time.clone(),
            file_pattern: self.file_pattern.clone(),
            port: self.port,
            key_path: self.key_path.clone(),
            poll_interval_secs: self.poll_secs,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    #[clap(
        about = "Run the daily schedule; reads start/stop/status/quit from stdin",
        display_order = 1
    )]
    Run {
        #[clap(flatten)]
        job: JobArgs,
    },
    #[clap(about = "Run a single transfer now and print per-file results", display_order = 2)]
    Once {
        #[clap(flatten)]
        job: JobArgs,
        #[clap(long, help = "Print results as JSON")]
        json: bool,
    },
    #[clap(about = "Check how a remote endpoint is parsed", display_order = 3)]
    Resolve { endpoint: String },
    #[clap(about = "Write a profile template", display_order = 4)]
    Init {
        #[clap(short, long, help = "Overwrite an existing profile")]
        force: bool,
    },
}
