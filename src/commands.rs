use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::JobArgs;
use crate::config::{JobProfile, TransferJobConfig};
use crate::controller::JobController;
use crate::transfer::{self, RunSummary, Transport};
use crate::util;

/// Profile file values overridden by the command line.
pub fn load_job(profile_path: &Path, job: &JobArgs) -> Result<(JobProfile, TransferJobConfig)> {
    let profile = JobProfile::load(profile_path)?.overlay(job.to_profile());
    let config = profile.to_job_config(job.password.clone(), job.agent);
    Ok((profile, config))
}

pub fn handle_init(profile_path: &Path, force: bool) -> Result<()> {
    if profile_path.exists() && !force {
        eprintln!(
            "Profile {} already exists (use --force to overwrite)",
            profile_path.display()
        );
        return Ok(());
    }
    JobProfile::template().save(profile_path)?;
    println!("✅ Profile template written to {}", profile_path.display());
    Ok(())
}

pub fn handle_resolve(endpoint: &str) -> Result<()> {
    let target = crate::parse::resolve(endpoint)?;
    println!("principal: {}", target.principal);
    println!("host:      {}", target.host);
    println!("path:      {}", target.remote_path);
    Ok(())
}

/// One immediate run. Returns the summary so the caller can pick an exit code.
pub fn handle_once(
    profile_path: &Path,
    job: &JobArgs,
    json: bool,
    transport: &dyn Transport,
) -> Result<RunSummary> {
    let (_, config) = load_job(profile_path, job)?;
    config.validate_fields()?;
    let outcomes = transfer::run(&config, transport)?;
    let summary = transfer::summarize(&outcomes);
    if json {
        println!("{}", util::outcomes_json(&outcomes));
    } else {
        util::print_outcome_table(&outcomes)?;
        util::print_summary(&summary);
    }
    Ok(summary)
}

/// Start the schedule, then take operator commands from stdin.
pub fn handle_run(profile_path: &Path, job: &JobArgs, transport: Arc<dyn Transport>) -> Result<()> {
    let (profile, _) = load_job(profile_path, job)?;
    let controller = JobController::new(transport).with_poll_interval(profile.poll_interval());
    let build = || load_job(profile_path, job).map(|(_, config)| config);

    apply(&controller, Operator::Start, &build);
    let stdin = std::io::stdin();
    if operator_loop(&controller, stdin.lock(), &build)? == LoopExit::Quit {
        return Ok(());
    }
    if !controller.is_running() {
        return Ok(());
    }
    tracing::info!("stdin closed, schedule keeps running until the process is terminated");
    loop {
        std::thread::park();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Start,
    Stop,
    Status,
    Quit,
    Help,
    Unknown(String),
}

/// Blank lines give `None`.
pub fn parse_operator(line: &str) -> Option<Operator> {
    let word = line.trim();
    if word.is_empty() {
        return None;
    }
    Some(match word.to_ascii_lowercase().as_str() {
        "start" => Operator::Start,
        "stop" => Operator::Stop,
        "status" => Operator::Status,
        "quit" | "exit" => Operator::Quit,
        "help" | "?" => Operator::Help,
        _ => Operator::Unknown(word.to_string()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Quit,
    Eof,
}

/// Read commands until `quit` or end of input. `quit` stops a running schedule.
pub fn operator_loop<R, F>(controller: &JobController, input: R, build: &F) -> Result<LoopExit>
where
    R: BufRead,
    F: Fn() -> Result<TransferJobConfig>,
{
    for line in input.lines() {
        let Some(op) = parse_operator(&line?) else {
            continue;
        };
        if op == Operator::Quit {
            if controller.is_running() {
                apply(controller, Operator::Stop, build);
            }
            return Ok(LoopExit::Quit);
        }
        apply(controller, op, build);
    }
    Ok(LoopExit::Eof)
}

// Errors are reported to the operator; the loop keeps going.
fn apply<F>(controller: &JobController, op: Operator, build: &F)
where
    F: Fn() -> Result<TransferJobConfig>,
{
    match op {
        Operator::Start => match build().and_then(|c| Ok(controller.start(c)?)) {
            Ok(()) => println!("schedule started"),
            Err(e) => eprintln!("❌ start failed: {}", e),
        },
        Operator::Stop => match controller.stop() {
            Ok(()) => println!("schedule stopped"),
            Err(e) => eprintln!("❌ stop failed: {}", e),
        },
        Operator::Status => {
            println!("{}", if controller.is_running() { "running" } else { "stopped" })
        }
        Operator::Help | Operator::Unknown(_) => {
            if let Operator::Unknown(word) = op {
                eprintln!("unknown command '{}'", word);
            }
            println!("commands: start | stop | status | quit");
        }
        Operator::Quit => {}
    }
}
