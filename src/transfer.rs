// transfer module: one run of enumerate -> upload -> archive
mod enumeration;
mod helpers;
mod relocate;
pub mod session;
pub mod ssh;

pub use helpers::{remote_file_path, wildcard_match};
pub use session::{RemoteSession, Transport};
pub use ssh::Ssh2Transport;

use std::path::Path;

use serde::Serialize;

use self::enumeration::enumerate_candidates;
use self::helpers::display_path;
use self::relocate::relocate;
use self::session::SessionGuard;
use crate::config::TransferJobConfig;
use crate::{JobError, TransferError};

/// Where a file ended up within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Copied to the remote host, not yet archived
    Uploaded,
    Relocated,
    FailedUpload,
    /// On the remote host but still in the source directory
    FailedRelocate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Uploaded => "uploaded",
            Stage::Relocated => "relocated",
            Stage::FailedUpload => "failed-upload",
            Stage::FailedRelocate => "failed-relocate",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub filename: String,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransferOutcome {
    fn ok(filename: String, stage: Stage) -> Self {
        Self { filename, stage, error: None }
    }

    fn failed(filename: String, stage: Stage, err: &TransferError) -> Self {
        Self { filename, stage, error: Some(err.to_string()) }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub relocated: usize,
    pub failed_upload: usize,
    pub failed_relocate: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.relocated + self.failed_upload + self.failed_relocate
    }

    pub fn is_clean(&self) -> bool {
        self.failed_upload == 0 && self.failed_relocate == 0
    }
}

pub fn summarize(outcomes: &[TransferOutcome]) -> RunSummary {
    let mut s = RunSummary::default();
    for o in outcomes {
        match o.stage {
            Stage::Relocated => s.relocated += 1,
            Stage::FailedUpload => s.failed_upload += 1,
            Stage::FailedRelocate => s.failed_relocate += 1,
            Stage::Uploaded => {}
        }
    }
    s
}

/// Execute one transfer run.
///
/// Order of operations:
/// - both local directories must exist, otherwise `Validation` and nothing happens;
/// - candidates are listed; none at all is a no-op run and no connection is made;
/// - the remote endpoint is resolved once (`Parse` aborts the run);
/// - one session is opened for every file (`Auth` / `Connection` abort the run)
///   and closed when the run ends, however it ends;
/// - each file is uploaded then moved to `dest_dir`; a failure only affects
///   that file's outcome.
pub fn run(
    config: &TransferJobConfig,
    transport: &dyn Transport,
) -> Result<Vec<TransferOutcome>, JobError> {
    validate_dirs(config).map_err(abort)?;

    let candidates = enumerate_candidates(&config.source_dir, &config.file_pattern).map_err(abort)?;
    if candidates.is_empty() {
        tracing::info!(
            dir = %display_path(&config.source_dir),
            pattern = config.file_pattern.as_str(),
            "no matching files, nothing to transfer"
        );
        return Ok(Vec::new());
    }

    let target = crate::parse::resolve(&config.remote_endpoint).map_err(abort)?;
    tracing::info!(files = candidates.len(), remote = %target, "transfer run started");

    let session = transport.connect(&target, &config.credential, config.port).map_err(abort)?;
    let mut session = SessionGuard::new(session, target.to_string());

    let mut outcomes = Vec::with_capacity(candidates.len());
    for path in &candidates {
        outcomes.push(transfer_one(&mut session, path, &target.remote_path, &config.dest_dir));
    }
    drop(session);

    let summary = summarize(&outcomes);
    tracing::info!(
        relocated = summary.relocated,
        failed_upload = summary.failed_upload,
        failed_relocate = summary.failed_relocate,
        "transfer run finished"
    );
    Ok(outcomes)
}

fn abort(e: JobError) -> JobError {
    tracing::error!(error = %e, "transfer run aborted");
    e
}

fn validate_dirs(config: &TransferJobConfig) -> Result<(), JobError> {
    for (label, dir) in [("source", &config.source_dir), ("destination", &config.dest_dir)] {
        if !dir.is_dir() {
            return Err(JobError::Validation(format!(
                "{} directory does not exist: {}",
                label,
                display_path(dir)
            )));
        }
    }
    Ok(())
}

fn transfer_one(
    session: &mut SessionGuard,
    path: &Path,
    remote_dir: &str,
    dest_dir: &Path,
) -> TransferOutcome {
    let filename = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

    if let Err(reason) = session.upload(path, remote_dir) {
        let err = TransferError::UploadFailed { file: filename.clone(), reason };
        tracing::warn!(file = %filename, stage = %Stage::FailedUpload, "{}", err);
        return TransferOutcome::failed(filename, Stage::FailedUpload, &err);
    }
    tracing::info!(file = %filename, stage = %Stage::Uploaded, remote_dir, "file uploaded");

    match relocate(path, dest_dir) {
        Ok(dest) => {
            tracing::info!(
                file = %filename,
                stage = %Stage::Relocated,
                dest = %display_path(&dest),
                "file archived"
            );
            TransferOutcome::ok(filename, Stage::Relocated)
        }
        Err(err) => {
            tracing::error!(file = %filename, stage = %Stage::FailedRelocate, "{}", err);
            TransferOutcome::failed(filename, Stage::FailedRelocate, &err)
        }
    }
}
