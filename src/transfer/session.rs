use std::path::Path;

use crate::JobError;
use crate::config::Credential;
use crate::parse::RemoteTarget;

/// One authenticated connection to the remote host. Uploads go through it
/// one file at a time; `close` releases it.
pub trait RemoteSession {
    /// Copy `local` into `remote_dir` under its own file name.
    fn upload(&mut self, local: &Path, remote_dir: &str) -> Result<(), String>;
    fn close(&mut self);
}

/// Opens sessions. Implementors are shared with the scheduler thread.
pub trait Transport: Send + Sync {
    /// Fails with `JobError::Auth` when the credential is rejected and
    /// `JobError::Connection` for anything else.
    fn connect(
        &self,
        target: &RemoteTarget,
        credential: &Credential,
        port: u16,
    ) -> Result<Box<dyn RemoteSession>, JobError>;
}

/// Owns the run's session and closes it when dropped, whichever way the run
/// leaves its per-file loop.
pub(crate) struct SessionGuard {
    session: Box<dyn RemoteSession>,
    label: String,
}

impl SessionGuard {
    pub(crate) fn new(session: Box<dyn RemoteSession>, label: String) -> Self {
        tracing::debug!(remote = %label, "session opened");
        Self { session, label }
    }

    pub(crate) fn upload(&mut self, local: &Path, remote_dir: &str) -> Result<(), String> {
        self.session.upload(local, remote_dir)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
        tracing::debug!(remote = %self.label, "session closed");
    }
}
