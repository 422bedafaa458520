/// Job- and run-level errors. A run-level variant aborts the current run only;
/// the lifecycle variants are reported back to the caller of `start`/`stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Missing or malformed input (blank fields, bad daily time, missing directories)
    Validation(String),
    /// Remote endpoint descriptor could not be parsed
    Parse(String),
    /// Remote host rejected the credential
    Auth(String),
    /// Remote host unreachable, handshake failure or similar
    Connection(String),
    AlreadyRunning,
    NotRunning,
    TriggerAlreadyArmed,
    Spawn(String),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use JobError::*;
        match self {
            Validation(msg) => write!(f, "invalid job configuration: {}", msg),
            Parse(endpoint) => {
                write!(f, "invalid remote endpoint '{}', expected user@host:/path", endpoint)
            }
            Auth(addr) => write!(f, "SSH authentication failed: {}", addr),
            Connection(msg) => write!(f, "SSH connection failed: {}", msg),
            AlreadyRunning => write!(f, "schedule is already running"),
            NotRunning => write!(f, "schedule is not running"),
            TriggerAlreadyArmed => write!(f, "a daily trigger is already armed"),
            Spawn(msg) => write!(f, "failed to start scheduler thread: {}", msg),
        }
    }
}

impl std::error::Error for JobError {}

impl JobError {
    /// Whether this error aborts a single transfer run while leaving the schedule armed.
    pub fn is_run_abort(&self) -> bool {
        use JobError::*;
        matches!(self, Validation(_) | Parse(_) | Auth(_) | Connection(_))
    }
}

/// Per-file failures. These never escape the executor's per-file loop; they are
/// folded into the file's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    UploadFailed { file: String, reason: String },
    /// Archive already holds a file with the same name
    DestinationExists { file: String, dest: String },
    RelocateFailed { file: String, reason: String },
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use TransferError::*;
        match self {
            UploadFailed { file, reason } => write!(f, "upload of {} failed: {}", file, reason),
            DestinationExists { file, dest } => {
                write!(f, "cannot archive {}: {} already exists", file, dest)
            }
            RelocateFailed { file, reason } => {
                write!(f, "uploaded {} but moving it failed: {}", file, reason)
            }
        }
    }
}

impl std::error::Error for TransferError {}

impl TransferError {
    /// True when the file already reached the remote host and only the local move failed.
    pub fn is_relocation(&self) -> bool {
        matches!(self, TransferError::DestinationExists { .. } | TransferError::RelocateFailed { .. })
    }
}
