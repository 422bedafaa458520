use crate::JobError;

/// Remote side of a transfer, resolved from `principal@host:remoteDirectory`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub principal: String,
    pub host: String,
    pub remote_path: String,
}

impl std::fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.principal, self.host, self.remote_path)
    }
}

/// Split on the first ':' (host part / remote path), then the host part on the
/// first '@'. Anything after those delimiters belongs to the remote path.
pub fn resolve(endpoint: &str) -> Result<RemoteTarget, JobError> {
    let input = endpoint.trim();
    let invalid = || JobError::Parse(input.to_string());

    let (user_host, path) = input.split_once(':').ok_or_else(invalid)?;
    let (user, host) = user_host.split_once('@').ok_or_else(invalid)?;
    if user.is_empty() || host.is_empty() || path.is_empty() {
        return Err(invalid());
    }

    Ok(RemoteTarget {
        principal: user.to_string(),
        host: host.to_string(),
        remote_path: path.to_string(),
    })
}
