use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::JobError;
use crate::transfer::wildcard_match;

pub const DEFAULT_FILE_PATTERN: &str = ".txt";
pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

static DAILY_TIME_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}:[0-9]{2}$").expect("constant regex pattern is valid")
});

/// How the session authenticates against the remote host.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    KeyFile { path: PathBuf, passphrase: Option<String> },
    Agent,
    /// Nothing given: try the usual ~/.ssh keys, then the agent
    Default,
}

// secrets must never reach the logs
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(***)"),
            Credential::KeyFile { path, passphrase } => f
                .debug_struct("KeyFile")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "***"))
                .finish(),
            Credential::Agent => f.write_str("Agent"),
            Credential::Default => f.write_str("Default"),
        }
    }
}

/// Validated 24-hour wall-clock time of the daily run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTime(NaiveTime);

impl DailyTime {
    /// Accepts exactly `HH:MM` with hour 00-23 and minute 00-59.
    pub fn parse(input: &str) -> Result<Self, JobError> {
        let s = input.trim();
        if !DAILY_TIME_SHAPE.is_match(s) {
            return Err(JobError::Validation(format!(
                "daily time '{}' must be HH:MM (e.g. 14:30)",
                s
            )));
        }
        let (h, m) = s.split_at(2);
        let hour: u32 = h.parse().map_err(|_| JobError::Validation(format!("bad hour: {}", s)))?;
        let minute: u32 =
            m[1..].parse().map_err(|_| JobError::Validation(format!("bad minute: {}", s)))?;
        NaiveTime::from_hms_opt(hour, minute, 0).map(DailyTime).ok_or_else(|| {
            JobError::Validation(format!(
                "daily time '{}' out of range, hour 00-23 and minute 00-59",
                s
            ))
        })
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// Name filter for candidate files. A value with `*` or `?` is a glob on the
/// file name, anything else is a suffix (".txt").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePattern(String);

impl FilePattern {
    pub fn new(pattern: &str) -> Self {
        FilePattern(pattern.trim().to_string())
    }

    pub fn matches(&self, file_name: &str) -> bool {
        if self.0.contains('*') || self.0.contains('?') {
            wildcard_match(&self.0, file_name)
        } else {
            file_name.ends_with(&self.0)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FilePattern {
    fn default() -> Self {
        FilePattern(DEFAULT_FILE_PATTERN.to_string())
    }
}

/// Everything one scheduled job needs. Rebuilt for every `start`; the running
/// job only ever sees its own copy.
#[derive(Debug, Clone)]
pub struct TransferJobConfig {
    pub source_dir: PathBuf,
    pub remote_endpoint: String,
    pub dest_dir: PathBuf,
    pub credential: Credential,
    pub daily_time: String,
    pub file_pattern: FilePattern,
    pub port: u16,
}

impl TransferJobConfig {
    /// Checks the fields required before a schedule may be armed and returns
    /// the parsed daily time.
    pub fn validate(&self) -> Result<DailyTime, JobError> {
        let mut missing = self.missing_fields();
        if self.daily_time.trim().is_empty() {
            missing.push("daily time");
        }
        report_missing(missing)?;
        DailyTime::parse(&self.daily_time)
    }

    /// Checks what a single immediate run needs; the daily time is not one of them.
    pub fn validate_fields(&self) -> Result<(), JobError> {
        report_missing(self.missing_fields())
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank_path(&self.source_dir) {
            missing.push("source directory");
        }
        if self.remote_endpoint.trim().is_empty() {
            missing.push("remote endpoint");
        }
        if is_blank_path(&self.dest_dir) {
            missing.push("destination directory");
        }
        if matches!(&self.credential, Credential::Password(p) if p.trim().is_empty()) {
            missing.push("password");
        }
        if self.file_pattern.as_str().is_empty() {
            missing.push("file pattern");
        }
        missing
    }
}

fn report_missing(missing: Vec<&'static str>) -> Result<(), JobError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(JobError::Validation(format!("missing {}", missing.join(", "))))
    }
}

fn is_blank_path(p: &Path) -> bool {
    p.to_string_lossy().trim().is_empty()
}

/// Operator profile stored as JSON. Every field is optional so command-line
/// flags can fill or override it; passwords are never written here.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct JobProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
}

impl JobProfile {
    /// Template written by `autoscp init`.
    pub fn template() -> Self {
        JobProfile {
            source_dir: Some(PathBuf::from("/path/to/outbox")),
            remote_endpoint: Some("user@host:/remote/inbox".to_string()),
            dest_dir: Some(PathBuf::from("/path/to/archive")),
            daily_time: Some("00:00".to_string()),
            file_pattern: Some(DEFAULT_FILE_PATTERN.to_string()),
            port: Some(DEFAULT_PORT),
            key_path: None,
            poll_interval_secs: Some(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    /// A missing file is an empty profile; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(JobProfile::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse profile {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write profile {}", path.display()))
    }

    /// Values set in `other` win.
    pub fn overlay(self, other: JobProfile) -> JobProfile {
        JobProfile {
            source_dir: other.source_dir.or(self.source_dir),
            remote_endpoint: other.remote_endpoint.or(self.remote_endpoint),
            dest_dir: other.dest_dir.or(self.dest_dir),
            daily_time: other.daily_time.or(self.daily_time),
            file_pattern: other.file_pattern.or(self.file_pattern),
            port: other.port.or(self.port),
            key_path: other.key_path.or(self.key_path),
            poll_interval_secs: other.poll_interval_secs.or(self.poll_interval_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS).max(1))
    }

    /// Missing required values are left blank so `validate` reports them.
    pub fn to_job_config(&self, password: Option<String>, use_agent: bool) -> TransferJobConfig {
        let credential = match (password, &self.key_path) {
            (Some(p), _) => Credential::Password(p),
            (None, Some(k)) => Credential::KeyFile { path: k.clone(), passphrase: None },
            (None, None) if use_agent => Credential::Agent,
            (None, None) => Credential::Default,
        };
        TransferJobConfig {
            source_dir: self.source_dir.clone().unwrap_or_default(),
            remote_endpoint: self.remote_endpoint.clone().unwrap_or_default(),
            dest_dir: self.dest_dir.clone().unwrap_or_default(),
            credential,
            daily_time: self.daily_time.clone().unwrap_or_default(),
            file_pattern: self
                .file_pattern
                .as_deref()
                .map(FilePattern::new)
                .unwrap_or_default(),
            port: self.port.unwrap_or(DEFAULT_PORT),
        }
    }
}

/// `~/.autoscp`, created on first use.
pub fn ensure_app_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("cannot find user's home dir")?;
    let dir = home.join(".".to_owned() + env!("CARGO_PKG_NAME"));
    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    Ok(dir)
}

pub fn default_profile_path() -> anyhow::Result<PathBuf> {
    Ok(ensure_app_dir()?.join("profile.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> TransferJobConfig {
        TransferJobConfig {
            source_dir: PathBuf::from("/data/out"),
            remote_endpoint: "u@h:/in".to_string(),
            dest_dir: PathBuf::from("/data/archive"),
            credential: Credential::Password("secret".to_string()),
            daily_time: "02:30".to_string(),
            file_pattern: FilePattern::default(),
            port: DEFAULT_PORT,
        }
    }

    #[test]
    fn daily_time_accepts_full_range() {
        assert_eq!(DailyTime::parse("00:00").unwrap().to_string(), "00:00");
        assert_eq!(DailyTime::parse("23:59").unwrap().to_string(), "23:59");
        assert_eq!(DailyTime::parse(" 07:05 ").unwrap().to_string(), "07:05");
    }

    #[test]
    fn daily_time_rejects_malformed_values() {
        for bad in ["24:00", "9:60", "abc", "9:5", "12:60", "1230", "12:3a", "", "12:30:00"] {
            assert!(
                matches!(DailyTime::parse(bad), Err(JobError::Validation(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn suffix_and_glob_patterns() {
        let suffix = FilePattern::new(".txt");
        assert!(suffix.matches("a.txt"));
        assert!(!suffix.matches("a.csv"));
        let glob = FilePattern::new("report-??.csv");
        assert!(glob.matches("report-01.csv"));
        assert!(!glob.matches("report-1.csv"));
    }

    #[test]
    fn validate_reports_every_blank_field() {
        let mut cfg = base_config();
        cfg.source_dir = PathBuf::new();
        cfg.remote_endpoint = "  ".to_string();
        cfg.credential = Credential::Password(String::new());
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("source directory"));
        assert!(err.contains("remote endpoint"));
        assert!(err.contains("password"));
        assert!(!err.contains("destination"));
    }

    #[test]
    fn validate_accepts_key_based_credentials() {
        let mut cfg = base_config();
        cfg.credential = Credential::Default;
        assert_eq!(cfg.validate().unwrap().to_string(), "02:30");
    }

    #[test]
    fn immediate_run_does_not_need_a_daily_time() {
        let mut cfg = base_config();
        cfg.daily_time = String::new();
        assert!(cfg.validate_fields().is_ok());
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("daily time"));

        cfg.dest_dir = PathBuf::new();
        let err = cfg.validate_fields().unwrap_err().to_string();
        assert!(err.contains("destination directory"));
        assert!(!err.contains("daily time"));
    }

    #[test]
    fn credential_debug_hides_secret() {
        let shown = format!("{:?}", Credential::Password("hunter2".into()));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn overlay_prefers_command_line_values() {
        let file = JobProfile::template();
        let cli = JobProfile { daily_time: Some("05:00".into()), ..Default::default() };
        let merged = file.overlay(cli);
        assert_eq!(merged.daily_time.as_deref(), Some("05:00"));
        assert_eq!(merged.remote_endpoint.as_deref(), Some("user@host:/remote/inbox"));

        let cfg = merged.to_job_config(None, true);
        assert_eq!(cfg.credential, Credential::Agent);
        assert_eq!(cfg.port, 22);
    }

    #[test]
    fn profile_json_skips_unset_fields() {
        let p = JobProfile { port: Some(2222), ..Default::default() };
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"port":2222}"#);
        let back: JobProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
