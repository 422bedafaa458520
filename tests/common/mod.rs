#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use autoscp::JobError;
use autoscp::config::{Credential, FilePattern, TransferJobConfig};
use autoscp::parse::RemoteTarget;
use autoscp::schedule::Clock;
use autoscp::transfer::{RemoteSession, Transport};

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Fresh empty directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let now_ns = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let cnt = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "autoscp_{}_{}_{}_{}",
        tag,
        std::process::id(),
        cnt,
        now_ns
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Source and destination directories for one job.
pub struct Dirs {
    pub source: PathBuf,
    pub dest: PathBuf,
}

impl Dirs {
    pub fn new(tag: &str) -> Self {
        let root = scratch_dir(tag);
        let source = root.join("out");
        let dest = root.join("archive");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&dest).unwrap();
        Dirs { source, dest }
    }

    pub fn put(&self, name: &str) -> PathBuf {
        let p = self.source.join(name);
        std::fs::write(&p, format!("payload of {}", name)).unwrap();
        p
    }

    pub fn config(&self, time: &str) -> TransferJobConfig {
        TransferJobConfig {
            source_dir: self.source.clone(),
            remote_endpoint: "batch@files.example.com:/srv/inbox".to_string(),
            dest_dir: self.dest.clone(),
            credential: Credential::Password("secret".to_string()),
            daily_time: time.to_string(),
            file_pattern: FilePattern::default(),
            port: 22,
        }
    }
}

pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[derive(Default)]
pub struct MockState {
    pub connects: usize,
    pub closes: usize,
    /// (file name, remote dir) per successful upload
    pub uploaded: Vec<(String, String)>,
    pub connect_error: Option<JobError>,
    pub fail_uploads: HashSet<String>,
    pub panic_on: Option<String>,
}

/// In-memory transport; clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|p| p.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing(err: JobError) -> Self {
        let t = Self::new();
        t.state().connect_error = Some(err);
        t
    }

    pub fn failing_upload(self, name: &str) -> Self {
        self.state().fail_uploads.insert(name.to_string());
        self
    }

    pub fn panicking_on(self, name: &str) -> Self {
        self.state().panic_on = Some(name.to_string());
        self
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

impl Transport for MockTransport {
    fn connect(
        &self,
        _target: &RemoteTarget,
        _credential: &Credential,
        _port: u16,
    ) -> Result<Box<dyn RemoteSession>, JobError> {
        let mut s = self.state();
        s.connects += 1;
        if let Some(err) = s.connect_error.clone() {
            return Err(err);
        }
        Ok(Box::new(MockSession { state: self.state.clone() }))
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl RemoteSession for MockSession {
    fn upload(&mut self, local: &Path, remote_dir: &str) -> Result<(), String> {
        let name = local.file_name().unwrap().to_string_lossy().to_string();
        let mut s = lock(&self.state);
        if s.panic_on.as_deref() == Some(name.as_str()) {
            drop(s);
            panic!("transport blew up on {}", name);
        }
        if s.fail_uploads.contains(&name) {
            return Err("permission denied".to_string());
        }
        s.uploaded.push((name, remote_dir.to_string()));
        Ok(())
    }

    fn close(&mut self) {
        lock(&self.state).closes += 1;
    }
}

/// Clock moved by hand.
pub struct ManualClock(Mutex<NaiveDateTime>);

impl ManualClock {
    pub fn at(h: u32, m: u32) -> Arc<Self> {
        let start = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap().and_hms_opt(h, m, 0).unwrap();
        Arc::new(ManualClock(Mutex::new(start)))
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.0.lock().unwrap() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

/// Poll `cond` for up to five seconds.
pub fn wait_until(cond: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    cond()
}
