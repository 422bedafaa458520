use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, bounded};

use crate::JobError;
use crate::config::{DEFAULT_POLL_INTERVAL_SECS, TransferJobConfig};
use crate::schedule::{Clock, SchedulerLoop, SystemClock};
use crate::transfer::{self, Transport};

/// Running flag shared between the controller and its scheduler thread.
#[derive(Debug, Default)]
pub struct JobState {
    running: AtomicBool,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

struct Background {
    handle: JoinHandle<()>,
    stop_tx: Sender<()>,
}

/// Start/stop lifecycle of the daily transfer job. At most one schedule runs
/// per controller.
pub struct JobController {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    state: Arc<JobState>,
    // also serialises start/stop transitions
    background: Mutex<Option<Background>>,
}

impl JobController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            clock: Arc::new(SystemClock),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            state: Arc::new(JobState::new()),
            background: Mutex::new(None),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn lock_background(&self) -> MutexGuard<'_, Option<Background>> {
        self.background.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Validate `config`, arm a daily trigger bound to a transfer run and start
    /// polling it on a background thread.
    pub fn start(&self, config: TransferJobConfig) -> Result<(), JobError> {
        let daily_time = config.validate().inspect_err(|e| {
            tracing::error!(error = %e, "schedule not started");
        })?;

        let mut background = self.lock_background();
        if self.state.is_running() {
            tracing::warn!("start requested while the schedule is already running");
            return Err(JobError::AlreadyRunning);
        }

        let mut scheduler = SchedulerLoop::new(self.clock.clone(), self.poll_interval);
        let transport = self.transport.clone();
        scheduler.arm(daily_time, move || run_scheduled(&config, transport.as_ref()))?;

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let state = self.state.clone();
        self.state.set_running(true);
        let spawned = std::thread::Builder::new()
            .name("autoscp-scheduler".to_string())
            .spawn(move || scheduler.run(&state, &stop_rx));
        match spawned {
            Ok(handle) => {
                *background = Some(Background { handle, stop_tx });
                tracing::info!(at = %daily_time, "schedule started");
                Ok(())
            }
            Err(e) => {
                self.state.set_running(false);
                tracing::error!("failed to spawn scheduler thread: {}", e);
                Err(JobError::Spawn(e.to_string()))
            }
        }
    }

    /// Prevent future firings. A run already in progress is not interrupted;
    /// this returns once it has finished and the poll loop has exited.
    ///
    /// The running flag is cleared before waiting, so `is_running` reports
    /// `false` right away. A concurrent `start` waits until the old loop is gone.
    pub fn stop(&self) -> Result<(), JobError> {
        let mut background = self.lock_background();
        if !self.state.is_running() {
            tracing::warn!("stop requested while the schedule is not running");
            return Err(JobError::NotRunning);
        }
        self.state.set_running(false);
        if let Some(Background { handle, stop_tx }) = background.take() {
            // the loop may already be gone; a closed channel is fine
            let _ = stop_tx.try_send(());
            drop(stop_tx);
            if handle.join().is_err() {
                tracing::error!("scheduler thread panicked");
            }
        }
        tracing::info!("schedule stopped");
        Ok(())
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        if self.state.is_running() {
            let _ = self.stop();
        }
    }
}

// Run-level aborts and panics end here; the trigger stays armed for the next day.
// Aborts were already logged by `transfer::run`.
fn run_scheduled(config: &TransferJobConfig, transport: &dyn Transport) {
    match catch_unwind(AssertUnwindSafe(|| transfer::run(config, transport))) {
        Ok(Ok(outcomes)) => {
            let summary = transfer::summarize(&outcomes);
            if !summary.is_clean() {
                tracing::warn!(
                    failed_upload = summary.failed_upload,
                    failed_relocate = summary.failed_relocate,
                    "run finished with failures; affected files stay in the source directory"
                );
            }
        }
        Ok(Err(_)) => {}
        Err(payload) => tracing::error!(
            panic = panic_message(&*payload),
            "transfer run panicked, waiting for the next firing"
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
