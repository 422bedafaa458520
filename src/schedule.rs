use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::JobError;
use crate::config::DailyTime;
use crate::controller::JobState;

/// Wall-clock source for the trigger. Local naive time, the daily time is
/// entered as a local clock reading.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A daily firing time and its next occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    at: DailyTime,
    next_due: NaiveDateTime,
}

impl DailyTrigger {
    pub fn new(at: DailyTime, now: NaiveDateTime) -> Self {
        Self { at, next_due: next_occurrence(at, now) }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now >= self.next_due
    }

    pub fn next_due(&self) -> NaiveDateTime {
        self.next_due
    }

    /// Move to the first occurrence strictly after `now`.
    pub fn reschedule(&mut self, now: NaiveDateTime) {
        self.next_due = next_occurrence(self.at, now);
    }
}

fn next_occurrence(at: DailyTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(at.as_naive());
    if today > now { today } else { today + TimeDelta::days(1) }
}

type Job = Box<dyn FnMut() + Send>;

struct Armed {
    trigger: DailyTrigger,
    job: Job,
}

/// Poll loop owning at most one daily trigger.
pub struct SchedulerLoop {
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    armed: Option<Armed>,
}

impl SchedulerLoop {
    pub fn new(clock: Arc<dyn Clock>, poll_interval: Duration) -> Self {
        Self { clock, poll_interval, armed: None }
    }

    pub fn arm<F>(&mut self, at: DailyTime, job: F) -> Result<(), JobError>
    where
        F: FnMut() + Send + 'static,
    {
        if self.armed.is_some() {
            return Err(JobError::TriggerAlreadyArmed);
        }
        let trigger = DailyTrigger::new(at, self.clock.now());
        tracing::info!(at = %at, next = %trigger.next_due(), "daily trigger armed");
        self.armed = Some(Armed { trigger, job: Box::new(job) });
        Ok(())
    }

    /// Returns whether a trigger was removed.
    pub fn disarm(&mut self) -> bool {
        self.armed.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.armed.as_ref().map(|a| a.trigger.next_due())
    }

    /// Run the job if the trigger is due, then re-arm it for the next day.
    /// The job runs on the calling thread.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        let Some(armed) = self.armed.as_mut() else {
            return false;
        };
        if !armed.trigger.is_due(now) {
            return false;
        }
        tracing::info!(due = %armed.trigger.next_due(), "daily trigger fired");
        (armed.job)();
        armed.trigger.reschedule(self.clock.now());
        tracing::debug!(next = %armed.trigger.next_due(), "daily trigger re-armed");
        true
    }

    /// Poll until `state` stops running or a stop signal arrives (a dropped
    /// sender counts as one). Stopping takes effect at the next wake-up.
    pub fn run(mut self, state: &JobState, stop: &Receiver<()>) {
        while state.is_running() {
            self.tick();
            match stop.recv_timeout(self.poll_interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if self.disarm() {
            tracing::info!("daily trigger disarmed");
        }
    }
}
