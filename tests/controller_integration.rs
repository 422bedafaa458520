mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use crossbeam_channel::{Receiver, Sender, bounded};

use autoscp::config::Credential;
use autoscp::parse::RemoteTarget;
use autoscp::transfer::{RemoteSession, Transport};
use autoscp::{JobController, JobError};
use common::{Dirs, ManualClock, MockTransport, listing, wait_until};

fn controller(transport: &MockTransport, clock: &Arc<ManualClock>) -> JobController {
    JobController::new(Arc::new(transport.clone()))
        .with_clock(clock.clone())
        .with_poll_interval(Duration::from_millis(10))
}

#[test]
fn test_start_twice_is_rejected() {
    let dirs = Dirs::new("twice");
    let clock = ManualClock::at(8, 0);
    let c = controller(&MockTransport::new(), &clock);

    c.start(dirs.config("09:00")).unwrap();
    assert_eq!(c.start(dirs.config("10:00")), Err(JobError::AlreadyRunning));
    assert!(c.is_running());
    c.stop().unwrap();
}

#[test]
fn test_stop_when_stopped_is_rejected() {
    let clock = ManualClock::at(8, 0);
    let c = controller(&MockTransport::new(), &clock);
    assert_eq!(c.stop(), Err(JobError::NotRunning));
}

#[test]
fn test_fires_when_clock_reaches_daily_time() {
    let dirs = Dirs::new("fires");
    dirs.put("a.txt");
    let clock = ManualClock::at(8, 0);
    let transport = MockTransport::new();
    let c = controller(&transport, &clock);

    c.start(dirs.config("09:00")).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(transport.state().connects, 0);

    clock.advance(TimeDelta::hours(1));
    assert!(wait_until(|| transport.state().closes == 1));
    assert_eq!(listing(&dirs.dest), ["a.txt"]);
    assert!(c.is_running());
    c.stop().unwrap();
}

#[test]
fn test_failed_run_keeps_schedule_armed() {
    let dirs = Dirs::new("keeps");
    dirs.put("a.txt");
    let clock = ManualClock::at(8, 0);
    let transport = MockTransport::refusing(JobError::Connection("refused".into()));
    let c = controller(&transport, &clock);

    c.start(dirs.config("09:00")).unwrap();
    clock.advance(TimeDelta::hours(1));
    assert!(wait_until(|| transport.state().connects == 1));
    clock.advance(TimeDelta::days(1));
    assert!(wait_until(|| transport.state().connects == 2));
    assert!(c.is_running());
    assert_eq!(listing(&dirs.source), ["a.txt"]);
    c.stop().unwrap();
}

#[test]
fn test_no_firing_after_stop() {
    let dirs = Dirs::new("stopped");
    dirs.put("a.txt");
    let clock = ManualClock::at(8, 0);
    let transport = MockTransport::new();
    let c = controller(&transport, &clock);

    c.start(dirs.config("09:00")).unwrap();
    c.stop().unwrap();
    assert!(!c.is_running());

    clock.advance(TimeDelta::hours(2));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(transport.state().connects, 0);
    assert_eq!(listing(&dirs.source), ["a.txt"]);
}

#[test]
fn test_invalid_daily_times_are_rejected() {
    let dirs = Dirs::new("times");
    let clock = ManualClock::at(8, 0);
    let c = controller(&MockTransport::new(), &clock);
    for bad in ["24:00", "9:60", "abc", "9:5", ""] {
        assert!(
            matches!(c.start(dirs.config(bad)), Err(JobError::Validation(_))),
            "expected '{}' to be rejected",
            bad
        );
        assert!(!c.is_running());
    }
}

#[test]
fn test_blank_fields_are_rejected() {
    let dirs = Dirs::new("blank");
    let clock = ManualClock::at(8, 0);
    let c = controller(&MockTransport::new(), &clock);
    let mut cfg = dirs.config("09:00");
    cfg.remote_endpoint = String::new();
    let err = c.start(cfg).unwrap_err();
    assert!(err.to_string().contains("remote endpoint"));
    assert!(!c.is_running());
}

#[test]
fn test_restart_uses_new_configuration() {
    let dirs = Dirs::new("restart");
    dirs.put("a.txt");
    let clock = ManualClock::at(8, 0);
    let transport = MockTransport::new();
    let c = controller(&transport, &clock);

    c.start(dirs.config("12:00")).unwrap();
    c.stop().unwrap();
    c.start(dirs.config("09:00")).unwrap();
    clock.advance(TimeDelta::hours(1));
    assert!(wait_until(|| transport.state().closes == 1));
    c.stop().unwrap();
}

#[test]
fn test_panicking_run_keeps_schedule_alive() {
    let dirs = Dirs::new("panicky");
    dirs.put("a.txt");
    let clock = ManualClock::at(8, 0);
    let transport = MockTransport::new().panicking_on("a.txt");
    let c = controller(&transport, &clock);

    c.start(dirs.config("09:00")).unwrap();
    clock.advance(TimeDelta::hours(1));
    assert!(wait_until(|| transport.state().closes == 1));
    assert!(c.is_running());
    assert_eq!(listing(&dirs.source), ["a.txt"]);

    // next day the scheduler thread is still polling and fires again
    transport.state().panic_on = None;
    clock.advance(TimeDelta::days(1));
    assert!(wait_until(|| transport.state().connects == 2));
    assert!(wait_until(|| listing(&dirs.dest) == ["a.txt"]));
    assert_eq!(c.start(dirs.config("09:00")), Err(JobError::AlreadyRunning));
    c.stop().unwrap();
    assert!(!c.is_running());
}

/// Holds `connect` until released, then refuses.
struct GatedTransport {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl Transport for GatedTransport {
    fn connect(
        &self,
        target: &RemoteTarget,
        _credential: &Credential,
        _port: u16,
    ) -> Result<Box<dyn RemoteSession>, JobError> {
        let _ = self.entered.send(());
        let _ = self.release.recv_timeout(Duration::from_secs(5));
        Err(JobError::Connection(target.host.clone()))
    }
}

#[test]
fn test_status_is_immediate_while_stop_waits_for_run() {
    let dirs = Dirs::new("stopwait");
    dirs.put("a.txt");
    let clock = ManualClock::at(8, 0);
    let (entered_tx, entered_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let transport = GatedTransport { entered: entered_tx, release: release_rx };
    let c = JobController::new(Arc::new(transport))
        .with_clock(clock.clone())
        .with_poll_interval(Duration::from_millis(10));

    c.start(dirs.config("09:00")).unwrap();
    clock.advance(TimeDelta::hours(1));
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    std::thread::scope(|s| {
        let stopping = s.spawn(|| c.stop());
        assert!(wait_until(|| !c.is_running()));
        // the run is still in flight, so stop has not returned yet
        assert!(!stopping.is_finished());
        release_tx.send(()).unwrap();
        assert_eq!(stopping.join().unwrap(), Ok(()));
    });
    assert!(!c.is_running());
}
