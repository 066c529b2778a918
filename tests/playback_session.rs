use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use shock_sync::{
    cue::CueParser, dispatch::DispatchResult, Cue, CueError, CueScheduler, CueTrack, Dispatch,
    DispatchError, DispatchWorker, ManualClock, PlaybackSession, SchedulerState, StimulusSink,
    Timing,
};
use tokio::runtime::Handle;

/// Records every dispatch as (index, timestamp)
#[derive(Clone, Default)]
struct Recorder {
    fired: Arc<Mutex<Vec<(usize, Duration)>>>,
}

impl Recorder {
    fn fired(&self) -> Vec<(usize, Duration)> {
        self.fired.lock().unwrap().clone()
    }
}

impl Dispatch for Recorder {
    fn dispatch(&mut self, index: usize, cue: &Cue) {
        self.fired.lock().unwrap().push((index, cue.timestamp));
    }
}

/// A device that never answers
struct UnreachableDevice;

#[async_trait]
impl StimulusSink for UnreachableDevice {
    async fn deliver(&self, _cue: &Cue) -> DispatchResult {
        Err(DispatchError::Network("connection refused".into()))
    }
}

/// Raises a flag when dropped
struct DropFlag {
    dropped: Arc<AtomicBool>,
}

impl Dispatch for DropFlag {
    fn dispatch(&mut self, _index: usize, _cue: &Cue) {}
}

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::Release);
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value)
}

fn track(source: &str, len: Duration) -> CueTrack {
    CueParser::new().max_timestamp(len).parse(source).unwrap()
}

fn fast_timing() -> Timing {
    Timing {
        poll_interval: Duration::from_millis(5),
        ..Timing::default()
    }
}

#[test]
fn fires_every_cue_once_in_order() {
    let cues = track(
        "00:03,vibrate,20,300\n00:01,shock,10,500\n00:02,sound,40,100\n",
        secs(5.0),
    );
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut session = PlaybackSession::new(
        cues,
        secs(5.0),
        clock.clone(),
        recorder.clone(),
        Timing::default(),
    );
    session.start();

    // Irregular polling, including repeated readings of the same position
    for ms in [0, 400, 1000, 1000, 1700, 2600, 2600, 3900, 4500, 5000] {
        clock.set(Duration::from_millis(ms));
        session.tick();
    }

    assert_eq!(session.state(), SchedulerState::Finished);
    assert_eq!(
        recorder.fired(),
        vec![(0, secs(1.0)), (1, secs(2.0)), (2, secs(3.0))]
    );
}

#[test]
fn clustered_cues_fire_between_two_polls() {
    let cues = track(
        "00:00,shock,10,100\n00:02,shock,10,100\n00:02.01,vibrate,20,100\n00:05,sound,5,100\n",
        secs(6.0),
    );
    let recorder = Recorder::default();
    let mut dispatcher = recorder.clone();
    let mut scheduler = CueScheduler::new(cues, secs(6.0));
    scheduler.start();

    // 0.05, 0.15, ... 2.05
    for step in 0..=20u32 {
        scheduler.poll(secs(0.05 + f64::from(step) * 0.1), &mut dispatcher);
    }

    let indices: Vec<usize> = recorder.fired().iter().map(|(index, _)| *index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(scheduler.index(), 3);
    assert_eq!(scheduler.state(), SchedulerState::Running);
}

#[tokio::test]
async fn failing_device_still_finishes() {
    let cues = track(
        "00:01,shock,10,100\n00:02,vibrate,20,100\n00:02.5,sound,5,100\n",
        secs(3.0),
    );
    let (worker, mut reports) =
        DispatchWorker::new(Handle::current(), UnreachableDevice, Duration::from_secs(1));
    let stats = worker.stats();

    let clock = ManualClock::new();
    let mut session =
        PlaybackSession::new(cues, secs(3.0), clock.clone(), worker, Timing::default());
    session.start();

    for ms in (0..=3000).step_by(250) {
        clock.set(Duration::from_millis(ms));
        session.tick();
    }
    assert_eq!(session.state(), SchedulerState::Finished);
    drop(session);

    // Channel closes once the worker and every delivery task are gone
    let mut failed = Vec::new();
    while let Some(report) = reports.recv().await {
        assert!(matches!(report.result, Err(DispatchError::Network(_))));
        failed.push(report.index);
    }
    failed.sort_unstable();
    assert_eq!(failed, vec![0, 1, 2]);

    let tally = stats.snapshot();
    assert_eq!(tally.sent, 3);
    assert_eq!(tally.failed, 3);
    assert_eq!(tally.succeeded, 0);
}

#[test]
fn interrupt_lands_within_one_poll_interval() {
    let cues = track("00:01,shock,10,100\n", secs(60.0));
    let clock = ManualClock::new();
    let dropped = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));

    let timing = fast_timing();
    let session = PlaybackSession::new(
        cues,
        secs(60.0),
        clock,
        DropFlag {
            dropped: Arc::clone(&dropped),
        },
        timing,
    );

    let runner = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut session = session;
            let state = session.run(&stop);
            (state, Instant::now())
        })
    };

    thread::sleep(Duration::from_millis(30));
    stop.store(true, Ordering::Release);
    let raised = Instant::now();

    let (state, returned) = runner.join().unwrap();
    assert_eq!(state, SchedulerState::Aborted);
    // Generous bound: one interval plus scheduling noise
    assert!(returned.saturating_duration_since(raised) < timing.poll_interval * 20);
    assert!(dropped.load(Ordering::Acquire));
}

#[test]
fn cues_are_not_fired_after_abort() {
    let cues = track("00:01,shock,10,100\n00:02,shock,10,100\n", secs(3.0));
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut session = PlaybackSession::new(
        cues,
        secs(3.0),
        clock.clone(),
        recorder.clone(),
        Timing::default(),
    );
    session.start();

    clock.set(secs(1.5));
    session.tick();
    session.abort();
    clock.set(secs(3.0));
    assert_eq!(session.tick(), SchedulerState::Aborted);
    assert_eq!(recorder.fired().len(), 1);
}

#[test]
fn empty_track_finishes_without_dispatching() {
    let cues = track("# nothing but comments\n\n", secs(10.0));
    assert!(cues.is_empty());

    let recorder = Recorder::default();
    let mut session = PlaybackSession::new(
        cues,
        secs(10.0),
        ManualClock::new(),
        recorder.clone(),
        Timing::default(),
    );
    assert_eq!(session.state(), SchedulerState::Idle);
    session.start();
    assert_eq!(session.state(), SchedulerState::Finished);
    assert!(recorder.fired().is_empty());
}

#[test]
fn negative_duration_rejects_the_whole_track() {
    let result = CueParser::new()
        .max_timestamp(secs(10.0))
        .parse("00:01,shock,10,100\n00:02,vibrate,20,-500\n00:03,sound,5,100\n");

    match result {
        Err(CueError::NegativeDuration { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected a negative duration error, got {other:?}"),
    }
}

#[test]
fn cue_past_the_audio_is_rejected_at_load() {
    let path = std::env::temp_dir().join(format!("shock_sync_past_end_{}.txt", std::process::id()));
    std::fs::write(&path, "00:01,shock,10,100\n00:12,shock,10,100\n").unwrap();

    let result = CueTrack::load(&path, secs(10.0));
    let _ = std::fs::remove_file(&path);

    match result {
        Err(err @ CueError::OutOfRange { line: 2, .. }) => {
            assert!(err.to_string().starts_with("line 2:"));
        }
        other => panic!("expected an out-of-range error on line 2, got {other:?}"),
    }
}
