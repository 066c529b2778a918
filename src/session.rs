//! Playback session - one scheduler, one clock, one dispatcher

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use crate::{
    clock::PlaybackClock,
    config::Timing,
    cue::CueTrack,
    dispatch::Dispatch,
    scheduler::{CueScheduler, SchedulerState},
};

/// Aggregate that lives for exactly one playback
///
/// The session is the only owner of the scheduler, so the cue index has a
/// single writer. Dropping the session drops the dispatcher and the clock
/// handle with it.
pub struct PlaybackSession<C, D> {
    scheduler: CueScheduler,
    clock: C,
    dispatcher: D,
    poll_interval: Duration,
}

impl<C: PlaybackClock, D: Dispatch> PlaybackSession<C, D> {
    pub fn new(track: CueTrack, track_end: Duration, clock: C, dispatcher: D, timing: Timing) -> Self {
        let scheduler =
            CueScheduler::new(track, track_end).with_drift_tolerance(timing.drift_tolerance);
        Self {
            scheduler,
            clock,
            dispatcher,
            poll_interval: timing.poll_interval,
        }
    }

    pub fn start(&mut self) {
        self.scheduler.start();
    }

    /// Read the clock once and fire whatever is due
    pub fn tick(&mut self) -> SchedulerState {
        self.advance(false)
    }

    /// Like [`tick`](Self::tick), for a caller that knows whether the audio
    /// has run out
    ///
    /// Read `audio_ended` before calling. Once the last sample is out, the
    /// position is the end of the track, so every remaining cue fires and the
    /// scheduler finishes even if the clock reading trails the decoded length.
    pub fn advance(&mut self, audio_ended: bool) -> SchedulerState {
        let mut elapsed = self.clock.elapsed();
        if audio_ended {
            elapsed = elapsed.max(self.scheduler.track_end());
        }
        self.scheduler.poll(elapsed, &mut self.dispatcher);
        self.scheduler.state()
    }

    pub fn abort(&mut self) {
        self.scheduler.abort();
    }

    /// Poll on the session's interval until the scheduler finishes or `stop`
    /// is raised
    ///
    /// `stop` is checked once per interval, so an interrupt lands within one
    /// poll interval.
    pub fn run(&mut self, stop: &AtomicBool) -> SchedulerState {
        self.start();
        loop {
            if stop.load(Ordering::Acquire) {
                self.abort();
                return self.scheduler.state();
            }

            let state = self.tick();
            if state.is_terminal() {
                return state;
            }

            std::thread::sleep(self.poll_interval);
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn scheduler(&self) -> &CueScheduler {
        &self.scheduler
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// End the session and hand back the dispatcher
    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }
}
