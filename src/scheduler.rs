//! Cue scheduler - fires each cue once, in order, as the audio reaches it
//!
//! ```text
//!            start()                 index == len && elapsed >= track end
//!   Idle ─────────────▶ Running ───────────────────────────────────────▶ Finished
//!     │  (empty track)     │
//!     └────────────────────┼──────────────────────────────────────────▶ Finished
//!                          │ abort()
//!                          └───────────────────────────────────────────▶ Aborted
//! ```
//!
//! Each `poll` compares the clock reading against the cue under the index
//! and keeps dispatching while cues are due. A single poll can fire several
//! cues, so cues packed tighter than the poll interval are never skipped.
//! The index only moves forward, which is what makes every cue fire at most
//! once no matter how the polls land.

use std::time::Duration;

use crate::{
    config::DEFAULT_DRIFT_TOLERANCE,
    cue::{format_timestamp, Cue, CueTrack},
    dispatch::Dispatch,
};

/// Lifecycle of a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Finished,
    Aborted,
}

impl SchedulerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SchedulerState::Finished | SchedulerState::Aborted)
    }

    pub fn label(self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Finished => "finished",
            SchedulerState::Aborted => "aborted",
        }
    }
}

/// Walks a cue track against elapsed playback time
pub struct CueScheduler {
    track: CueTrack,
    /// Length of the audio the track belongs to
    track_end: Duration,
    /// Next cue to fire
    index: usize,
    state: SchedulerState,
    drift_tolerance: Duration,
    /// Cues fired past the drift tolerance
    late: usize,
}

impl CueScheduler {
    pub fn new(track: CueTrack, track_end: Duration) -> Self {
        Self {
            track,
            track_end,
            index: 0,
            state: SchedulerState::Idle,
            drift_tolerance: DEFAULT_DRIFT_TOLERANCE,
            late: 0,
        }
    }

    /// How far past its timestamp a cue may fire before it is reported late
    pub fn with_drift_tolerance(mut self, tolerance: Duration) -> Self {
        self.drift_tolerance = tolerance;
        self
    }

    /// Begin playback. An empty track finishes immediately.
    pub fn start(&mut self) {
        if self.state != SchedulerState::Idle {
            return;
        }

        if self.track.is_empty() {
            tracing::info!("no cues for this track, playing audio only");
            self.state = SchedulerState::Finished;
        } else {
            tracing::info!(cues = self.track.len(), "cue scheduler running");
            self.state = SchedulerState::Running;
        }
    }

    /// Fire every cue due at `elapsed`; returns how many fired
    pub fn poll<D: Dispatch + ?Sized>(&mut self, elapsed: Duration, dispatcher: &mut D) -> usize {
        if self.state != SchedulerState::Running {
            return 0;
        }

        let mut fired = 0;
        while let Some(cue) = self.track.get(self.index) {
            if cue.timestamp > elapsed {
                break;
            }

            let lateness = elapsed - cue.timestamp;
            if lateness > self.drift_tolerance {
                self.late += 1;
                tracing::warn!(
                    index = self.index,
                    cue_at = %format_timestamp(cue.timestamp),
                    late_ms = lateness.as_millis() as u64,
                    "cue fired late"
                );
            }

            tracing::info!(
                index = self.index,
                elapsed_ms = elapsed.as_millis() as u64,
                cue = %cue,
                "triggering cue"
            );
            dispatcher.dispatch(self.index, cue);
            self.index += 1;
            fired += 1;
        }

        if self.index >= self.track.len() && elapsed >= self.track_end {
            tracing::info!(late = self.late, "all cues dispatched");
            self.state = SchedulerState::Finished;
        }

        fired
    }

    /// Stop dispatching. Deliveries already in flight are left alone.
    pub fn abort(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        tracing::info!(
            dispatched = self.index,
            remaining = self.track.len() - self.index,
            "cue scheduler aborted"
        );
        self.state = SchedulerState::Aborted;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Index of the next cue to fire (== number fired so far)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn next_cue(&self) -> Option<&Cue> {
        self.track.get(self.index)
    }

    pub fn track(&self) -> &CueTrack {
        &self.track
    }

    pub fn track_end(&self) -> Duration {
        self.track_end
    }

    /// Cues that fired later than the drift tolerance
    pub fn late_count(&self) -> usize {
        self.late
    }
}
