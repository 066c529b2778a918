//! Stimulus dispatch - turning a due cue into one device request
//!
//! The scheduler only sees the [`Dispatch`] trait, which must return
//! immediately. [`DispatchWorker`] satisfies that by pushing each delivery
//! onto a tokio runtime with a bounded timeout and reporting the outcome over
//! a channel. The network side lives behind [`StimulusSink`].
//!
//! Nothing in here is fatal. A failed delivery becomes a [`DispatchReport`]
//! carrying a [`DispatchError`], gets logged, and playback carries on.

mod openshock;
mod worker;

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::cue::Cue;

pub use openshock::{ControlRequest, OpenShockSink};
pub use worker::{log_reports, DispatchWorker};

/// Scheduler-facing dispatch seam
///
/// Called once per due cue, from the polling loop. Implementations must not
/// block on the device.
pub trait Dispatch {
    fn dispatch(&mut self, index: usize, cue: &Cue);
}

impl<D: Dispatch + ?Sized> Dispatch for &mut D {
    fn dispatch(&mut self, index: usize, cue: &Cue) {
        (**self).dispatch(index, cue)
    }
}

impl<D: Dispatch + ?Sized> Dispatch for Box<D> {
    fn dispatch(&mut self, index: usize, cue: &Cue) {
        (**self).dispatch(index, cue)
    }
}

/// Something that can deliver one stimulus to a device
#[async_trait]
pub trait StimulusSink: Send + Sync + 'static {
    async fn deliver(&self, cue: &Cue) -> DispatchResult;
}

/// Outcome of one delivery
pub type DispatchResult = Result<(), DispatchError>;

/// Why a single delivery failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("device request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("device service rejected the API token (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("device service rejected the request as malformed (HTTP {status}): {body}")]
    MalformedRequest { status: u16, body: String },

    #[error("device service returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unreadable response from device service: {0}")]
    MalformedResponse(String),
}

/// What happened to one dispatched cue
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Position of the cue in its track
    pub index: usize,
    pub cue: Cue,
    pub result: DispatchResult,
    /// Time from spawn to completion (or timeout)
    pub latency: Duration,
}

impl DispatchReport {
    /// Emit this report through `tracing`
    pub fn log(&self) {
        let latency_ms = self.latency.as_millis() as u64;
        match &self.result {
            Ok(()) => tracing::info!(
                index = self.index,
                kind = %self.cue.kind,
                intensity = self.cue.intensity.get(),
                duration_ms = self.cue.duration.as_millis() as u64,
                latency_ms,
                "stimulus delivered"
            ),
            Err(DispatchError::Unauthorized { status }) => tracing::error!(
                index = self.index,
                status,
                "device service rejected credentials; check SHOCK_API_KEY"
            ),
            Err(err) => tracing::warn!(
                index = self.index,
                kind = %self.cue.kind,
                latency_ms,
                error = %err,
                "stimulus delivery failed"
            ),
        }
    }
}

/// Running tally of deliveries, shared with the status display
#[derive(Debug, Default)]
pub struct DispatchStats {
    sent: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchTally {
    pub sent: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl DispatchTally {
    /// Deliveries still waiting on the device
    pub fn in_flight(&self) -> u64 {
        self.sent.saturating_sub(self.succeeded + self.failed)
    }
}

impl DispatchStats {
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, result: &DispatchResult) {
        let counter = if result.is_ok() {
            &self.succeeded
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchTally {
        DispatchTally {
            sent: self.sent.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Sink used when playing without a device: logs and succeeds
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioOnlySink;

#[async_trait]
impl StimulusSink for AudioOnlySink {
    async fn deliver(&self, cue: &Cue) -> DispatchResult {
        tracing::info!(cue = %cue, "audio-only mode, skipping stimulus");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_tally() {
        let stats = DispatchStats::default();
        stats.record_sent();
        stats.record_sent();
        stats.record_sent();
        stats.record(&Ok(()));
        stats.record(&Err(DispatchError::Timeout(Duration::from_secs(1))));

        let tally = stats.snapshot();
        assert_eq!(tally.sent, 3);
        assert_eq!(tally.succeeded, 1);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.in_flight(), 1);
    }

    #[test]
    fn test_error_messages_name_the_status() {
        let err = DispatchError::Rejected {
            status: 503,
            body: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "device service returned HTTP 503: maintenance");
    }
}
