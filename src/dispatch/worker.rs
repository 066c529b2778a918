//! Fire-and-forget delivery on a tokio runtime

use std::{sync::Arc, time::Duration};

use tokio::{
    runtime::Handle,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    time::Instant,
};

use super::{Dispatch, DispatchError, DispatchReport, DispatchStats, StimulusSink};
use crate::cue::Cue;

/// Spawns one bounded delivery task per cue
///
/// `dispatch` returns as soon as the task is spawned; the outcome arrives
/// later on the report channel returned by [`DispatchWorker::new`].
pub struct DispatchWorker {
    runtime: Handle,
    sink: Arc<dyn StimulusSink>,
    timeout: Duration,
    reports: UnboundedSender<DispatchReport>,
    stats: Arc<DispatchStats>,
}

impl DispatchWorker {
    pub fn new(
        runtime: Handle,
        sink: impl StimulusSink,
        timeout: Duration,
    ) -> (Self, UnboundedReceiver<DispatchReport>) {
        let (reports, rx) = mpsc::unbounded_channel();
        let worker = Self {
            runtime,
            sink: Arc::new(sink),
            timeout,
            reports,
            stats: Arc::new(DispatchStats::default()),
        };
        (worker, rx)
    }

    /// Shared tally, updated as deliveries complete
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }
}

impl Dispatch for DispatchWorker {
    fn dispatch(&mut self, index: usize, cue: &Cue) {
        self.stats.record_sent();

        let sink = Arc::clone(&self.sink);
        let stats = Arc::clone(&self.stats);
        let reports = self.reports.clone();
        let timeout = self.timeout;
        let cue = cue.clone();

        self.runtime.spawn(async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, sink.deliver(&cue)).await {
                Ok(result) => result,
                Err(_) => Err(DispatchError::Timeout(timeout)),
            };
            stats.record(&result);

            // Receiver gone means the session is shutting down; nothing to log to.
            let _ = reports.send(DispatchReport {
                index,
                cue,
                result,
                latency: started.elapsed(),
            });
        });
    }
}

/// Drain reports into the log until every sender is dropped
pub async fn log_reports(mut rx: UnboundedReceiver<DispatchReport>) {
    while let Some(report) = rx.recv().await {
        report.log();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cue::{CueKind, Intensity},
        dispatch::DispatchResult,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn cue(ms: u64) -> Cue {
        Cue::new(
            Duration::from_millis(ms),
            CueKind::Shock,
            Intensity::new(5).unwrap(),
            Duration::from_millis(300),
        )
    }

    struct FailingSink;

    #[async_trait]
    impl StimulusSink for FailingSink {
        async fn deliver(&self, _cue: &Cue) -> DispatchResult {
            Err(DispatchError::Network("connection refused".into()))
        }
    }

    struct SlowSink;

    #[async_trait]
    impl StimulusSink for SlowSink {
        async fn deliver(&self, _cue: &Cue) -> DispatchResult {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct RecordingSink {
        seen: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl StimulusSink for RecordingSink {
        async fn deliver(&self, cue: &Cue) -> DispatchResult {
            self.seen.lock().unwrap().push(cue.timestamp);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failures_become_reports() {
        let (mut worker, mut rx) =
            DispatchWorker::new(Handle::current(), FailingSink, Duration::from_secs(1));

        worker.dispatch(0, &cue(0));
        worker.dispatch(1, &cue(10));

        let mut indices = Vec::new();
        for _ in 0..2 {
            let report = rx.recv().await.unwrap();
            assert!(matches!(report.result, Err(DispatchError::Network(_))));
            indices.push(report.index);
        }
        indices.sort();
        assert_eq!(indices, vec![0, 1]);

        let tally = worker.stats().snapshot();
        assert_eq!(tally.sent, 2);
        assert_eq!(tally.failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_device_times_out() {
        let timeout = Duration::from_millis(200);
        let (mut worker, mut rx) = DispatchWorker::new(Handle::current(), SlowSink, timeout);

        worker.dispatch(3, &cue(0));

        let report = rx.recv().await.unwrap();
        assert_eq!(report.index, 3);
        assert_eq!(report.result, Err(DispatchError::Timeout(timeout)));
        assert!(report.latency >= timeout);
    }

    #[tokio::test]
    async fn test_dispatch_does_not_wait_for_delivery() {
        let (mut worker, _rx) =
            DispatchWorker::new(Handle::current(), SlowSink, Duration::from_secs(60));

        let started = std::time::Instant::now();
        for i in 0..10 {
            worker.dispatch(i, &cue(i as u64));
        }
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(worker.stats().snapshot().in_flight(), 10);
    }

    #[tokio::test]
    async fn test_successful_delivery_reaches_sink() {
        let sink = RecordingSink::default();
        let (mut worker, mut rx) =
            DispatchWorker::new(Handle::current(), sink.clone(), Duration::from_secs(1));
        worker.dispatch(0, &cue(1500));

        let report = rx.recv().await.unwrap();
        assert!(report.result.is_ok());
        assert_eq!(sink.seen.lock().unwrap().as_slice(), &[Duration::from_millis(1500)]);
        assert_eq!(worker.stats().snapshot().succeeded, 1);
    }
}
