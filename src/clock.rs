//! Playback clocks - where are we in the track?
//!
//! The scheduler never looks at wall-clock time. It asks a [`PlaybackClock`]
//! for the audio-relative position, and the production clock derives that
//! position from the number of frames the audio callback has actually handed
//! to the device. Buffering, pauses and codec delay therefore cannot make the
//! two drift apart the way `Instant::now() - start` would.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

/// Audio-relative elapsed time since playback started
///
/// Implementations must be monotonically non-decreasing for the life of a
/// session and report zero before audio starts.
pub trait PlaybackClock {
    fn elapsed(&self) -> Duration;
}

impl<C: PlaybackClock + ?Sized> PlaybackClock for &C {
    fn elapsed(&self) -> Duration {
        (**self).elapsed()
    }
}

impl<C: PlaybackClock + ?Sized> PlaybackClock for Arc<C> {
    fn elapsed(&self) -> Duration {
        (**self).elapsed()
    }
}

/// Clock driven by frames written to the output device
///
/// Cloning is cheap; all clones share one counter. The audio callback calls
/// [`FrameClock::advance`], everything else only reads.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl FrameClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Record `frames` more frames as played. Realtime-safe.
    pub fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Release);
    }

    /// Total frames played so far
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl PlaybackClock for FrameClock {
    fn elapsed(&self) -> Duration {
        let frames = self.frames();
        let rate = self.sample_rate as u64;
        let secs = frames / rate;
        let nanos = (frames % rate) * 1_000_000_000 / rate;
        Duration::new(secs, nanos as u32)
    }
}

/// Hand-driven clock for tests and offline runs
///
/// Setting a position earlier than the current one is ignored so the clock
/// stays monotonic.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, position: Duration) {
        self.micros
            .fetch_max(position.as_micros() as u64, Ordering::AcqRel);
    }

    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(by.as_micros() as u64, Ordering::AcqRel);
    }
}

impl PlaybackClock for ManualClock {
    fn elapsed(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_clock_starts_at_zero() {
        let clock = FrameClock::new(48_000);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_frame_clock_converts_frames_to_time() {
        let clock = FrameClock::new(48_000);
        clock.advance(48_000);
        assert_eq!(clock.elapsed(), Duration::from_secs(1));

        clock.advance(24_000);
        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn test_frame_clock_clones_share_position() {
        let audio_side = FrameClock::new(44_100);
        let reader = audio_side.clone();
        audio_side.advance(441);
        assert_eq!(reader.elapsed(), Duration::from_millis(10));
    }

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(3));
        clock.set(Duration::from_secs(1));
        assert_eq!(clock.elapsed(), Duration::from_secs(3));

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.elapsed(), Duration::from_millis(3250));
    }
}
