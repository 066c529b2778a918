//! cpal output stream for a decoded file
//!
//! The audio callback owns the sample data and a cursor into it. Everything
//! the control thread needs crosses over through atomics (pause, finished,
//! the frame clock) or the scope ring buffer, so the callback never locks.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, SampleFormat, SizedSample,
};
use rtrb::{Consumer, Producer, RingBuffer};

use super::{converter, AudioError, DecodedAudio};
use crate::clock::FrameClock;

/// Samples kept for the oscilloscope view
const SCOPE_BUFFER_SIZE: usize = 8192;

/// Flags shared between the audio callback and the control thread
#[derive(Debug, Default)]
struct PlaybackFlags {
    paused: AtomicBool,
    finished: AtomicBool,
}

/// A playing output stream. Dropping it stops playback.
pub struct AudioOutput {
    stream: cpal::Stream,
    flags: Arc<PlaybackFlags>,
    clock: FrameClock,
    scope: Option<Consumer<f32>>,
    duration: Duration,
    channels: u16,
}

impl AudioOutput {
    /// Open the default output device and start playing `audio`
    pub fn start(audio: &DecodedAudio) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let supported = device.default_output_config()?;

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels;
        let sample_rate = config.sample_rate.0;

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            channels,
            format = ?sample_format,
            "opening output stream"
        );

        let samples = converter::adapt(audio, channels, sample_rate);
        let flags = Arc::new(PlaybackFlags::default());
        let clock = FrameClock::new(sample_rate);
        let (producer, consumer) = RingBuffer::new(SCOPE_BUFFER_SIZE);

        let feed = Feed {
            samples,
            cursor: 0,
            channels: channels as usize,
            flags: Arc::clone(&flags),
            clock: clock.clone(),
            scope: producer,
        };

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, feed)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, feed)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, feed)?,
            SampleFormat::I32 => build_stream::<i32>(&device, &config, feed)?,
            other => return Err(AudioError::SampleFormat(other)),
        };
        stream.play()?;

        Ok(Self {
            stream,
            flags,
            clock,
            scope: Some(consumer),
            duration: audio.duration(),
            channels,
        })
    }

    /// Clock that follows frames actually handed to the device
    pub fn clock(&self) -> FrameClock {
        self.clock.clone()
    }

    pub fn pause(&self) {
        self.flags.paused.store(true, Ordering::Release);
        if let Err(err) = self.stream.pause() {
            // Silence from the callback still holds the clock still
            tracing::debug!(error = %err, "device pause unsupported");
        }
    }

    pub fn resume(&self) {
        if let Err(err) = self.stream.play() {
            tracing::warn!(error = %err, "failed to resume output stream");
        }
        self.flags.paused.store(false, Ordering::Release);
    }

    /// Flip pause state; returns true if now paused
    pub fn toggle_pause(&self) -> bool {
        if self.is_paused() {
            self.resume();
            false
        } else {
            self.pause();
            true
        }
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::Acquire)
    }

    /// Every sample has been written to the device
    pub fn is_finished(&self) -> bool {
        self.flags.finished.load(Ordering::Acquire)
    }

    /// Length of the file being played
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Mono samples for visualization. Only the first caller gets it.
    pub fn take_scope(&mut self) -> Option<Consumer<f32>> {
        self.scope.take()
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        tracing::debug!(
            position_secs = self.clock.frames() as f64 / self.clock.sample_rate() as f64,
            "closing output stream"
        );
    }
}

/// State moved into the audio callback
struct Feed {
    samples: Vec<f32>,
    /// Next sample index (interleaved)
    cursor: usize,
    channels: usize,
    flags: Arc<PlaybackFlags>,
    clock: FrameClock,
    scope: Producer<f32>,
}

impl Feed {
    /// Fill one device buffer. Returns frames taken from the file.
    fn fill<T: SizedSample + FromSample<f32>>(&mut self, data: &mut [T]) -> u64 {
        if self.flags.paused.load(Ordering::Acquire) || self.flags.finished.load(Ordering::Acquire) {
            data.fill(T::EQUILIBRIUM);
            return 0;
        }

        let available = self.samples.len() - self.cursor;
        let take = available.min(data.len()) / self.channels * self.channels;
        let (head, tail) = data.split_at_mut(take);

        for (out, &sample) in head.iter_mut().zip(&self.samples[self.cursor..self.cursor + take]) {
            *out = T::from_sample(sample);
        }
        tail.fill(T::EQUILIBRIUM);

        for frame in self.samples[self.cursor..self.cursor + take].chunks_exact(self.channels) {
            let mono = frame.iter().sum::<f32>() / self.channels as f32;
            // Drop scope samples when the UI falls behind
            let _ = self.scope.push(mono);
        }

        self.cursor += take;
        let frames = (take / self.channels) as u64;
        self.clock.advance(frames);

        if self.samples.len() - self.cursor < self.channels {
            self.flags.finished.store(true, Ordering::Release);
        }

        frames
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut feed: Feed,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            feed.fill(data);
        },
        |err| tracing::error!(error = %err, "audio stream error"),
        None,
    )?;
    Ok(stream)
}
