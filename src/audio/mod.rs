//! Audio file decoding and device output

pub mod converter;
pub mod decoder;
pub mod output;

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

pub use decoder::decode_file;
pub use output::AudioOutput;

/// Fully decoded audio, interleaved f32
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> u64 {
        (self.samples.len() / self.channels.max(1) as usize) as u64
    }

    pub fn duration(&self) -> Duration {
        let rate = self.sample_rate.max(1) as u64;
        let frames = self.frames();
        Duration::new(frames / rate, ((frames % rate) * 1_000_000_000 / rate) as u32)
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported audio format: {0}")]
    Unsupported(String),

    #[error("no playable audio track in {0}")]
    NoTrack(PathBuf),

    #[error("decoded no samples from {0}")]
    Empty(PathBuf),

    #[error("no default output device available")]
    NoOutputDevice,

    #[error("failed to fetch default output config: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unsupported output sample format {0:?}")]
    SampleFormat(cpal::SampleFormat),
}
