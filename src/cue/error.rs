use std::{path::PathBuf, time::Duration};

use thiserror::Error;

/// Reasons a cue file can fail to load.
///
/// Line numbers are 1-based and refer to the source file as written.
#[derive(Debug, Error)]
pub enum CueError {
    #[error("failed to read cue file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected 4 comma-separated fields (timestamp,kind,intensity,duration), found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: invalid timestamp {value:?} (expected MM:SS, HH:MM:SS, optionally with .fff)")]
    InvalidTimestamp { line: usize, value: String },

    #[error("line {line}: unknown cue kind {value:?} (expected shock, vibrate, sound or stop)")]
    UnknownKind { line: usize, value: String },

    #[error("line {line}: invalid intensity {value:?} (expected an integer 0..=100)")]
    InvalidIntensity { line: usize, value: String },

    #[error("line {line}: invalid duration {value:?} (expected milliseconds as a positive integer)")]
    InvalidDuration { line: usize, value: String },

    #[error("line {line}: negative duration {value:?}")]
    NegativeDuration { line: usize, value: String },

    #[error("line {line}: duration must be between 1 and {max_ms} ms, got {value_ms} ms")]
    DurationOutOfRange { line: usize, value_ms: u64, max_ms: u64 },

    #[error("line {line}: cue at {timestamp:?} is past the end of the audio ({track_len:?})")]
    OutOfRange {
        line: usize,
        timestamp: Duration,
        track_len: Duration,
    },
}
