//! Cue tracks - timestamped stimulus instructions for one audio file
//!
//! A cue track plays the role a subtitle track plays for video: a sorted list
//! of moments in the audio, each paired with something to do at that moment.

mod error;
mod parser;

use std::{fmt, path::Path, str::FromStr, time::Duration};

use serde::Serialize;

pub use error::CueError;
pub use parser::{format_timestamp, CueParser};

/// Longest stimulus the device service accepts.
pub const MAX_CUE_DURATION: Duration = Duration::from_millis(30_000);

/// The action a cue asks the device to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CueKind {
    Shock,
    Vibrate,
    Sound,
    Stop,
}

impl CueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CueKind::Shock => "Shock",
            CueKind::Vibrate => "Vibrate",
            CueKind::Sound => "Sound",
            CueKind::Stop => "Stop",
        }
    }
}

impl fmt::Display for CueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CueKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shock" => Ok(CueKind::Shock),
            "vibrate" | "vibration" => Ok(CueKind::Vibrate),
            "sound" | "beep" => Ok(CueKind::Sound),
            "stop" => Ok(CueKind::Stop),
            _ => Err(()),
        }
    }
}

/// Stimulus strength, 0-100 inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Intensity(u8);

impl Intensity {
    pub const MAX: u8 = 100;

    /// Returns `None` when `value` is above [`Intensity::MAX`].
    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// A single timestamped stimulus instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// Offset from the start of the audio
    pub timestamp: Duration,
    /// How strong the stimulus is
    pub intensity: Intensity,
    /// How long the device holds the stimulus
    pub duration: Duration,
    /// What the device does
    pub kind: CueKind,
}

impl Cue {
    pub fn new(timestamp: Duration, kind: CueKind, intensity: Intensity, duration: Duration) -> Self {
        Self {
            timestamp,
            intensity,
            duration,
            kind,
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} for {}ms",
            format_timestamp(self.timestamp),
            self.kind,
            self.intensity.get(),
            self.duration.as_millis()
        )
    }
}

/// An ordered, immutable list of cues
///
/// Cues are kept sorted by timestamp. Cues sharing a timestamp keep the order
/// they were authored in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueTrack {
    cues: Vec<Cue>,
}

impl CueTrack {
    /// Build a track from cues in any order
    pub fn from_cues(mut cues: Vec<Cue>) -> Self {
        cues.sort_by_key(|cue| cue.timestamp);
        Self { cues }
    }

    /// Load and validate a cue file for audio of length `track_len`
    pub fn load(path: impl AsRef<Path>, track_len: Duration) -> Result<Self, CueError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| CueError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        CueParser::new().max_timestamp(track_len).parse(&source)
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cue> {
        self.cues.iter()
    }

    /// Timestamp of the last cue, if any
    pub fn last_timestamp(&self) -> Option<Duration> {
        self.cues.last().map(|cue| cue.timestamp)
    }
}

/// Default cue file location for an audio file: same path, `.txt` extension
pub fn cue_path_for(audio_path: &Path) -> std::path::PathBuf {
    audio_path.with_extension("txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue_at(ms: u64) -> Cue {
        Cue::new(
            Duration::from_millis(ms),
            CueKind::Vibrate,
            Intensity::new(10).unwrap(),
            Duration::from_millis(300),
        )
    }

    #[test]
    fn test_from_cues_sorts_by_timestamp() {
        let track = CueTrack::from_cues(vec![cue_at(5000), cue_at(0), cue_at(2000)]);
        let stamps: Vec<_> = track.iter().map(|c| c.timestamp.as_millis()).collect();
        assert_eq!(stamps, vec![0, 2000, 5000]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_timestamps() {
        let mut a = cue_at(1000);
        a.kind = CueKind::Shock;
        let b = cue_at(1000);
        let track = CueTrack::from_cues(vec![a.clone(), b.clone()]);
        assert_eq!(track.cues(), &[a, b]);
    }

    #[test]
    fn test_intensity_bounds() {
        assert!(Intensity::new(0).is_some());
        assert!(Intensity::new(100).is_some());
        assert!(Intensity::new(101).is_none());
    }

    #[test]
    fn test_kind_from_str_is_case_insensitive() {
        assert_eq!("SHOCK".parse::<CueKind>(), Ok(CueKind::Shock));
        assert_eq!(" vibrate ".parse::<CueKind>(), Ok(CueKind::Vibrate));
        assert!("zap".parse::<CueKind>().is_err());
    }

    #[test]
    fn test_cue_path_for_swaps_extension() {
        let path = cue_path_for(Path::new("/music/rain.mp3"));
        assert_eq!(path, Path::new("/music/rain.txt"));
    }
}
