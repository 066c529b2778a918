//! Static track description, built once before the UI loop starts

use std::time::Duration;

use shock_sync::cue::{Cue, CueKind, CueTrack};

/// What the timeline needs to know about the track (never changes)
#[derive(Clone)]
pub struct TrackOverview {
    /// File name shown in the title
    pub title: String,
    /// Audio length
    pub duration: Duration,
    /// (timestamp, kind) per cue, in track order
    pub marks: Vec<(Duration, CueKind)>,
    /// Full cues, for the "next cue" line
    pub cues: Vec<Cue>,
}

impl TrackOverview {
    pub fn new(title: String, track: &CueTrack, duration: Duration) -> Self {
        Self {
            title,
            duration,
            marks: track.iter().map(|cue| (cue.timestamp, cue.kind)).collect(),
            cues: track.cues().to_vec(),
        }
    }
}
