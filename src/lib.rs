//! Play an audio file and fire timed stimulus cues at a networked device.
//!
//! The pieces, leaf first:
//!
//! - [`cue`]: cue tracks and the cue file format
//! - [`clock`]: audio-relative playback clocks
//! - [`dispatch`]: delivering one cue to the device without blocking
//! - [`scheduler`]: firing each cue once, in order, as the audio reaches it
//! - [`session`]: one playback's scheduler, clock and dispatcher together
//! - [`audio`]: decoding the file and feeding the output device

pub mod audio;
pub mod clock;
pub mod config;
pub mod cue;
pub mod dispatch;
pub mod scheduler;
pub mod session;

pub use clock::{FrameClock, ManualClock, PlaybackClock};
pub use config::{DeviceSettings, Settings, Timing};
pub use cue::{Cue, CueError, CueKind, CueTrack, Intensity};
pub use dispatch::{Dispatch, DispatchError, DispatchReport, DispatchWorker, StimulusSink};
pub use scheduler::{CueScheduler, SchedulerState};
pub use session::PlaybackSession;
