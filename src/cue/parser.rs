//! Cue file parser
//!
//! One cue per line:
//!
//! ```text
//! # timestamp, kind, intensity, duration (ms)
//! 00:05,Vibrate,20,1000
//! 01:02.500,Shock,15,300
//! 1:00:00,Sound,50,500
//! ```
//!
//! Blank lines and `#` comments are skipped. Anything else that does not
//! parse is an error; a half-loaded track is worse than none.

use std::time::Duration;

use super::{Cue, CueError, CueKind, CueTrack, Intensity, MAX_CUE_DURATION};

/// Builder-style parser for cue files
#[derive(Debug, Clone, Default)]
pub struct CueParser {
    max_timestamp: Option<Duration>,
}

impl CueParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject cues whose timestamp lies past `len` (the audio length)
    pub fn max_timestamp(mut self, len: Duration) -> Self {
        self.max_timestamp = Some(len);
        self
    }

    /// Parse a whole cue file into a sorted track
    pub fn parse(&self, source: &str) -> Result<CueTrack, CueError> {
        let mut cues = Vec::new();

        for (idx, raw) in source.lines().enumerate() {
            let line = idx + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let cue = self.parse_line(line, text)?;
            cues.push(cue);
        }

        Ok(CueTrack::from_cues(cues))
    }

    fn parse_line(&self, line: usize, text: &str) -> Result<Cue, CueError> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        let [timestamp, kind, intensity, duration] = fields[..] else {
            return Err(CueError::FieldCount {
                line,
                found: fields.len(),
            });
        };

        let timestamp = parse_timestamp(timestamp).ok_or_else(|| CueError::InvalidTimestamp {
            line,
            value: timestamp.to_string(),
        })?;

        if let Some(track_len) = self.max_timestamp {
            if timestamp > track_len {
                return Err(CueError::OutOfRange {
                    line,
                    timestamp,
                    track_len,
                });
            }
        }

        let kind = kind.parse::<CueKind>().map_err(|_| CueError::UnknownKind {
            line,
            value: kind.to_string(),
        })?;

        let intensity = intensity
            .parse::<u8>()
            .ok()
            .and_then(Intensity::new)
            .ok_or_else(|| CueError::InvalidIntensity {
                line,
                value: intensity.to_string(),
            })?;

        let duration = parse_duration_ms(line, duration)?;

        Ok(Cue::new(timestamp, kind, intensity, duration))
    }
}

fn parse_duration_ms(line: usize, value: &str) -> Result<Duration, CueError> {
    if value.starts_with('-') {
        return Err(CueError::NegativeDuration {
            line,
            value: value.to_string(),
        });
    }

    let ms = value.parse::<u64>().map_err(|_| CueError::InvalidDuration {
        line,
        value: value.to_string(),
    })?;

    let duration = Duration::from_millis(ms);
    if ms == 0 || duration > MAX_CUE_DURATION {
        return Err(CueError::DurationOutOfRange {
            line,
            value_ms: ms,
            max_ms: MAX_CUE_DURATION.as_millis() as u64,
        });
    }

    Ok(duration)
}

/// Parse `MM:SS`, `HH:MM:SS`, either optionally followed by `.fraction`
fn parse_timestamp(value: &str) -> Option<Duration> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (value, None),
    };

    let parts: Vec<&str> = whole.split(':').collect();
    let (hours, minutes, seconds) = match parts[..] {
        [m, s] => (0, parse_digits(m)?, parse_digits(s)?),
        [h, m, s] => {
            let minutes = parse_digits(m)?;
            if minutes >= 60 {
                return None;
            }
            (parse_digits(h)?, minutes, parse_digits(s)?)
        }
        _ => return None,
    };

    if seconds >= 60 {
        return None;
    }

    let nanos = match fraction {
        Some(digits) => parse_fraction_nanos(digits)?,
        None => 0,
    };

    let secs = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    Some(Duration::new(secs, nanos))
}

fn parse_digits(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn parse_fraction_nanos(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = digits.parse().ok()?;
    Some(value * 10u32.pow(9 - digits.len() as u32))
}

/// Format a track position as `MM:SS` (or `H:MM:SS` past an hour)
pub fn format_timestamp(position: Duration) -> String {
    let total = position.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
