use std::{ffi::OsString, path::PathBuf, time::Duration};

use clap::Parser;
use shock_sync::Timing;

/// Play an audio file while firing its cue track at a shock device
#[derive(Debug, Parser)]
#[command(name = "shocksync", version, about)]
pub struct Cli {
    /// Audio file to play
    pub audio: PathBuf,

    /// Cue file (defaults to the audio path with a .txt extension)
    #[arg(long)]
    pub cues: Option<PathBuf>,

    /// How often the scheduler checks the playback position
    #[arg(long, env = "SHOCK_POLL_MS", default_value_t = 20)]
    pub poll_interval_ms: u64,

    /// Give up on a device request after this long
    #[arg(long, env = "SHOCK_TIMEOUT_MS", default_value_t = 2000)]
    pub dispatch_timeout_ms: u64,

    /// Warn when a cue fires later than this
    #[arg(long, env = "SHOCK_DRIFT_MS", default_value_t = 40)]
    pub drift_tolerance_ms: u64,

    /// Play without contacting the device
    #[arg(long)]
    pub audio_only: bool,

    /// No terminal UI; log to stderr and stop on Ctrl-C
    #[arg(long)]
    pub headless: bool,

    /// Extra env file; read before the other flags, so it can also set SHOCK_*_MS
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

/// Find `--env-file` ahead of full parsing
///
/// The file has to be loaded before clap runs for its values to reach the
/// `env` fallbacks above.
pub fn env_file_arg(args: impl IntoIterator<Item = OsString>) -> Option<PathBuf> {
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if arg == "--env-file" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.to_str().and_then(|a| a.strip_prefix("--env-file=")) {
            return Some(PathBuf::from(path));
        }
    }
    None
}

impl Cli {
    pub fn timing(&self) -> Timing {
        Timing {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            dispatch_timeout: Duration::from_millis(self.dispatch_timeout_ms),
            drift_tolerance: Duration::from_millis(self.drift_tolerance_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["shocksync", "song.mp3"]).unwrap();
        assert_eq!(cli.audio, PathBuf::from("song.mp3"));
        assert!(cli.cues.is_none());
        assert!(!cli.audio_only);
    }

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_env_file_found_before_parsing() {
        assert_eq!(
            env_file_arg(os_args(&["shocksync", "song.mp3", "--env-file", "dev.env"])),
            Some(PathBuf::from("dev.env"))
        );
        assert_eq!(
            env_file_arg(os_args(&["shocksync", "--env-file=dev.env", "song.mp3"])),
            Some(PathBuf::from("dev.env"))
        );
        assert_eq!(env_file_arg(os_args(&["shocksync", "song.mp3"])), None);
        assert_eq!(env_file_arg(os_args(&["shocksync", "--", "--env-file"])), None);
    }

    #[test]
    fn test_default_flags_match_default_timing() {
        let cli = Cli::try_parse_from(["shocksync", "song.mp3"]).unwrap();
        assert_eq!(cli.timing(), Timing::default());
    }

    #[test]
    fn test_timing_from_flags() {
        let cli = Cli::try_parse_from([
            "shocksync",
            "song.mp3",
            "--poll-interval-ms",
            "20",
            "--dispatch-timeout-ms",
            "500",
        ])
        .unwrap();
        let timing = cli.timing();
        assert_eq!(timing.poll_interval, Duration::from_millis(20));
        assert_eq!(timing.dispatch_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_audio_path_required() {
        assert!(Cli::try_parse_from(["shocksync"]).is_err());
    }
}
