//! Player - wires audio, cue track and dispatch together and drives them

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use shock_sync::{
    audio::{decode_file, AudioOutput, DecodedAudio},
    clock::{FrameClock, PlaybackClock},
    config::{DeviceSettings, Settings, Timing},
    cue::{cue_path_for, CueTrack},
    dispatch::{
        log_reports, AudioOnlySink, DispatchReport, DispatchStats, DispatchTally, DispatchWorker,
        OpenShockSink,
    },
    PlaybackSession, SchedulerState,
};
use tokio::{runtime::Runtime, sync::mpsc::UnboundedReceiver};

use super::{cli::Cli, ui};

/// How a playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Audio played to the end
    Completed,
    /// User stopped playback
    Interrupted,
}

/// Validate everything, play, and clean up
///
/// All startup failures surface here as errors before any audio is played.
pub fn run(cli: Cli) -> EyreResult<Outcome> {
    if let Some(path) = &cli.env_file {
        tracing::info!(path = %path.display(), "using env file");
    }

    let timing = cli.timing().validate()?;
    let device = if cli.audio_only {
        tracing::warn!("audio-only mode, no stimuli will be sent");
        None
    } else {
        let device = DeviceSettings::from_env()
            .wrap_err("device configuration missing (pass --audio-only to play without a device)")?;
        tracing::info!(
            api_key = %device.api_key,
            device_id = %device.device_id,
            endpoint = %device.endpoint,
            "loaded device settings"
        );
        Some(device)
    };
    let settings = Settings { device, timing };

    let audio = decode_file(&cli.audio)
        .wrap_err_with(|| format!("cannot play {}", cli.audio.display()))?;
    let track = load_track(&cli, audio.duration())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("shocksync-dispatch")
        .enable_all()
        .build()
        .wrap_err("failed to start dispatch runtime")?;

    let (worker, reports) = build_worker(&runtime, &settings)?;
    let logger = runtime.spawn(log_reports(reports));

    let title = cli
        .audio
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.audio.display().to_string());

    let mut player = Player::start(&audio, track, worker, settings.timing)?;
    drop(audio);

    let outcome = if cli.headless {
        run_headless(&mut player, &runtime)
    } else {
        ui::run(&mut player, title)?
    };

    let tally = player.finish();
    tracing::info!(
        sent = tally.sent,
        succeeded = tally.succeeded,
        failed = tally.failed,
        "session summary"
    );

    // In-flight deliveries finish or time out on their own; wait at most one timeout
    let timeout = settings.timing.dispatch_timeout;
    runtime.block_on(async {
        if tokio::time::timeout(timeout, logger).await.is_err() {
            tracing::warn!("deliveries still pending at exit");
        }
    });
    runtime.shutdown_timeout(timeout);

    Ok(outcome)
}

fn load_track(cli: &Cli, track_len: Duration) -> EyreResult<CueTrack> {
    let (path, explicit) = match &cli.cues {
        Some(path) => (path.clone(), true),
        None => (cue_path_for(&cli.audio), false),
    };

    if !explicit && !path.exists() {
        tracing::warn!(path = %path.display(), "cue file not found, playing audio only");
        return Ok(CueTrack::default());
    }

    let track = CueTrack::load(&path, track_len)
        .wrap_err_with(|| format!("malformed cue track {}", path.display()))?;
    tracing::info!(path = %path.display(), cues = track.len(), "loaded cue track");
    Ok(track)
}

fn build_worker(
    runtime: &Runtime,
    settings: &Settings,
) -> EyreResult<(DispatchWorker, UnboundedReceiver<DispatchReport>)> {
    let handle = runtime.handle().clone();
    let timeout = settings.timing.dispatch_timeout;

    Ok(match &settings.device {
        Some(device) => {
            let sink = OpenShockSink::new(device.clone(), timeout)
                .wrap_err("failed to build HTTP client")?;
            DispatchWorker::new(handle, sink, timeout)
        }
        None => DispatchWorker::new(handle, AudioOnlySink, timeout),
    })
}

/// Snapshot of a running playback for display
#[derive(Debug, Clone)]
pub struct PlayerStatus {
    pub position: Duration,
    pub duration: Duration,
    pub paused: bool,
    pub scheduler: SchedulerState,
    /// Cues fired so far
    pub fired: usize,
    pub late: usize,
    pub tally: DispatchTally,
}

/// One playback: the output stream plus the session that follows it
pub struct Player {
    session: PlaybackSession<FrameClock, DispatchWorker>,
    output: AudioOutput,
    stats: Arc<DispatchStats>,
}

impl Player {
    pub fn start(
        audio: &DecodedAudio,
        track: CueTrack,
        worker: DispatchWorker,
        timing: Timing,
    ) -> EyreResult<Self> {
        let stats = worker.stats();
        let output = AudioOutput::start(audio).wrap_err("failed to start audio output")?;

        let mut session =
            PlaybackSession::new(track, audio.duration(), output.clock(), worker, timing);
        session.start();
        tracing::info!(duration_secs = audio.duration().as_secs_f64(), "now playing");

        Ok(Self {
            session,
            output,
            stats,
        })
    }

    /// Advance the scheduler once; `Some` when playback is over
    pub fn step(&mut self) -> Option<Outcome> {
        // Checked before the clock read so the final buffer's cues still fire
        let ended = self.output.is_finished();
        let state = self.session.advance(ended);

        if ended {
            if !state.is_terminal() {
                let scheduler = self.session.scheduler();
                let remaining = scheduler.track().len() - scheduler.index();
                if remaining > 0 {
                    tracing::warn!(remaining, "audio ended before the cue track");
                }
                self.session.abort();
            }
            tracing::info!("playback finished");
            return Some(Outcome::Completed);
        }

        None
    }

    /// Stop dispatching and silence the output
    pub fn stop(&mut self) -> Outcome {
        self.session.abort();
        self.output.pause();
        tracing::info!("playback stopped");
        Outcome::Interrupted
    }

    pub fn toggle_pause(&self) {
        if self.output.toggle_pause() {
            tracing::info!("playback paused");
        } else {
            tracing::info!("playback resumed");
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.session.poll_interval()
    }

    pub fn track(&self) -> &CueTrack {
        self.session.scheduler().track()
    }

    pub fn take_scope(&mut self) -> Option<rtrb::Consumer<f32>> {
        self.output.take_scope()
    }

    pub fn status(&self) -> PlayerStatus {
        let scheduler = self.session.scheduler();
        PlayerStatus {
            position: self.session.clock().elapsed().min(self.output.duration()),
            duration: self.output.duration(),
            paused: self.output.is_paused(),
            scheduler: scheduler.state(),
            fired: scheduler.index(),
            late: scheduler.late_count(),
            tally: self.stats.snapshot(),
        }
    }

    /// Release the stream and the dispatcher
    pub fn finish(self) -> DispatchTally {
        let Player {
            session,
            output,
            stats,
        } = self;
        drop(output);
        drop(session);
        stats.snapshot()
    }
}

/// Poll without a UI until the audio ends or Ctrl-C
fn run_headless(player: &mut Player, runtime: &Runtime) -> Outcome {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.store(true, Ordering::Release);
        }
    });

    let interval = player.poll_interval();
    loop {
        if stop.load(Ordering::Acquire) {
            return player.stop();
        }
        if let Some(outcome) = player.step() {
            return outcome;
        }
        std::thread::sleep(interval);
    }
}
