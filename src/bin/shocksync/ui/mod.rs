//! TUI module for shocksync
//!
//! Shows the playback position, the cue timeline and the output waveform,
//! and turns key presses into pause/stop. The UI loop doubles as the
//! scheduler's poll loop: one step per frame, one frame per poll interval.

mod state;
mod timeline;
mod transport;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    DefaultTerminal, Frame,
};
use rtrb::Consumer;

use super::app::{Outcome, Player, PlayerStatus};
pub use state::TrackOverview;

use timeline::render_timeline;
use transport::{render_transport, AudioStats};
use waveform::render_waveform;

/// Audio visualization buffer size
const VIS_BUFFER_SIZE: usize = 1024;

/// Take over the terminal and play until the track ends or the user stops
pub fn run(player: &mut Player, title: String) -> EyreResult<Outcome> {
    let overview = TrackOverview::new(title, player.track(), player.status().duration);
    let mut app = UiApp::new(player.take_scope(), overview);

    let mut terminal = ratatui::try_init()?;
    let result = app.run(&mut terminal, player);
    ratatui::restore();
    result
}

/// UI application state
struct UiApp {
    /// Ring buffer receiver for output samples
    scope_rx: Option<Consumer<f32>>,
    /// Static description of the track
    overview: TrackOverview,
    /// Output sample buffer for visualization
    audio_buffer: Vec<f32>,
    /// Set once playback is over
    outcome: Option<Outcome>,
}

impl UiApp {
    fn new(scope_rx: Option<Consumer<f32>>, overview: TrackOverview) -> Self {
        Self {
            scope_rx,
            overview,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            outcome: None,
        }
    }

    fn run(&mut self, terminal: &mut DefaultTerminal, player: &mut Player) -> EyreResult<Outcome> {
        let interval = player.poll_interval();

        loop {
            if let Some(outcome) = self.outcome {
                return Ok(outcome);
            }
            if let Some(outcome) = player.step() {
                return Ok(outcome);
            }

            self.poll_scope();
            let status = player.status();
            terminal.draw(|frame| self.render(frame, &status))?;

            // Waiting for input is the poll interval sleep
            if event::poll(interval)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key, player);
                    }
                }
            }
        }
    }

    /// Pull new scope samples, keeping the last VIS_BUFFER_SIZE
    fn poll_scope(&mut self) {
        let Some(rx) = self.scope_rx.as_mut() else {
            return;
        };

        let mut new_samples = Vec::new();
        while let Ok(sample) = rx.pop() {
            new_samples.push(sample);
        }

        if !new_samples.is_empty() {
            self.audio_buffer.extend(new_samples);
            if self.audio_buffer.len() > VIS_BUFFER_SIZE {
                let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
                self.audio_buffer.drain(0..excess);
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent, player: &mut Player) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.outcome = Some(player.stop());
            }
            KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::Char(' ') => {
                player.toggle_pause();
            }
            KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.outcome = Some(player.stop());
            }
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame, status: &PlayerStatus) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Transport bar
                Constraint::Min(6),    // Cue timeline
                Constraint::Length(8), // Waveform
                Constraint::Length(1), // Help bar
            ])
            .split(area);

        let stats = AudioStats::from_buffer(&self.audio_buffer);
        render_transport(frame, chunks[0], &self.overview, status, &stats);

        let timeline_block = Block::default().title(" Cues ").borders(Borders::ALL);
        let timeline_inner = timeline_block.inner(chunks[1]);
        frame.render_widget(timeline_block, chunks[1]);
        render_timeline(frame, timeline_inner, &self.overview, status);

        render_waveform(frame, chunks[2], &self.audio_buffer, status.paused);

        let help = Paragraph::new(" [P/Space] Pause/Resume  [S/Q] Stop")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[3]);
    }
}
