//! Transport bar widget - shows position, play state, scheduler and dispatch stats

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use shock_sync::{cue::format_timestamp, SchedulerState};

use super::{PlayerStatus, TrackOverview};

/// Output level over the scope window, in dBFS
pub struct AudioStats {
    pub peak_db: f32,
    pub rms_db: f32,
}

/// Anything quieter reads as silence
const FLOOR_DB: f32 = -60.0;

fn to_db(level: f32) -> f32 {
    if level <= 0.0 {
        return FLOOR_DB;
    }
    (20.0 * level.log10()).max(FLOOR_DB)
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        let (peak, sum_sq) = buffer
            .iter()
            .fold((0.0f32, 0.0f32), |(peak, sum), &x| (peak.max(x.abs()), sum + x * x));
        let rms = (sum_sq / buffer.len().max(1) as f32).sqrt();
        Self {
            peak_db: to_db(peak),
            rms_db: to_db(rms),
        }
    }

    fn label(&self) -> String {
        if self.peak_db <= FLOOR_DB {
            "Level: silent".to_string()
        } else {
            format!("Peak {:.0} dB  RMS {:.0} dB", self.peak_db, self.rms_db)
        }
    }
}

/// Render the transport bar
pub fn render_transport(
    frame: &mut Frame,
    area: Rect,
    overview: &TrackOverview,
    status: &PlayerStatus,
    audio_stats: &AudioStats,
) {
    let block = Block::default()
        .title(format!(" {} ", overview.title))
        .borders(Borders::ALL);

    let (play_symbol, play_state, play_color) = if status.paused {
        ("⏸", "Paused", Color::Yellow)
    } else {
        ("▶", "Playing", Color::Green)
    };

    let scheduler_color = match status.scheduler {
        SchedulerState::Running => Color::Cyan,
        SchedulerState::Finished => Color::DarkGray,
        SchedulerState::Aborted => Color::Red,
        SchedulerState::Idle => Color::White,
    };

    let tally = status.tally;
    let failed_color = if tally.failed > 0 { Color::Red } else { Color::DarkGray };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} {}  ", play_symbol, play_state),
            Style::default().fg(play_color),
        ),
        Span::styled(
            format!(
                "{} / {}  ",
                format_timestamp(status.position),
                format_timestamp(status.duration)
            ),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!(
                "Cues {}/{} ({})  ",
                status.fired,
                overview.marks.len(),
                status.scheduler.label()
            ),
            Style::default().fg(scheduler_color),
        ),
        Span::styled(
            format!("Sent {}  OK {}  ", tally.sent, tally.succeeded),
            Style::default().fg(Color::Green),
        ),
        Span::styled(format!("Failed {}  ", tally.failed), Style::default().fg(failed_color)),
        Span::styled(format!("Late {}  ", status.late), Style::default().fg(Color::DarkGray)),
        Span::styled(audio_stats.label(), Style::default().fg(Color::Magenta)),
    ]);

    let paragraph = Paragraph::new(line).block(block);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_in_dbfs() {
        let stats = AudioStats::from_buffer(&[0.5, -0.5, 0.5, -0.5]);
        assert!((stats.peak_db - -6.02).abs() < 0.01);
        assert!((stats.rms_db - -6.02).abs() < 0.01);
    }

    #[test]
    fn test_silence_hits_the_floor() {
        let stats = AudioStats::from_buffer(&[0.0; 16]);
        assert_eq!(stats.peak_db, FLOOR_DB);
        assert_eq!(stats.label(), "Level: silent");
        assert_eq!(AudioStats::from_buffer(&[]).rms_db, FLOOR_DB);
    }
}
