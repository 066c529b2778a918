//! Timeline widget - cue markers along the track with a playhead

use std::time::Duration;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use shock_sync::cue::{format_timestamp, CueKind};

use super::{PlayerStatus, TrackOverview};

fn kind_color(kind: CueKind) -> Color {
    match kind {
        CueKind::Shock => Color::Red,
        CueKind::Vibrate => Color::Cyan,
        CueKind::Sound => Color::Blue,
        CueKind::Stop => Color::White,
    }
}

/// Render the ruler, cue markers, playhead and the next pending cue
pub fn render_timeline(frame: &mut Frame, area: Rect, overview: &TrackOverview, status: &PlayerStatus) {
    if area.height < 3 || area.width < 20 {
        return;
    }

    let width = area.width as usize;
    let total = overview.duration.max(Duration::from_millis(1)).as_secs_f64();
    let column_of = |at: Duration| ((at.as_secs_f64() / total) * (width - 1) as f64).round() as usize;

    let mut lines = Vec::new();

    // Ruler: a label roughly every 12 columns
    let mut ruler = String::with_capacity(width);
    while ruler.chars().count() < width {
        let col = ruler.chars().count();
        let at = Duration::from_secs_f64(total * col as f64 / (width - 1) as f64);
        let label = format!("|{}", format_timestamp(at));
        let pad = 12usize.saturating_sub(label.len());
        ruler.push_str(&label);
        ruler.push_str(&" ".repeat(pad));
    }
    let ruler: String = ruler.chars().take(width).collect();
    lines.push(Line::from(Span::styled(ruler, Style::default().fg(Color::DarkGray))));

    // Markers: fired cues dimmed, upcoming ones colored by kind
    let mut cells: Vec<Option<(usize, CueKind)>> = vec![None; width];
    for (index, (at, kind)) in overview.marks.iter().enumerate() {
        let col = column_of(*at).min(width - 1);
        // Upcoming cues win a shared column so they stay visible
        match cells[col] {
            Some((existing, _)) if existing >= status.fired => {}
            _ => cells[col] = Some((index, *kind)),
        }
    }
    let markers: Vec<Span> = cells
        .iter()
        .map(|cell| match cell {
            Some((index, _)) if *index < status.fired => {
                Span::styled("│", Style::default().fg(Color::DarkGray))
            }
            Some((_, kind)) => Span::styled("▼", Style::default().fg(kind_color(*kind))),
            None => Span::styled("─", Style::default().fg(Color::DarkGray)),
        })
        .collect();
    lines.push(Line::from(markers));

    // Playhead
    let playhead = column_of(status.position).min(width - 1);
    let mut playhead_str = " ".repeat(playhead);
    playhead_str.push('▲');
    lines.push(Line::from(Span::styled(playhead_str, Style::default().fg(Color::Yellow))));

    // Next cue
    let next = match overview.cues.get(status.fired) {
        Some(cue) => Span::styled(
            format!(
                "Next: {} {} @ {} for {}ms",
                format_timestamp(cue.timestamp),
                cue.kind,
                cue.intensity.get(),
                cue.duration.as_millis()
            ),
            Style::default().fg(kind_color(cue.kind)),
        ),
        None if overview.cues.is_empty() => {
            Span::styled("No cues for this track", Style::default().fg(Color::DarkGray))
        }
        None => Span::styled("All cues sent", Style::default().fg(Color::DarkGray)),
    };
    lines.push(Line::from(next));

    frame.render_widget(Paragraph::new(lines), area);
}
