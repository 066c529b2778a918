//! Output scope - the last mono-mixed samples sent to the device

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Quietest range the scope zooms to, so silence stays flat
const MIN_SCALE: f32 = 0.05;

/// Vertical range for a buffer: its peak, with a floor
///
/// Whispered tracks rarely pass -20 dBFS, so a fixed [-1, 1] range
/// would draw them as a flat line.
pub fn scope_scale(buffer: &[f32]) -> f64 {
    let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
    peak.clamp(MIN_SCALE, 1.0) as f64
}

/// Render the scope; dimmed while playback is paused
pub fn render_waveform(frame: &mut Frame, area: Rect, buffer: &[f32], paused: bool) {
    let scale = scope_scale(buffer);
    let title = if scale < 1.0 {
        format!(" Output (x{:.0}) ", 1.0 / scale)
    } else {
        " Output ".to_string()
    };
    let block = Block::default().title(title).borders(Borders::ALL);

    let span = buffer.len().saturating_sub(1).max(1) as f64;
    let points: Vec<(f64, f64)> = buffer
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f64 / span, s as f64))
        .collect();

    let color = if paused { Color::DarkGray } else { Color::Cyan };
    let trace = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&points);

    let axis_style = Style::default().fg(Color::DarkGray);
    let chart = Chart::new(vec![trace])
        .block(block)
        .x_axis(Axis::default().bounds([0.0, 1.0]).style(axis_style))
        .y_axis(Axis::default().bounds([-scale, scale]).style(axis_style));

    frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_scale_follows_quiet_audio() {
        assert_eq!(scope_scale(&[0.0, 0.0]), MIN_SCALE as f64);
        assert!((scope_scale(&[0.1, -0.2, 0.05]) - 0.2).abs() < 1e-6);
        assert_eq!(scope_scale(&[1.5, -0.3]), 1.0);
    }
}
