use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

const FRAMES: [&str; 4] = ["   ", ".  ", ".. ", "..."];

/// Tracks requests in flight and draws a typing indicator while any remain
#[derive(Clone, Default)]
pub struct PendingIndicator {
    in_flight: usize,
    tick: usize,
}

impl PendingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.in_flight += 1;
    }

    pub fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn is_waiting(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Advance the animation frame
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }
}

impl Widget for &PendingIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.is_waiting() || area.height == 0 {
            return;
        }

        let frame = FRAMES[(self.tick / 3) % FRAMES.len()];
        let line = Line::from(vec![
            Span::styled("🩺 Coach is typing", Style::default().fg(Color::Green)),
            Span::styled(frame, Style::default().fg(Color::Yellow)),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
