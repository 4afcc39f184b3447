use crate::model::ConversationSummary;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Chat list drawn beside the conversation, newest first
#[derive(Clone, Default)]
pub struct ChatSidebar {
    entries: Vec<ConversationSummary>,
}

impl ChatSidebar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listing with a fresh recency-ordered snapshot
    pub fn refresh(&mut self, entries: Vec<ConversationSummary>) {
        self.entries = entries;
    }

    pub fn entries(&self) -> &[ConversationSummary] {
        &self.entries
    }

    /// Id at a 0-based position in the listing
    pub fn id_at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|entry| entry.id.as_str())
    }

    pub fn active_index(&self) -> Option<usize> {
        self.entries.iter().position(|entry| entry.active)
    }
}

impl Widget for &ChatSidebar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("🗂  Chats");
        let inner = block.inner(area);
        block.render(area, buf);

        for (index, entry) in self.entries.iter().enumerate() {
            if index >= inner.height as usize {
                break;
            }

            let style = if entry.active {
                Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let line = Line::from(vec![
                Span::styled(format!("{:>2} ", index + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(entry.title.clone(), style),
            ]);
            buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
        }
    }
}
