//! Conversation history display component

use crate::model::{time_label, FeedbackTag, Message};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

pub const FEEDBACK_ACK: &str = "Thanks for your feedback!";

/// Per-node state of the helpful / not-helpful affordances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackControls {
    /// User messages carry no controls
    Hidden,
    /// Both buttons are live
    Available,
    /// Used once; buttons are disabled and the acknowledgment is shown
    Acknowledged(FeedbackTag),
}

/// A displayed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageNode {
    pub text: String,
    pub is_user: bool,
    pub time_label: String,
    pub feedback: FeedbackControls,
}

impl MessageNode {
    pub fn new(text: &str, is_user: bool, timestamp: i64) -> Self {
        Self {
            text: text.to_string(),
            is_user,
            time_label: time_label(timestamp),
            feedback: if is_user {
                FeedbackControls::Hidden
            } else {
                FeedbackControls::Available
            },
        }
    }

    /// Node for a stored message, with any recorded rating already applied
    pub fn from_message(message: &Message) -> Self {
        let mut node = Self::new(&message.text, message.is_user, message.timestamp);
        if let (false, Some(tag)) = (message.is_user, message.feedback) {
            node.feedback = FeedbackControls::Acknowledged(tag);
        }
        node
    }

    /// Assistant-side node that cannot be rated
    pub fn greeting(text: &str, timestamp: i64) -> Self {
        Self {
            feedback: FeedbackControls::Hidden,
            ..Self::new(text, false, timestamp)
        }
    }

    fn is_rateable(&self) -> bool {
        self.feedback != FeedbackControls::Hidden
    }
}

/// Append-only scrollable message view
#[derive(Clone, Default)]
pub struct ConversationHistory {
    nodes: Vec<MessageNode>,
    /// Lines scrolled up from the bottom; 0 keeps the newest node in view
    scroll_offset: usize,
    /// Index of the assistant node targeted by feedback commands
    selected: Option<usize>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node at the bottom and scroll it into view
    pub fn append(&mut self, node: MessageNode) {
        let rateable = node.is_rateable();
        self.nodes.push(node);
        if rateable {
            self.selected = Some(self.nodes.len() - 1);
        }
        self.scroll_to_bottom();
    }

    /// Remove every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.selected = None;
        self.scroll_offset = 0;
    }

    pub fn nodes(&self) -> &[MessageNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn selected(&self) -> Option<&MessageNode> {
        self.selected.and_then(|i| self.nodes.get(i))
    }

    /// Move the feedback selection to the previous rateable node
    pub fn select_previous(&mut self) {
        let end = self.selected.unwrap_or(self.nodes.len());
        if let Some(index) = (0..end).rev().find(|&i| self.nodes[i].is_rateable()) {
            self.selected = Some(index);
        }
    }

    /// Move the feedback selection to the next rateable node
    pub fn select_next(&mut self) {
        let start = self.selected.map(|i| i + 1).unwrap_or(0);
        if let Some(index) = (start..self.nodes.len()).find(|&i| self.nodes[i].is_rateable()) {
            self.selected = Some(index);
        }
    }

    /// Use the selected node's feedback controls.
    ///
    /// Returns the node's text, or `None` if nothing is selected or the
    /// controls were already used.
    pub fn acknowledge_selected(&mut self, tag: FeedbackTag) -> Option<String> {
        let node = self.selected.and_then(|i| self.nodes.get_mut(i))?;
        if node.feedback != FeedbackControls::Available {
            return None;
        }
        node.feedback = FeedbackControls::Acknowledged(tag);
        Some(node.text.clone())
    }

    /// Render a single node into lines
    fn render_node(&self, index: usize, node: &MessageNode, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let (icon, who) = if node.is_user { ("👤", "You") } else { ("🩺", "Coach") };
        let is_selected = self.selected == Some(index);
        let header_style = if is_selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(vec![Span::styled(
            format!("{} {} {} {}", icon, who, node.time_label, "─".repeat(12)),
            header_style,
        )]));

        let content_style = if node.is_user {
            Style::default().fg(Color::Blue)
        } else {
            Style::default().fg(Color::Green)
        };
        for content_line in wrap_text(&node.text, width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, content_style),
            ]));
        }

        match node.feedback {
            FeedbackControls::Hidden => {}
            FeedbackControls::Available => {
                lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(
                        format!(
                            "[{}] [{}]",
                            FeedbackTag::Helpful.display_name(),
                            FeedbackTag::NotHelpful.display_name()
                        ),
                        Style::default().fg(if is_selected { Color::Cyan } else { Color::Gray }),
                    ),
                ]));
            }
            FeedbackControls::Acknowledged(tag) => {
                lines.push(Line::from(vec![
                    Span::raw("  "),
                    Span::styled(
                        format!("{} · {}", tag.display_name(), FEEDBACK_ACK),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    ),
                ]));
            }
        }

        lines
    }
}

impl Widget for &ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Conversation");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let mut all_lines: Vec<Line> = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            all_lines.extend(self.render_node(index, node, inner_area.width));
            all_lines.push(Line::from(""));
        }

        // Bottom-anchored window, shifted up by the scroll offset
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_offset = total.saturating_sub(height);
        let offset = self.scroll_offset.min(max_offset);
        let start = total.saturating_sub(height + offset);
        let end = (start + height).min(total);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Wrap text to fit within the given width, keeping explicit line breaks
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + word_len + 1 > width {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }
            if current_len > 0 {
                current_line.push(' ');
                current_len += 1;
            }
            current_line.push_str(word);
            current_len += word_len;
        }

        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
