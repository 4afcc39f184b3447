use crate::events::AppEvent;
use crate::gateway::{ChatGateway, APOLOGY_TEXT};
use crate::model::{FeedbackTag, Message};
use crate::session::{ChatSession, DeleteOutcome};
use crate::ui::conversation::composer::ConversationResult;
use crate::ui::conversation::{
    get_help_text, ChatSidebar, ConversationComposer, ConversationHistory, MessageNode,
    ParsedCommand, PendingIndicator, SlashCommand,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::Widget,
};
use tokio::sync::mpsc;

/// Greeting shown when the active conversation has nothing in it yet
pub const WELCOME_TEXT: &str =
    "Hello! I'm your Health Coach. How can I help you with your wellness journey today?";

const SCROLL_STEP: usize = 5;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Drives the chat screen: owns the session state and the widgets showing it
pub struct ConversationManager {
    session: ChatSession,
    gateway: ChatGateway,
    events: mpsc::UnboundedSender<AppEvent>,
    history: ConversationHistory,
    composer: ConversationComposer,
    sidebar: ChatSidebar,
    pending: PendingIndicator,
    pending_delete: Option<String>,
    notice: Option<String>,
}

impl ConversationManager {
    pub fn new(
        session: ChatSession,
        gateway: ChatGateway,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let mut composer = ConversationComposer::new("Ask about health, nutrition, or fitness...");
        composer.set_focus(true);

        Self {
            session,
            gateway,
            events,
            history: ConversationHistory::new(),
            composer,
            sidebar: ChatSidebar::new(),
            pending: PendingIndicator::new(),
            pending_delete: None,
            notice: None,
        }
    }

    /// Open the most recent conversation (or a new one) and greet if it is empty
    pub fn start(&mut self) {
        let id = self.session.restore();
        self.replay(&id);
        if self.history.is_empty() {
            // Not stored, so there is nothing for a rating to attach to
            self.history
                .append(MessageNode::greeting(WELCOME_TEXT, self.session.now()));
        }
        self.refresh_sidebar();
    }

    #[cfg(test)]
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    #[cfg(test)]
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    #[cfg(test)]
    pub fn sidebar(&self) -> &ChatSidebar {
        &self.sidebar
    }

    #[cfg(test)]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[cfg(test)]
    pub fn is_confirming_delete(&self) -> bool {
        self.pending_delete.is_some()
    }

    /// Show a message and, when `persist` is set, record it in `conversation_id`.
    ///
    /// Only the active conversation is on screen; messages for other
    /// conversations are recorded without being drawn.
    pub fn append(
        &mut self,
        conversation_id: &str,
        text: &str,
        is_user: bool,
        timestamp: Option<i64>,
        persist: bool,
    ) {
        let timestamp = timestamp.unwrap_or_else(|| self.session.now());

        if self.session.active_id() == Some(conversation_id) {
            self.history.append(MessageNode::new(text, is_user, timestamp));
        }

        if persist {
            let message = if is_user {
                Message::user(text, timestamp)
            } else {
                Message::assistant(text, timestamp)
            };
            if let Err(e) = self.session.record_message(conversation_id, message) {
                tracing::warn!(error = %e, "Dropped message");
            }
            self.refresh_sidebar();
        }
    }

    /// Start a fresh conversation and show it
    pub fn create_conversation(&mut self) -> String {
        let id = self.session.create_conversation();
        self.replay(&id);
        self.refresh_sidebar();
        id
    }

    /// Switch to `id` and redraw the view from its stored messages
    pub fn select_conversation(&mut self, id: &str) {
        if self.session.select_conversation(id).is_some() {
            self.replay(id);
            self.refresh_sidebar();
        }
    }

    /// Ask for confirmation before deleting `id`
    pub fn request_delete(&mut self, id: &str) {
        let Some(conversation) = self.session.conversation(id) else {
            return;
        };
        self.notice = Some(format!(
            "Are you sure you want to delete \"{}\"? (y/n)",
            conversation.title
        ));
        self.pending_delete = Some(id.to_string());
    }

    /// Resolve the confirmation gate opened by [`Self::request_delete`]
    pub fn answer_delete(&mut self, confirmed: bool) {
        let Some(id) = self.pending_delete.take() else {
            return;
        };
        self.notice = None;

        if let DeleteOutcome::Replaced { next, .. } =
            self.session.delete_conversation(&id, |_| confirmed)
        {
            self.replay(&next);
        }
        self.refresh_sidebar();
    }

    /// Record the user's text and ask the service for a reply.
    ///
    /// Blank input is ignored. The reply arrives later as
    /// [`AppEvent::ReplyReceived`].
    pub fn send_message(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let had_active = self.session.active().is_some();
        let conversation_id = self.session.ensure_active();
        if !had_active {
            self.replay(&conversation_id);
        }

        self.append(&conversation_id, text, true, None, true);
        self.pending.start();

        let gateway = self.gateway.clone();
        let events = self.events.clone();
        let user_input = text.to_string();
        tokio::spawn(async move {
            let result = gateway.ask(&user_input).await;
            let _ = events.send(AppEvent::ReplyReceived {
                conversation_id,
                result,
            });
        });
    }

    /// Rate the selected reply and report the rating to the service.
    ///
    /// The report is fire-and-forget; the rating is recorded locally at once.
    pub fn send_feedback(&mut self, tag: FeedbackTag) {
        let Some(conversation_id) = self.session.active_id().map(str::to_string) else {
            return;
        };
        let Some(responded_text) = self.history.acknowledge_selected(tag) else {
            self.notice = Some("No reply selected, or it was already rated.".to_string());
            return;
        };

        let user_input = self.session.last_user_query(&conversation_id);
        let gateway = self.gateway.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = gateway.send_feedback(&user_input, tag).await;
            let _ = events.send(AppEvent::FeedbackSent { tag, result });
        });

        if let Err(e) = self.session.record_feedback(&conversation_id, tag, &responded_text) {
            tracing::warn!(error = %e, "Could not record feedback");
        }
    }

    /// Apply a completion reported by a network task
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ReplyReceived {
                conversation_id,
                result,
            } => {
                self.pending.finish();
                self.finish_reply(&conversation_id, result);
            }
            AppEvent::FeedbackSent { tag, result } => match result {
                Ok(()) => tracing::debug!(tag = tag.as_wire(), "Feedback delivered"),
                Err(e) => tracing::warn!(tag = tag.as_wire(), error = %e, "Error sending feedback"),
            },
        }
    }

    /// Append the service's answer, or the apology if the request failed
    pub fn finish_reply<E: std::fmt::Display>(
        &mut self,
        conversation_id: &str,
        result: Result<String, E>,
    ) {
        let text = match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Chat request failed");
                APOLOGY_TEXT.to_string()
            }
        };

        if self.session.conversation(conversation_id).is_none() {
            tracing::warn!(id = %conversation_id, "Reply for a deleted conversation dropped");
            return;
        }

        self.append(conversation_id, &text, false, None, true);
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        if self.pending_delete.is_some() {
            let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
            self.answer_delete(confirmed);
            return ConversationAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return ConversationAction::Exit,
            KeyCode::Char('n') if ctrl => {
                self.create_conversation();
                return ConversationAction::None;
            }
            KeyCode::Up if ctrl => {
                self.history.select_previous();
                return ConversationAction::None;
            }
            KeyCode::Down if ctrl => {
                self.history.select_next();
                return ConversationAction::None;
            }
            KeyCode::PageUp => {
                self.history.scroll_up(SCROLL_STEP);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.history.scroll_down(SCROLL_STEP);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ConversationResult::Submitted(input) => {
                self.notice = None;
                self.send_message(&input);
                ConversationAction::None
            }
            ConversationResult::Command(command) => {
                self.notice = None;
                self.handle_slash_command(command)
            }
            ConversationResult::None => ConversationAction::None,
        }
    }

    /// Advance animations
    pub fn tick(&mut self) {
        self.pending.tick();
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: ParsedCommand) -> ConversationAction {
        match command.command {
            SlashCommand::New => {
                self.create_conversation();
            }
            SlashCommand::Switch => {
                let target = command
                    .chat_index()
                    .and_then(|i| self.sidebar.id_at(i))
                    .map(str::to_string);
                match target {
                    Some(id) => self.select_conversation(&id),
                    None => self.notice = Some("Usage: /switch <n> with n from the chat list".to_string()),
                }
            }
            SlashCommand::Delete => {
                let target = match command.argument() {
                    Some(_) => command
                        .chat_index()
                        .and_then(|i| self.sidebar.id_at(i))
                        .map(str::to_string),
                    None => self.session.active_id().map(str::to_string),
                };
                match target {
                    Some(id) => self.request_delete(&id),
                    None => self.notice = Some("Usage: /delete [n] with n from the chat list".to_string()),
                }
            }
            SlashCommand::Helpful | SlashCommand::NotHelpful => {
                if let Some(tag) = command.feedback_tag() {
                    self.send_feedback(tag);
                }
            }
            SlashCommand::Help => {
                self.notice = Some(get_help_text());
            }
            SlashCommand::Quit => return ConversationAction::Exit,
        }
        ConversationAction::None
    }

    /// Clear the view and redraw `id` from its stored messages, oldest first
    fn replay(&mut self, id: &str) {
        self.history.clear();
        let Some(conversation) = self.session.conversation(id) else {
            return;
        };
        for message in &conversation.messages {
            self.history.append(MessageNode::from_message(message));
        }
    }

    fn refresh_sidebar(&mut self) {
        self.sidebar.refresh(self.session.summaries());
    }

    /// Render the chat screen
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(30), Constraint::Min(20)])
            .split(area);

        self.sidebar.render(columns[0], buf);

        let notice_lines: Vec<&str> = self
            .notice
            .as_deref()
            .map(|notice| notice.lines().collect())
            .unwrap_or_default();
        let status_height = notice_lines.len().max(1).min(12) as u16;

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),                // History
                Constraint::Length(status_height), // Notice / typing indicator
                Constraint::Length(3),             // Composer
            ])
            .split(columns[1]);

        self.history.render(rows[0], buf);

        if notice_lines.is_empty() {
            self.pending.render(rows[1], buf);
        } else {
            // Short terminals squeeze this row below the notice's length
            for (i, text) in notice_lines.iter().take(rows[1].height as usize).enumerate() {
                let line = Line::styled(*text, Style::default().fg(Color::Yellow));
                buf.set_line(rows[1].x, rows[1].y + i as u16, &line, rows[1].width);
            }
        }

        self.composer.render(rows[2], buf);
    }
}
