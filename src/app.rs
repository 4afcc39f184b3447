use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::config::Config;
use crate::events::AppEvent;
use crate::gateway::ChatGateway;
use crate::session::ChatSession;
use crate::storage::{ConversationStore, FileSlot};
use crate::ui::conversation::{ConversationAction, ConversationManager};

const TICK: Duration = Duration::from_millis(50);

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Run the chat screen until the user quits
pub async fn run(config: Config) -> Result<()> {
    let slot = FileSlot::new(config.storage_dir(), &config.storage_slot);
    let gateway = ChatGateway::new(&config).context("Failed to create HTTP client")?;
    tracing::info!(url = gateway.url(), storage = %slot.path().display(), "Starting chat");
    let store = ConversationStore::open(slot);

    let (tx, rx) = mpsc::unbounded_channel();
    let mut manager = ConversationManager::new(ChatSession::new(store), gateway, tx);
    manager.start();

    let mut terminal = enter_terminal()?;
    let result = event_loop(&mut terminal, &mut manager, rx).await;
    leave_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Tui,
    manager: &mut ConversationManager,
    mut events: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        while let Ok(app_event) = events.try_recv() {
            manager.handle_app_event(app_event);
        }

        terminal
            .draw(|frame| manager.render(frame.size(), frame.buffer_mut()))
            .context("Failed to draw")?;

        // Polling blocks, so keep it off the runtime's worker threads
        let next = tokio::task::block_in_place(|| -> io::Result<Option<Event>> {
            if event::poll(TICK)? {
                event::read().map(Some)
            } else {
                Ok(None)
            }
        })
        .context("Failed to read terminal events")?;

        match next {
            Some(Event::Key(key)) => {
                if manager.handle_key(key) == ConversationAction::Exit {
                    return Ok(());
                }
            }
            Some(_) => {}
            None => manager.tick(),
        }
    }
}

fn enter_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn leave_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}
