use anyhow::Result;
use chrono::{Local, TimeZone};

use crate::config::Config;
use crate::model::ConversationSummary;
use crate::storage::{ConversationStore, FileSlot};

pub fn list_chats(config: &Config) -> Result<()> {
    let store = ConversationStore::open(FileSlot::new(config.storage_dir(), &config.storage_slot));
    let chats = store.list_ordered_by_recency(None);

    if chats.is_empty() {
        println!("No chats yet. Run 'healthcoach' to start one!");
        return Ok(());
    }

    println!("💬 Your chats (most recent first):");
    println!("{}", "=".repeat(50));
    for (index, chat) in chats.iter().enumerate() {
        println!("{}", format_summary(index, chat));
    }

    Ok(())
}

pub fn init_config(config: &Config) -> Result<()> {
    let path = config.config_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    config.save()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn format_summary(index: usize, chat: &ConversationSummary) -> String {
    let updated = Local
        .timestamp_millis_opt(chat.last_updated)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let noun = if chat.message_count == 1 { "message" } else { "messages" };

    format!(
        "{:>3}. {}\n     🕒 {} · {} {}",
        index + 1,
        chat.title,
        updated,
        chat.message_count,
        noun
    )
}
