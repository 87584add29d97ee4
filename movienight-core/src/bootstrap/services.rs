//! Service initialization and dependency injection

use std::sync::Arc;
use tracing::{info, warn};

use crate::service::{ChatService, ChatStats, EmoteTable, Room, SettingsStore};
use crate::Config;

/// Build the chat services described by `config`
///
/// A missing or unreadable emote directory is not fatal; chat runs with
/// no emotes until `/reloademotes` succeeds.
pub fn init_services(config: &Config) -> anyhow::Result<ChatService> {
    info!("Initializing services...");

    let settings = Arc::new(SettingsStore::load(&config.chat.settings_path)?);
    info!(path = %config.chat.settings_path, bans = settings.bans().len(), "Settings loaded");

    let emotes = match EmoteTable::load(&config.chat.emote_dir) {
        Ok(table) => table,
        Err(e) => {
            warn!(dir = %config.chat.emote_dir, error = %e, "Unable to load emotes, continuing without");
            EmoteTable::new(&config.chat.emote_dir)
        }
    };

    let stats = Arc::new(ChatStats::new());
    let room = Arc::new(Room::new(
        settings.clone(),
        stats.clone(),
        config.chat.queue_capacity,
    ));

    let service = ChatService::new(room, settings, Arc::new(emotes), stats)
        .with_max_message_length(config.chat.max_message_length);

    info!("All services initialized");
    Ok(service)
}
