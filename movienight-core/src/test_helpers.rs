//! Shared fixtures for unit tests

use movienight_proto::{JsonCodec, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::service::{ChatService, ChatStats, ConnectionHandle, EmoteTable, Room, SettingsStore};

/// Room backed by in-memory settings
pub fn test_room() -> Room {
    Room::new(
        Arc::new(SettingsStore::in_memory()),
        Arc::new(ChatStats::new()),
        1000,
    )
}

/// Service with a single `Kappa` emote
pub fn test_service() -> ChatService {
    test_service_with_queue(1000)
}

pub fn test_service_with_queue(queue_capacity: usize) -> ChatService {
    let settings = Arc::new(SettingsStore::in_memory());
    let stats = Arc::new(ChatStats::new());
    let room = Arc::new(Room::new(settings.clone(), stats.clone(), queue_capacity));
    let emotes = Arc::new(EmoteTable::from_entries([("Kappa", "Kappa.png")]));
    ChatService::new(room, settings, emotes, stats)
}

pub fn connect(host: &str) -> (ConnectionHandle, mpsc::Receiver<String>) {
    ConnectionHandle::new(host, 64)
}

/// Decode one written frame into its messages
pub fn decode_frames(frame: &str) -> Vec<ServerMessage> {
    JsonCodec::decode_batch(frame).unwrap()
}

/// Throw away everything already written to a connection
pub fn drain(rx: &mut mpsc::Receiver<String>) {
    while rx.try_recv().is_ok() {}
}
