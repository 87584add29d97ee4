pub mod broadcaster;
pub mod chat;
pub mod colors;
pub mod commands;
pub mod emotes;
pub mod formatting;
pub mod room;
pub mod settings;
pub mod stats;

pub use broadcaster::Broadcaster;
pub use chat::ChatService;
pub use commands::{help_url, CommandRegistry, HelpEntry};
pub use emotes::EmoteTable;
pub use room::{direct_text, validate_name, ConnectionHandle, Room};
pub use settings::SettingsStore;
pub use stats::{ChatStats, StatsSnapshot};
