//! Server to client envelopes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::client::ClientDataType;

/// Privilege tier of a chat session
///
/// Ordered so that `tier >= Tier::Mod` reads as "moderator or above".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    User,
    Mod,
    Admin,
}

impl Tier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Mod => "mod",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a chat payload is styled by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Regular chat line
    #[default]
    Chat,
    /// `/me` action
    Action,
    /// Server announcement (`/sv`)
    Server,
    /// Visible to moderators and admins only
    Notice,
    /// Reply to a command, sent to the issuer only
    CommandResponse,
}

/// Non-chat instructions for the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Playing,
    RefreshPlayer,
    PurgeChat,
    Help,
}

/// Room membership events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Join,
    Leave,
    Kick,
    Ban,
    NameChange,
    NameChangeForced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub color: String,
    pub message: String,
    #[serde(default)]
    pub level: Tier,
    #[serde(default)]
    pub subtype: MessageType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDirective {
    pub command: CommandType,
    #[serde(default)]
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEvent {
    pub event: EventType,
    pub user: String,
    #[serde(default)]
    pub color: String,
}

/// Instruction consumed by the client but never rendered in chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenInstruction {
    pub subtype: ClientDataType,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Discriminator of a [`ServerMessage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Chat,
    Error,
    Command,
    Event,
    Hidden,
}

impl MessageKind {
    pub const ALL: [Self; 5] = [Self::Chat, Self::Error, Self::Command, Self::Event, Self::Hidden];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Error => "error",
            Self::Command => "command",
            Self::Event => "event",
            Self::Hidden => "hidden",
        }
    }

    /// Look up a discriminator from its wire token
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == token)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope sent from the server: `{"Type": kind, "Data": payload}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Type", content = "Data", rename_all = "snake_case")]
pub enum ServerMessage {
    Chat(ChatMessage),
    Error(ErrorMessage),
    Command(CommandDirective),
    Event(RoomEvent),
    Hidden(HiddenInstruction),
}

impl ServerMessage {
    pub fn chat(
        from: impl Into<String>,
        color: impl Into<String>,
        message: impl Into<String>,
        level: Tier,
        subtype: MessageType,
    ) -> Self {
        Self::Chat(ChatMessage {
            from: from.into(),
            color: color.into(),
            message: message.into(),
            level,
            subtype,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorMessage {
            message: message.into(),
        })
    }

    #[must_use]
    pub fn command(command: CommandType, arguments: Vec<String>) -> Self {
        Self::Command(CommandDirective { command, arguments })
    }

    pub fn event(event: EventType, user: impl Into<String>, color: impl Into<String>) -> Self {
        Self::Event(RoomEvent {
            event,
            user: user.into(),
            color: color.into(),
        })
    }

    #[must_use]
    pub fn hidden(subtype: ClientDataType, payload: serde_json::Value) -> Self {
        Self::Hidden(HiddenInstruction { subtype, payload })
    }

    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Chat(_) => MessageKind::Chat,
            Self::Error(_) => MessageKind::Error,
            Self::Command(_) => MessageKind::Command,
            Self::Event(_) => MessageKind::Event,
            Self::Hidden(_) => MessageKind::Hidden,
        }
    }

    /// Moderator notices are filtered out for user-tier sessions
    #[must_use]
    pub const fn is_notice(&self) -> bool {
        matches!(
            self,
            Self::Chat(ChatMessage {
                subtype: MessageType::Notice,
                ..
            })
        )
    }
}
