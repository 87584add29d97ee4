//! Client to server envelopes

use serde::{Deserialize, Serialize};

/// Kind of a client request
///
/// Also used as the subtype of hidden instructions pushed back to the
/// client in answer to the query kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientDataType {
    /// Plain chat text or a `/command`
    Message,
    /// Request the list of user names
    Users,
    /// Keepalive
    Ping,
    /// Request the session's privilege tier
    Auth,
    /// Request the session's color
    Color,
    /// Request the emote table
    Emote,
    /// Request how many chat lines the client keeps on screen
    MessageCount,
}

/// Envelope sent by a viewer: `{"Type": kind, "Message": text}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "Type")]
    pub kind: ClientDataType,
    #[serde(rename = "Message", default)]
    pub message: String,
}

impl ClientMessage {
    pub fn new(kind: ClientDataType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn text(message: impl Into<String>) -> Self {
        Self::new(ClientDataType::Message, message)
    }
}
