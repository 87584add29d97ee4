use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::BanRecord;

pub const DEFAULT_TITLE_LENGTH: usize = 50;
pub const DEFAULT_MAX_MESSAGE_COUNT: usize = 300;
pub const DEFAULT_PIN: &str = "1234";

/// How viewers are let into the room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    Open,
    Pin,
    Request,
}

impl AccessMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pin => "pin",
            Self::Request => "request",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "pin" | "password" => Ok(Self::Pin),
            "request" => Ok(Self::Request),
            _ => Err("Invalid access type".to_string()),
        }
    }
}

/// Room settings persisted as JSON
///
/// `admin_password` is written out so operators can read it, but it is
/// replaced with a fresh one every time the file is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_message_count: usize,
    pub title_length: usize,
    pub admin_password: String,
    pub bans: Vec<BanRecord>,
    pub stream_key: String,
    pub room_access: AccessMode,
    pub room_access_pin: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_message_count: DEFAULT_MAX_MESSAGE_COUNT,
            title_length: DEFAULT_TITLE_LENGTH,
            admin_password: String::new(),
            bans: Vec::new(),
            stream_key: String::new(),
            room_access: AccessMode::Open,
            room_access_pin: String::new(),
        }
    }
}

impl Settings {
    /// Fill in values a hand-edited file may leave out
    pub fn apply_defaults(&mut self) {
        if self.title_length == 0 {
            self.title_length = DEFAULT_TITLE_LENGTH;
        }
        if self.max_message_count == 0 {
            self.max_message_count = DEFAULT_MAX_MESSAGE_COUNT;
        }
        if self.room_access != AccessMode::Open && self.room_access_pin.is_empty() {
            self.room_access_pin = DEFAULT_PIN.to_string();
        }
    }
}
