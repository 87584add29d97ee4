//! Session registry
//!
//! All live sessions sit behind one mutex together with the connection
//! index and the "now playing" state; every mutation is a single critical
//! section. Producers push room-wide messages into a bounded queue that
//! [`Room::flush`] drains as one batch per tick.

use movienight_proto::{
    ClientDataType, CommandType, EventType, JsonCodec, MessageType, ServerMessage, Tier,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::colors::random_color;
use super::formatting::{escape_html, highlight_mentions};
use super::settings::SettingsStore;
use super::stats::ChatStats;
use crate::models::{ConnectionId, SessionInfo};
use crate::{Error, Result};

pub const NAME_MIN_LENGTH: usize = 3;
pub const NAME_MAX_LENGTH: usize = 36;

/// Reply to a producer whose message did not fit in the outbound queue
pub const QUEUE_FULL_MESSAGE: &str = "Chat is busy, message not sent";

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z_-]+$").expect("valid name regex"));

/// Check a display name against the length and charset rules
pub fn validate_name(name: &str) -> Result<()> {
    let valid = NAME_PATTERN.is_match(name)
        && (NAME_MIN_LENGTH..=NAME_MAX_LENGTH).contains(&name.len());
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Write side of one viewer connection
///
/// Holds the bounded channel drained by the connection's writer task and
/// the token that tells the transport to hang up.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    host: String,
    sender: mpsc::Sender<String>,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its writer task drains
    pub fn new(host: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            host: host.into(),
            sender,
            shutdown: CancellationToken::new(),
        };
        (handle, receiver)
    }

    #[must_use]
    pub const fn id(&self) -> &ConnectionId {
        &self.id
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Queue one frame without waiting
    pub fn try_send(&self, frame: String) -> std::result::Result<(), TrySendError<String>> {
        self.sender.try_send(frame)
    }

    /// Encode and queue a single message
    pub fn send_message(&self, message: &ServerMessage) -> bool {
        match JsonCodec::encode_server_message(message) {
            Ok(frame) => self.try_send(frame).is_ok(),
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, "Failed to encode message");
                false
            }
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn close(&self) {
        self.shutdown.cancel();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.sender.is_closed()
    }
}

struct Session {
    name: String,
    tier: Tier,
    color: String,
    name_forced: bool,
    color_forced: bool,
    connection: ConnectionHandle,
}

impl Session {
    fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.connection.id().clone(),
            name: self.name.clone(),
            host: self.connection.host().to_string(),
            tier: self.tier,
            color: self.color.clone(),
            name_forced: self.name_forced,
            color_forced: self.color_forced,
        }
    }

    /// This session's view of a message, `None` when it must not see it
    fn render(&self, message: &ServerMessage) -> Option<ServerMessage> {
        if message.is_notice() && self.tier == Tier::User {
            return None;
        }
        match message {
            ServerMessage::Chat(chat) => {
                let mut chat = chat.clone();
                chat.message = highlight_mentions(&chat.message, &self.name);
                Some(ServerMessage::Chat(chat))
            }
            other => Some(other.clone()),
        }
    }

    fn deliver(&self, messages: &[ServerMessage]) -> std::result::Result<(), String> {
        let rendered: Vec<ServerMessage> = messages.iter().filter_map(|m| self.render(m)).collect();
        if rendered.is_empty() {
            return Ok(());
        }
        let frame = JsonCodec::encode_batch(&rendered).map_err(|e| e.to_string())?;
        self.connection.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => "outbound buffer full".to_string(),
            TrySendError::Closed(_) => "connection closed".to_string(),
        })
    }
}

#[derive(Default)]
struct RoomState {
    sessions: HashMap<String, Session>,
    by_connection: HashMap<ConnectionId, String>,
    playing_title: String,
    playing_link: String,
}

impl RoomState {
    fn remove(&mut self, key: &str) -> Option<Session> {
        let session = self.sessions.remove(key)?;
        self.by_connection.remove(session.connection.id());
        Some(session)
    }

    fn key_for(&self, id: &ConnectionId) -> Option<String> {
        self.by_connection.get(id).cloned()
    }

    /// Re-key a session under a new display name
    fn rename(&mut self, old_key: &str, new_name: &str) -> std::result::Result<&mut Session, String> {
        let new_key = new_name.to_lowercase();
        if new_key != old_key && self.sessions.contains_key(&new_key) {
            return Err("Name already taken".to_string());
        }
        let mut session = self
            .sessions
            .remove(old_key)
            .ok_or_else(|| "Unable to find session".to_string())?;
        session.name = new_name.to_string();
        self.by_connection
            .insert(session.connection.id().clone(), new_key.clone());
        Ok(self.sessions.entry(new_key).or_insert(session))
    }

    fn playing_directive(&self) -> ServerMessage {
        ServerMessage::command(
            CommandType::Playing,
            vec![self.playing_title.clone(), self.playing_link.clone()],
        )
    }
}

/// Message shown to one session only
pub fn direct_text(text: impl Into<String>) -> ServerMessage {
    ServerMessage::chat("", "", text, Tier::User, MessageType::CommandResponse)
}

fn not_found(name: &str) -> String {
    format!("Unable to get client for name {name}")
}

fn history_push(max_message_count: usize) -> ServerMessage {
    ServerMessage::hidden(ClientDataType::MessageCount, serde_json::json!(max_message_count))
}

fn auth_push(tier: Tier) -> ServerMessage {
    ServerMessage::hidden(
        ClientDataType::Auth,
        serde_json::Value::String(tier.as_str().to_string()),
    )
}

pub struct Room {
    state: Mutex<RoomState>,
    queue_tx: mpsc::Sender<ServerMessage>,
    queue_rx: Mutex<mpsc::Receiver<ServerMessage>>,
    settings: Arc<SettingsStore>,
    stats: Arc<ChatStats>,
}

impl Room {
    pub fn new(settings: Arc<SettingsStore>, stats: Arc<ChatStats>, queue_capacity: usize) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity.max(1));
        Self {
            state: Mutex::new(RoomState::default()),
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            settings,
            stats,
        }
    }

    /// Admit a connection under a display name
    ///
    /// The ban lookup runs between two registry critical sections so the
    /// settings lock is never taken while the registry is locked. The
    /// second section repeats the collision check and inserts, which
    /// serializes racing joins of case variants of one name.
    pub fn join(&self, name: &str, connection: ConnectionHandle) -> Result<SessionInfo> {
        validate_name(name)?;
        let key = name.to_lowercase();

        {
            let state = self.state.lock();
            if state.by_connection.contains_key(connection.id()) {
                return Err(Error::InvalidInput("connection already joined".to_string()));
            }
            if state.sessions.contains_key(&key) {
                return Err(Error::NameTaken {
                    name: name.to_string(),
                });
            }
        }

        if let Some(names) = self.settings.is_banned(connection.host()) {
            info!(host = %connection.host(), name, "Banned host tried to join");
            return Err(Error::Banned {
                host: connection.host().to_string(),
                name: name.to_string(),
                names,
            });
        }

        let color = random_color();
        let history = self.settings.max_message_count();
        let info = {
            let mut state = self.state.lock();
            if state.sessions.contains_key(&key) {
                return Err(Error::NameTaken {
                    name: name.to_string(),
                });
            }

            let session = Session {
                name: name.to_string(),
                tier: Tier::User,
                color: color.clone(),
                name_forced: false,
                color_forced: false,
                connection,
            };
            // Sent before the session can appear in any flushed batch
            let welcome = [state.playing_directive(), history_push(history)];
            if let Err(reason) = session.deliver(&welcome) {
                debug!(name, reason = %reason, "Join push not delivered");
            }

            let info = session.info();
            state.by_connection.insert(info.id.clone(), key.clone());
            state.sessions.insert(key, session);
            info
        };

        info!(host = %info.host, name = %info.name, connection_id = %info.id, "User joined");
        self.announce(ServerMessage::event(EventType::Join, escape_html(name), color));
        Ok(info)
    }

    /// Remove a session by name and announce it
    pub fn leave(&self, name: &str) {
        let removed = self.state.lock().remove(&name.to_lowercase());
        match removed {
            Some(session) => self.finish_leave(&session),
            None => debug!(name, "Leave for a name not in chat"),
        }
    }

    /// Remove whatever session belongs to a connection
    ///
    /// Returns false when the connection never joined or was already
    /// removed, so a stale connection cannot drop a newer session that
    /// reuses its name.
    pub fn leave_connection(&self, id: &ConnectionId) -> bool {
        let removed = {
            let mut state = self.state.lock();
            state.key_for(id).and_then(|key| state.remove(&key))
        };
        match removed {
            Some(session) => {
                self.finish_leave(&session);
                true
            }
            None => false,
        }
    }

    fn finish_leave(&self, session: &Session) {
        session.connection.close();
        info!(host = %session.connection.host(), name = %session.name, "User left");
        self.announce(ServerMessage::event(
            EventType::Leave,
            session.name.clone(),
            session.color.clone(),
        ));
    }

    /// Disconnect a user-tier session
    pub fn kick(&self, name: &str) -> std::result::Result<(), String> {
        let session = {
            let mut state = self.state.lock();
            let key = name.to_lowercase();
            let target = state.sessions.get(&key).ok_or_else(|| not_found(name))?;
            match target.tier {
                Tier::Mod => return Err("You cannot kick another mod.".to_string()),
                Tier::Admin => return Err("Jebaited No.".to_string()),
                Tier::User => {}
            }
            state.remove(&key).ok_or_else(|| not_found(name))?
        };

        session.connection.close();
        info!(host = %session.connection.host(), name = %session.name, "User kicked");
        self.announce(ServerMessage::event(EventType::Kick, session.name, session.color));
        Ok(())
    }

    /// Remove every session on the target's host and ban that host
    ///
    /// Sessions are removed first; if persisting the ban fails they stay
    /// removed, get announced as kicks, and the error is returned.
    pub fn ban(&self, name: &str) -> std::result::Result<Vec<String>, String> {
        let (host, removed) = {
            let mut state = self.state.lock();
            let target = state
                .sessions
                .get(&name.to_lowercase())
                .ok_or_else(|| not_found(name))?;
            let host = target.connection.host().to_string();

            let keys: Vec<String> = state
                .sessions
                .iter()
                .filter(|(_, s)| s.connection.host() == host)
                .map(|(k, _)| k.clone())
                .collect();
            let removed: Vec<Session> = keys.iter().filter_map(|k| state.remove(k)).collect();
            (host, removed)
        };

        for session in &removed {
            session.connection.close();
        }
        let names: Vec<String> = removed.iter().map(|s| s.name.clone()).collect();

        match self.settings.add_ban(&host, names.clone()) {
            Ok(()) => {
                for session in removed {
                    self.announce(ServerMessage::event(EventType::Ban, session.name, session.color));
                }
                Ok(names)
            }
            Err(e) => {
                warn!(host = %host, name, error = %e, "Failed to save ban, sessions were kicked");
                for session in removed {
                    self.announce(ServerMessage::event(EventType::Kick, session.name, session.color));
                }
                Err(format!("Unable to ban {name}: {e}"))
            }
        }
    }

    /// Grant moderator; an admin keeps admin
    pub fn mod_session(&self, name: &str) -> std::result::Result<(), String> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| not_found(name))?;
        session.tier = session.tier.max(Tier::Mod);
        session.connection.send_message(&direct_text("You have been modded."));
        session.connection.send_message(&auth_push(session.tier));
        info!(name = %session.name, tier = %session.tier, "User modded");
        Ok(())
    }

    /// Drop back to user tier
    pub fn unmod(&self, name: &str) -> std::result::Result<(), String> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| not_found(name))?;
        session.tier = Tier::User;
        session.connection.send_message(&direct_text("You have been unmodded."));
        session.connection.send_message(&auth_push(Tier::User));
        info!(name = %session.name, "User unmodded");
        Ok(())
    }

    /// Raise a session to `tier` (used by `/auth`)
    pub fn set_tier(&self, id: &ConnectionId, tier: Tier) -> std::result::Result<(), String> {
        let mut state = self.state.lock();
        let key = state.key_for(id).ok_or_else(|| "Unable to find session".to_string())?;
        let session = state
            .sessions
            .get_mut(&key)
            .ok_or_else(|| "Unable to find session".to_string())?;
        session.tier = tier;
        session.connection.send_message(&auth_push(tier));
        Ok(())
    }

    /// Set another session's color and lock it
    pub fn force_color_change(&self, name: &str, color: &str) -> std::result::Result<(), String> {
        let mut state = self.state.lock();
        let session = state
            .sessions
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| not_found(name))?;
        session.color = color.to_string();
        session.color_forced = true;
        session.connection.send_message(&ServerMessage::hidden(
            ClientDataType::Color,
            serde_json::Value::String(session.color.clone()),
        ));
        info!(name = %session.name, color, "Color forced");
        Ok(())
    }

    /// Self-service color change, refused once a color was forced
    pub fn set_color(&self, id: &ConnectionId, color: &str) -> std::result::Result<(), String> {
        let mut state = self.state.lock();
        let key = state.key_for(id).ok_or_else(|| "Unable to find session".to_string())?;
        let session = state
            .sessions
            .get_mut(&key)
            .ok_or_else(|| "Unable to find session".to_string())?;
        if session.color_forced {
            return Err("You are not allowed to change your color.".to_string());
        }
        session.color = color.to_string();
        debug!(name = %session.name, color, "Color changed");
        Ok(())
    }

    /// Self rename; returns the previous name
    pub fn rename(&self, id: &ConnectionId, new_name: &str) -> std::result::Result<String, String> {
        validate_name(new_name).map_err(|_| format!("Invalid name: {new_name}"))?;

        let (old_name, color) = {
            let mut state = self.state.lock();
            let key = state.key_for(id).ok_or_else(|| "Unable to find session".to_string())?;
            let current = state
                .sessions
                .get(&key)
                .ok_or_else(|| "Unable to find session".to_string())?;
            if current.name_forced {
                return Err(
                    "You cannot change your name once it has been changed by an admin.".to_string(),
                );
            }
            let old_name = current.name.clone();
            let session = state.rename(&key, new_name)?;
            (old_name, session.color.clone())
        };

        info!(old = %old_name, new = new_name, "User renamed");
        self.announce(ServerMessage::event(
            EventType::NameChange,
            format!("{old_name}:{new_name}"),
            color,
        ));
        Ok(old_name)
    }

    /// Rename another session and lock its name
    pub fn force_rename(&self, old_name: &str, new_name: &str) -> std::result::Result<(), String> {
        validate_name(new_name).map_err(|_| format!("Invalid name: {new_name}"))?;

        let (previous, color) = {
            let mut state = self.state.lock();
            let key = old_name.to_lowercase();
            let previous = state
                .sessions
                .get(&key)
                .map(|s| s.name.clone())
                .ok_or_else(|| not_found(old_name))?;
            let session = state.rename(&key, new_name)?;
            session.name_forced = true;
            (previous, session.color.clone())
        };

        info!(old = %previous, new = new_name, "User renamed by admin");
        self.announce(ServerMessage::event(
            EventType::NameChangeForced,
            format!("{previous}:{new_name}"),
            color,
        ));
        Ok(())
    }

    /// Update the playing state and queue its directive
    ///
    /// The state changes even when the queue is full; late joiners still
    /// receive it.
    pub fn set_playing(
        &self,
        title: impl Into<String>,
        link: impl Into<String>,
    ) -> std::result::Result<(), String> {
        let directive = {
            let mut state = self.state.lock();
            state.playing_title = title.into();
            state.playing_link = link.into();
            state.playing_directive()
        };
        self.enqueue(directive)
    }

    pub fn clear_playing(&self) -> std::result::Result<(), String> {
        self.set_playing(String::new(), String::new())
    }

    /// Current title and link
    #[must_use]
    pub fn playing(&self) -> (String, String) {
        let state = self.state.lock();
        (state.playing_title.clone(), state.playing_link.clone())
    }

    /// Display names, sorted ignoring case
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut keyed: Vec<(&String, &Session)> = state.sessions.iter().collect();
        keyed.sort_by(|a, b| a.0.cmp(b.0));
        keyed.into_iter().map(|(_, s)| s.name.clone()).collect()
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// `(name, host)` for every session, sorted by name
    #[must_use]
    pub fn hosts(&self) -> Vec<(String, String)> {
        let state = self.state.lock();
        let mut hosts: Vec<(String, String)> = state
            .sessions
            .values()
            .map(|s| (s.name.clone(), s.connection.host().to_string()))
            .collect();
        hosts.sort_by_key(|(name, _)| name.to_lowercase());
        hosts
    }

    #[must_use]
    pub fn session(&self, name: &str) -> Option<SessionInfo> {
        self.state
            .lock()
            .sessions
            .get(&name.to_lowercase())
            .map(Session::info)
    }

    #[must_use]
    pub fn session_by_id(&self, id: &ConnectionId) -> Option<SessionInfo> {
        let state = self.state.lock();
        let key = state.by_connection.get(id)?;
        state.sessions.get(key).map(Session::info)
    }

    /// Write a message to one session only, bypassing the queue
    ///
    /// A session whose buffer cannot take it is disconnected.
    pub fn send_to(&self, id: &ConnectionId, message: &ServerMessage) -> bool {
        let dropped = {
            let mut state = self.state.lock();
            let Some(key) = state.key_for(id) else {
                return false;
            };
            let Some(session) = state.sessions.get(&key) else {
                return false;
            };
            match session.deliver(std::slice::from_ref(message)) {
                Ok(()) => return true,
                Err(reason) => {
                    warn!(name = %session.name, reason = %reason, "Dropping session on direct send");
                    state.remove(&key)
                }
            }
        };
        if let Some(session) = dropped {
            self.finish_leave(&session);
        }
        false
    }

    /// Queue a room-wide message for the next flush
    ///
    /// Never waits: a full queue hands the error back so the producer can
    /// tell whoever sent the message.
    pub fn enqueue(&self, message: ServerMessage) -> std::result::Result<(), String> {
        self.queue_tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(message) => {
                warn!(kind = %message.kind(), "Outbound queue full, dropping message");
                QUEUE_FULL_MESSAGE.to_string()
            }
            TrySendError::Closed(_) => {
                warn!("Outbound queue closed");
                "Chat is shutting down".to_string()
            }
        })
    }

    /// Queue a side effect of a change that already happened
    fn announce(&self, message: ServerMessage) {
        // Dropped announcements are logged by enqueue
        let _ = self.enqueue(message);
    }

    /// Queue a message only moderators and admins receive
    pub fn notify_moderators(&self, text: impl Into<String>) {
        self.announce(ServerMessage::chat(
            "",
            "",
            text,
            Tier::User,
            MessageType::Notice,
        ));
    }

    /// Drain the queue and give every session one write with the batch
    ///
    /// Sessions that cannot take the write are disconnected; their leave
    /// events go out with the next batch. Returns the batch size.
    pub fn flush(&self) -> usize {
        let batch: Vec<ServerMessage> = {
            let mut queue = self.queue_rx.lock();
            std::iter::from_fn(|| queue.try_recv().ok()).collect()
        };
        if batch.is_empty() {
            return 0;
        }

        let dropped: Vec<Session> = {
            let mut state = self.state.lock();
            let failed: Vec<String> = state
                .sessions
                .iter()
                .filter_map(|(key, session)| match session.deliver(&batch) {
                    Ok(()) => None,
                    Err(reason) => {
                        warn!(name = %session.name, reason = %reason, "Disconnecting slow session");
                        Some(key.clone())
                    }
                })
                .collect();
            failed.iter().filter_map(|key| state.remove(key)).collect()
        };

        for session in &dropped {
            self.finish_leave(session);
        }

        self.stats.messages_out(batch.len() as u64);
        batch.len()
    }
}
