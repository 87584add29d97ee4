//! Inbound client message handling

use movienight_proto::{ClientDataType, ClientMessage, MessageType, ServerMessage};
use std::sync::Arc;
use tracing::debug;

use super::commands::{CommandRegistry, CommandResult};
use super::emotes::EmoteTable;
use super::formatting::{collapse_whitespace, escape_html, format_links, truncate_escaped};
use super::room::{direct_text, Room};
use super::settings::SettingsStore;
use super::stats::ChatStats;
use crate::models::{ConnectionId, SessionInfo};

pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 400;

/// Everything a connection or a command handler needs, passed explicitly
#[derive(Clone)]
pub struct ChatService {
    room: Arc<Room>,
    settings: Arc<SettingsStore>,
    emotes: Arc<EmoteTable>,
    commands: Arc<CommandRegistry>,
    stats: Arc<ChatStats>,
    max_message_length: usize,
}

impl ChatService {
    pub fn new(
        room: Arc<Room>,
        settings: Arc<SettingsStore>,
        emotes: Arc<EmoteTable>,
        stats: Arc<ChatStats>,
    ) -> Self {
        Self {
            room,
            settings,
            emotes,
            commands: Arc::new(CommandRegistry::new()),
            stats,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }

    #[must_use]
    pub fn with_max_message_length(mut self, max_message_length: usize) -> Self {
        self.max_message_length = max_message_length.max(1);
        self
    }

    #[must_use]
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    #[must_use]
    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    #[must_use]
    pub fn emotes(&self) -> &Arc<EmoteTable> {
        &self.emotes
    }

    #[must_use]
    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    #[must_use]
    pub fn stats(&self) -> &Arc<ChatStats> {
        &self.stats
    }

    /// Handle one decoded frame from a joined connection
    pub fn handle_message(&self, id: &ConnectionId, message: ClientMessage) {
        let Some(caller) = self.room.session_by_id(id) else {
            debug!(connection_id = %id, "Message from a connection without a session");
            return;
        };
        self.stats.message_in();

        match message.kind {
            ClientDataType::Message => self.handle_text(&caller, &message.message),
            ClientDataType::Users => {
                let names = self.room.names();
                self.push_hidden(&caller, ClientDataType::Users, serde_json::json!(names));
            }
            ClientDataType::Auth => {
                let tier = serde_json::Value::String(caller.tier.as_str().to_string());
                self.push_hidden(&caller, ClientDataType::Auth, tier);
            }
            ClientDataType::Color => {
                let color = serde_json::Value::String(caller.color.clone());
                self.push_hidden(&caller, ClientDataType::Color, color);
            }
            ClientDataType::Emote => {
                let emotes = self.emotes.snapshot();
                self.push_hidden(&caller, ClientDataType::Emote, serde_json::json!(emotes));
            }
            ClientDataType::MessageCount => {
                let count = self.settings.max_message_count();
                self.push_hidden(&caller, ClientDataType::MessageCount, serde_json::json!(count));
            }
            ClientDataType::Ping => {}
        }
    }

    fn push_hidden(&self, caller: &SessionInfo, subtype: ClientDataType, payload: serde_json::Value) {
        self.room
            .send_to(&caller.id, &ServerMessage::hidden(subtype, payload));
    }

    /// Plain text: a `/command` or a chat line
    pub fn handle_text(&self, caller: &SessionInfo, raw: &str) {
        let text = collapse_whitespace(&escape_html(raw));
        if text.is_empty() {
            return;
        }

        if let Some(command_line) = text.strip_prefix('/') {
            let mut parts = command_line.split(' ').filter(|p| !p.is_empty());
            let token = parts.next().unwrap_or_default().to_lowercase();
            let args: Vec<String> = parts.map(str::to_string).collect();

            match self.run_command(caller, &token, &args) {
                Ok(response) if response.is_empty() => {}
                Ok(response) => {
                    self.room.send_to(&caller.id, &direct_text(response));
                }
                Err(error) => {
                    self.room.send_to(&caller.id, &ServerMessage::error(error));
                }
            }
            return;
        }

        let mut text = truncate_escaped(&text, self.max_message_length).to_string();
        debug!(name = %caller.name, message = %text, "Chat message");

        if caller.is_mod() {
            text = format_links(&text);
        }
        let text = self.emotes.substitute(&text);

        let message = ServerMessage::chat(
            caller.name.clone(),
            caller.color.clone(),
            text,
            caller.tier,
            MessageType::Chat,
        );
        if let Err(error) = self.room.enqueue(message) {
            self.room.send_to(&caller.id, &ServerMessage::error(error));
        }
    }

    pub fn run_command(&self, caller: &SessionInfo, token: &str, args: &[String]) -> CommandResult {
        self.commands.run(self, caller, token, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::room::QUEUE_FULL_MESSAGE;
    use crate::test_helpers::{connect, decode_frames, drain, test_service, test_service_with_queue};
    use movienight_proto::{ChatMessage, HiddenInstruction, Tier};

    fn chat_text(message: &ServerMessage) -> &str {
        match message {
            ServerMessage::Chat(ChatMessage { message, .. }) => message,
            other => panic!("expected chat, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_escaped_collapsed_and_broadcast() {
        let service = test_service();
        let (handle, mut rx) = connect("10.0.0.1");
        let caller = service.room().join("Alice", handle).unwrap();
        service.room().flush();
        drain(&mut rx);

        service.handle_text(&caller, "  <b>hi</b>\n\tthere  ");
        service.room().flush();

        let batch = decode_frames(&rx.try_recv().unwrap());
        assert_eq!(chat_text(&batch[0]), "&lt;b&gt;hi&lt;/b&gt; there");
    }

    #[test]
    fn test_whitespace_only_dropped() {
        let service = test_service();
        let (handle, mut rx) = connect("10.0.0.1");
        let caller = service.room().join("Alice", handle).unwrap();
        service.room().flush();
        drain(&mut rx);

        service.handle_text(&caller, " \n\t\u{200b} ");
        assert_eq!(service.room().flush(), 0);
    }

    #[test]
    fn test_long_text_truncated() {
        let service = test_service();
        let (handle, mut rx) = connect("10.0.0.1");
        let caller = service.room().join("Alice", handle).unwrap();
        service.room().flush();
        drain(&mut rx);

        service.handle_text(&caller, &"x".repeat(1000));
        service.room().flush();

        let batch = decode_frames(&rx.try_recv().unwrap());
        assert_eq!(chat_text(&batch[0]).len(), DEFAULT_MAX_MESSAGE_LENGTH);
    }

    #[test]
    fn test_links_only_for_moderators() {
        let service = test_service();
        let (u, mut rx) = connect("10.0.0.1");
        let (m, _rx_m) = connect("10.0.0.2");
        let user = service.room().join("Usery", u).unwrap();
        service.room().join("Moddy", m).unwrap();
        service.room().mod_session("Moddy").unwrap();
        let moderator = service.room().session("Moddy").unwrap();
        service.room().flush();
        drain(&mut rx);

        service.handle_text(&user, "https://example.com");
        service.handle_text(&moderator, "https://example.com");
        service.room().flush();

        let batch = decode_frames(&rx.try_recv().unwrap());
        assert_eq!(chat_text(&batch[0]), "https://example.com");
        assert!(chat_text(&batch[1]).starts_with("<a href=\"https://example.com\""));
        assert!(matches!(
            &batch[1],
            ServerMessage::Chat(ChatMessage { level: Tier::Mod, .. })
        ));
    }

    #[test]
    fn test_emotes_substituted() {
        let service = test_service();
        let (handle, mut rx) = connect("10.0.0.1");
        let caller = service.room().join("Alice", handle).unwrap();
        service.room().flush();
        drain(&mut rx);

        service.handle_text(&caller, "nice Kappa");
        service.room().flush();

        let batch = decode_frames(&rx.try_recv().unwrap());
        assert!(chat_text(&batch[0]).contains(r#"<img src="/emotes/Kappa.png""#));
    }

    #[test]
    fn test_command_result_only_to_issuer() {
        let service = test_service();
        let (a, mut rx_a) = connect("10.0.0.1");
        let (b, mut rx_b) = connect("10.0.0.2");
        let alice = service.room().join("Alice", a).unwrap();
        service.room().join("Bobby", b).unwrap();
        service.room().flush();
        drain(&mut rx_a);
        drain(&mut rx_b);

        service.handle_text(&alice, "/COUNT");
        let reply = decode_frames(&rx_a.try_recv().unwrap());
        assert_eq!(chat_text(&reply[0]), "Users in chat: 2");
        assert!(matches!(
            &reply[0],
            ServerMessage::Chat(ChatMessage { subtype: MessageType::CommandResponse, .. })
        ));

        service.handle_text(&alice, "/kick Bobby");
        let reply = decode_frames(&rx_a.try_recv().unwrap());
        assert_eq!(reply, vec![ServerMessage::error("You are not a mod Jebaited")]);

        service.handle_text(&alice, "/nonsense");
        let reply = decode_frames(&rx_a.try_recv().unwrap());
        assert_eq!(reply, vec![ServerMessage::error("Invalid command.")]);

        assert_eq!(service.room().flush(), 0);
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_hidden_queries() {
        let service = test_service();
        let (handle, mut rx) = connect("10.0.0.1");
        let caller = service.room().join("Alice", handle).unwrap();
        drain(&mut rx);

        service.handle_message(&caller.id, ClientMessage::new(ClientDataType::Users, ""));
        let reply = decode_frames(&rx.try_recv().unwrap());
        assert_eq!(
            reply,
            vec![ServerMessage::hidden(ClientDataType::Users, serde_json::json!(["Alice"]))]
        );

        service.handle_message(&caller.id, ClientMessage::new(ClientDataType::Auth, ""));
        let reply = decode_frames(&rx.try_recv().unwrap());
        assert!(matches!(
            &reply[0],
            ServerMessage::Hidden(HiddenInstruction { subtype: ClientDataType::Auth, payload })
                if payload == "user"
        ));

        service.handle_message(&caller.id, ClientMessage::new(ClientDataType::MessageCount, ""));
        let reply = decode_frames(&rx.try_recv().unwrap());
        assert_eq!(
            reply,
            vec![ServerMessage::hidden(ClientDataType::MessageCount, serde_json::json!(300))]
        );

        service.handle_message(&caller.id, ClientMessage::new(ClientDataType::Ping, ""));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_tells_sender() {
        let service = test_service_with_queue(2);

        let (a, mut rx_a) = connect("10.0.0.1");
        let (b, _rx_b) = connect("10.0.0.2");
        let alice = service.room().join("Alice", a).unwrap();
        service.room().join("Bobby", b).unwrap();
        drain(&mut rx_a);

        // Both join events already fill the queue
        service.handle_text(&alice, "hello everyone");
        assert_eq!(
            decode_frames(&rx_a.try_recv().unwrap()),
            vec![ServerMessage::error(QUEUE_FULL_MESSAGE)]
        );

        service.room().flush();
        let batch = decode_frames(&rx_a.try_recv().unwrap());
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|m| !matches!(m, ServerMessage::Chat(_))));
    }

    #[test]
    fn test_message_from_unjoined_connection_ignored() {
        let service = test_service();
        service.handle_message(&ConnectionId::new(), ClientMessage::text("hello"));
        assert_eq!(service.room().flush(), 0);
        assert_eq!(service.stats().snapshot().messages_in, 0);
    }
}
