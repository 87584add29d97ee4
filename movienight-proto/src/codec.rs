//! JSON codec for server and client envelopes
//!
//! Decoding is two-phase: the `Type` discriminator is read first (field order
//! in the input does not matter), then `Data` is decoded with the schema that
//! belongs to that discriminator. Unknown discriminators are rejected
//! explicitly instead of falling through to a generic parse error.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::client::{ClientDataType, ClientMessage};
use crate::server::{MessageKind, ServerMessage};

/// Separator between envelopes inside one flushed batch
pub const BATCH_SEPARATOR: char = '\n';

const SNIPPET_LEN: usize = 24;

/// Decoding error; every variant names the offending token
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed envelope at `{token}`: {source}")]
    Malformed {
        token: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown message type `{0}`")]
    UnknownType(String),

    #[error("message type `{0}` has no Data")]
    MissingData(String),

    #[error("invalid Data for message type `{kind}`: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "Type")]
    kind: Value,
    #[serde(rename = "Data", default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct RawClientEnvelope {
    #[serde(rename = "Type")]
    kind: Value,
    #[serde(rename = "Message", default)]
    message: String,
}

/// Stateless JSON codec used by the transport and the broadcaster
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a server message as a single-line JSON envelope
    pub fn encode_server_message(message: &ServerMessage) -> Result<String, serde_json::Error> {
        serde_json::to_string(message)
    }

    /// Decode a server envelope
    pub fn decode_server_message(input: &str) -> Result<ServerMessage, DecodeError> {
        let raw: RawEnvelope = parse(input)?;
        let token = discriminator_token(&raw.kind);
        let kind = MessageKind::from_token(&token).ok_or_else(|| DecodeError::UnknownType(token.clone()))?;
        let data = raw.data.ok_or_else(|| DecodeError::MissingData(token.clone()))?;

        let payload_err = |source| DecodeError::InvalidPayload {
            kind: token.clone(),
            source,
        };

        let message = match kind {
            MessageKind::Chat => ServerMessage::Chat(serde_json::from_value(data).map_err(payload_err)?),
            MessageKind::Error => ServerMessage::Error(serde_json::from_value(data).map_err(payload_err)?),
            MessageKind::Command => ServerMessage::Command(serde_json::from_value(data).map_err(payload_err)?),
            MessageKind::Event => ServerMessage::Event(serde_json::from_value(data).map_err(payload_err)?),
            MessageKind::Hidden => ServerMessage::Hidden(serde_json::from_value(data).map_err(payload_err)?),
        };

        Ok(message)
    }

    /// Encode a batch of server messages, one envelope per line, in order
    pub fn encode_batch(messages: &[ServerMessage]) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for (i, message) in messages.iter().enumerate() {
            if i > 0 {
                out.push(BATCH_SEPARATOR);
            }
            out.push_str(&Self::encode_server_message(message)?);
        }
        Ok(out)
    }

    /// Decode a batch produced by [`JsonCodec::encode_batch`]
    pub fn decode_batch(input: &str) -> Result<Vec<ServerMessage>, DecodeError> {
        input
            .split(BATCH_SEPARATOR)
            .filter(|line| !line.trim().is_empty())
            .map(Self::decode_server_message)
            .collect()
    }

    pub fn encode_client_message(message: &ClientMessage) -> Result<String, serde_json::Error> {
        serde_json::to_string(message)
    }

    /// Decode a client envelope, rejecting unknown kinds by name
    pub fn decode_client_message(input: &str) -> Result<ClientMessage, DecodeError> {
        let raw: RawClientEnvelope = parse(input)?;
        let kind: ClientDataType = serde_json::from_value(raw.kind.clone())
            .map_err(|_| DecodeError::UnknownType(discriminator_token(&raw.kind)))?;

        Ok(ClientMessage {
            kind,
            message: raw.message,
        })
    }
}

fn parse<'a, T: Deserialize<'a>>(input: &'a str) -> Result<T, DecodeError> {
    serde_json::from_str(input).map_err(|source| {
        let token = if source.is_eof() {
            "<end of input>".to_string()
        } else {
            snippet_at(input, source.line(), source.column())
        };
        DecodeError::Malformed { token, source }
    })
}

fn discriminator_token(kind: &Value) -> String {
    match kind {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text around a serde_json error position (1-based line and column),
/// starting one character before the reported column
fn snippet_at(input: &str, line: usize, column: usize) -> String {
    let text = input.lines().nth(line.saturating_sub(1)).unwrap_or_default();
    let snippet: String = text
        .chars()
        .skip(column.saturating_sub(2))
        .take(SNIPPET_LEN)
        .collect();

    if snippet.trim().is_empty() {
        "<end of input>".to_string()
    } else {
        snippet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{CommandType, EventType, MessageType, Tier};
    use serde_json::json;

    fn every_variant() -> Vec<ServerMessage> {
        vec![
            ServerMessage::chat("Alice", "#ABCDEF", "hello <b>there</b>", Tier::Mod, MessageType::Action),
            ServerMessage::error("That name is taken"),
            ServerMessage::command(
                CommandType::Playing,
                vec!["Movie Title".to_string(), "https://example.com".to_string()],
            ),
            ServerMessage::event(EventType::NameChange, "old:new", "red"),
            ServerMessage::hidden(ClientDataType::Users, json!(["Alice", "Bob"])),
        ]
    }

    #[test]
    fn test_round_trip_every_variant() {
        for original in every_variant() {
            let encoded = JsonCodec::encode_server_message(&original).unwrap();
            let decoded = JsonCodec::decode_server_message(&encoded).unwrap();
            assert_eq!(decoded.kind(), original.kind());
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn test_decode_data_before_type() {
        let input = r#"{"Data":{"message":"boom"},"Type":"error"}"#;
        let decoded = JsonCodec::decode_server_message(input).unwrap();
        assert_eq!(decoded, ServerMessage::error("boom"));
    }

    #[test]
    fn test_decode_unknown_type() {
        let err = JsonCodec::decode_server_message(r#"{"Type":"telepathy","Data":{}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType(ref t) if t == "telepathy"));
        assert!(err.to_string().contains("telepathy"));
    }

    #[test]
    fn test_decode_numeric_type_is_unknown() {
        let err = JsonCodec::decode_server_message(r#"{"Type":7,"Data":{}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType(ref t) if t == "7"));
    }

    #[test]
    fn test_decode_truncated() {
        let err = JsonCodec::decode_server_message(r#"{"Type":"chat","Data":{"from":"Al"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
        assert!(err.to_string().contains("end of input"));
    }

    #[test]
    fn test_decode_malformed_names_token() {
        let err = JsonCodec::decode_server_message(r#"{"Type": chat}"#).unwrap_err();
        match err {
            DecodeError::Malformed { token, .. } => assert!(token.contains("chat")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_missing_data() {
        let err = JsonCodec::decode_server_message(r#"{"Type":"event"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingData(ref t) if t == "event"));
    }

    #[test]
    fn test_decode_payload_schema_mismatch() {
        let err = JsonCodec::decode_server_message(r#"{"Type":"command","Data":{"command":"dance"}}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPayload { ref kind, .. } if kind == "command"));
    }

    #[test]
    fn test_batch_preserves_order() {
        let messages = every_variant();
        let encoded = JsonCodec::encode_batch(&messages).unwrap();
        assert_eq!(encoded.lines().count(), messages.len());
        assert_eq!(JsonCodec::decode_batch(&encoded).unwrap(), messages);
    }

    #[test]
    fn test_batch_line_safety() {
        // A newline inside a payload must not split the batch
        let messages = vec![
            ServerMessage::error("line one\nline two"),
            ServerMessage::error("second"),
        ];
        let encoded = JsonCodec::encode_batch(&messages).unwrap();
        assert_eq!(JsonCodec::decode_batch(&encoded).unwrap(), messages);
    }

    #[test]
    fn test_client_message() {
        let decoded = JsonCodec::decode_client_message(r#"{"Message":"hi","Type":"message"}"#).unwrap();
        assert_eq!(decoded, ClientMessage::text("hi"));

        let ping = JsonCodec::decode_client_message(r#"{"Type":"ping"}"#).unwrap();
        assert_eq!(ping.kind, ClientDataType::Ping);
        assert!(ping.message.is_empty());

        let err = JsonCodec::decode_client_message(r#"{"Type":"shout","Message":"x"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownType(ref t) if t == "shout"));
    }
}
