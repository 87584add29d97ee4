//! MovieNight wire protocol
//!
//! JSON envelopes exchanged between the chat server and viewers over the
//! websocket. Server messages are a discriminated union keyed by `Type`;
//! client messages carry a kind and a single text payload.

pub mod client;
pub mod codec;
pub mod server;

pub use client::{ClientDataType, ClientMessage};
pub use codec::{DecodeError, JsonCodec};
pub use server::{
    ChatMessage, CommandDirective, CommandType, ErrorMessage, EventType, HiddenInstruction,
    MessageKind, MessageType, RoomEvent, ServerMessage, Tier,
};
