// MovieNight API Library
//
// HTTP front door for the chat: websocket upgrade, help page and health

pub mod http;
pub mod impls;

pub use http::{create_router, AppState};
