//! WebSocket transport for the chat
//!
//! Adapts the axum websocket to the [`ClientStream`] and [`FrameSink`]
//! traits; all connection logic lives in `impls::messaging`.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use movienight_core::service::ConnectionHandle;
use movienight_proto::{ClientMessage, JsonCodec};
use std::net::SocketAddr;
use tracing::{debug, info};

use crate::http::AppState;
use crate::impls::messaging::{run_writer, ClientStream, ConnectionDriver, FrameSink};

/// Largest accepted inbound frame
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

struct WebSocketStream {
    receiver: SplitStream<WebSocket>,
}

#[async_trait::async_trait]
impl ClientStream for WebSocketStream {
    async fn recv(&mut self) -> Option<Result<ClientMessage, String>> {
        loop {
            match self.receiver.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(JsonCodec::decode_client_message(text.as_str()).map_err(|e| e.to_string()));
                }
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Err(e)) => return Some(Err(format!("WebSocket error: {e}"))),
                Some(Ok(Message::Binary(_))) => {
                    return Some(Err("binary frames are not supported".to_string()));
                }
                // Ping and pong are answered by axum
                Some(Ok(_)) => {}
            }
        }
    }
}

struct WebSocketSink {
    sink: SplitSink<WebSocket, Message>,
}

#[async_trait::async_trait]
impl FrameSink for WebSocketSink {
    async fn send_frame(&mut self, frame: String) -> Result<(), String> {
        self.sink
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| e.to_string())
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

/// Address a connection is identified (and banned) by
///
/// The first `X-Forwarded-For` entry wins over the peer address.
#[must_use]
pub fn client_host(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

/// `GET /ws`
pub async fn websocket_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let host = client_host(&headers, Some(peer));
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, host))
}

async fn handle_socket(socket: WebSocket, state: AppState, host: String) {
    let (handle, frames) = ConnectionHandle::new(host, state.outbound_buffer);
    info!(connection_id = %handle.id(), host = %handle.host(), "WebSocket connection established");

    let (sink, receiver) = socket.split();
    let shutdown = handle.shutdown_token();
    let writer = tokio::spawn(async move {
        let mut sink = WebSocketSink { sink };
        run_writer(frames, shutdown, &mut sink).await;
    });

    let mut stream = WebSocketStream { receiver };
    let connection_id = handle.id().clone();
    ConnectionDriver::new(state.chat.clone(), handle).run(&mut stream).await;

    if let Err(e) = writer.await {
        debug!(connection_id = %connection_id, error = %e, "Writer task failed");
    }
    info!(connection_id = %connection_id, "WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_host_prefers_forwarded_for() {
        let peer: SocketAddr = "192.168.1.5:40000".parse().unwrap();

        let mut headers = HeaderMap::new();
        assert_eq!(client_host(&headers, Some(peer)), "192.168.1.5");
        assert_eq!(client_host(&headers, None), "unknown");

        headers.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_host(&headers, Some(peer)), "203.0.113.7");

        headers.insert("X-Forwarded-For", HeaderValue::from_static(" "));
        assert_eq!(client_host(&headers, Some(peer)), "192.168.1.5");
    }
}
