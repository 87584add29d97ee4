//! Transport-independent connection handling
//!
//! A connection is two halves. [`ConnectionDriver`] owns the inbound side:
//! the join handshake, then every decoded client message is handed to the
//! chat service until the stream ends or the session is shut down.
//! [`run_writer`] owns the outbound side and drains the session's bounded
//! channel into the transport. The websocket handler only provides the
//! [`ClientStream`] and [`FrameSink`] implementations.

use movienight_core::{
    models::SessionInfo,
    service::{ChatService, ConnectionHandle},
    Error,
};
use movienight_proto::{ClientDataType, ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Inbound half of a connection
#[async_trait::async_trait]
pub trait ClientStream: Send {
    /// Next decoded client message, `None` once the connection is closed
    async fn recv(&mut self) -> Option<Result<ClientMessage, String>>;
}

/// Outbound half of a connection
#[async_trait::async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, frame: String) -> Result<(), String>;

    /// Close the transport; errors are ignored
    async fn close(&mut self);
}

/// Per-connection inbound loop
pub struct ConnectionDriver {
    service: ChatService,
    handle: ConnectionHandle,
}

impl ConnectionDriver {
    #[must_use]
    pub const fn new(service: ChatService, handle: ConnectionHandle) -> Self {
        Self { service, handle }
    }

    /// Run until the client goes away or the session is shut down
    ///
    /// The session, if one was joined, is removed on return and the
    /// connection's shutdown token is cancelled so the writer stops.
    pub async fn run<S: ClientStream>(self, stream: &mut S) {
        let stats = self.service.stats().clone();
        stats.connection_opened();
        info!(connection_id = %self.handle.id(), host = %self.handle.host(), "Connection opened");

        if let Some(session) = self.handshake(stream).await {
            self.message_loop(stream, &session).await;
        }

        self.service.room().leave_connection(self.handle.id());
        self.handle.close();
        stats.connection_closed();
        info!(connection_id = %self.handle.id(), "Connection closed");
    }

    /// Wait for a usable display name
    ///
    /// Format and collision errors are answered and another attempt is
    /// awaited; a banned host is answered and dropped.
    async fn handshake<S: ClientStream>(&self, stream: &mut S) -> Option<SessionInfo> {
        let shutdown = self.handle.shutdown_token();

        loop {
            let message = tokio::select! {
                () = shutdown.cancelled() => return None,
                message = stream.recv() => message,
            };

            let message = match message {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    warn!(connection_id = %self.handle.id(), error = %e, "Invalid frame before join");
                    return None;
                }
                None => return None,
            };

            if message.kind != ClientDataType::Message {
                debug!(connection_id = %self.handle.id(), kind = ?message.kind, "Ignoring request before join");
                continue;
            }

            match self.service.room().join(message.message.trim(), self.handle.clone()) {
                Ok(session) => return Some(session),
                Err(e @ (Error::InvalidName { .. } | Error::NameTaken { .. })) => {
                    debug!(connection_id = %self.handle.id(), error = %e, "Join rejected, waiting for another name");
                    self.handle.send_message(&ServerMessage::error(e.join_message()));
                }
                Err(e) => {
                    info!(connection_id = %self.handle.id(), error = %e, "Join refused, closing connection");
                    self.handle.send_message(&ServerMessage::error(e.join_message()));
                    return None;
                }
            }
        }
    }

    async fn message_loop<S: ClientStream>(&self, stream: &mut S, session: &SessionInfo) {
        let shutdown = self.handle.shutdown_token();

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!(name = %session.name, "Session shut down by the server");
                    break;
                }
                message = stream.recv() => match message {
                    Some(Ok(message)) => self.service.handle_message(self.handle.id(), message),
                    Some(Err(e)) => {
                        warn!(name = %session.name, error = %e, "Invalid frame, dropping connection");
                        break;
                    }
                    None => {
                        debug!(name = %session.name, "Client disconnected");
                        break;
                    }
                },
            }
        }
    }
}

/// Forward frames from a session's channel to the transport
///
/// When `shutdown` fires, frames already queued (a kick notice, a ban
/// reply) are written before the transport is closed.
pub async fn run_writer<W: FrameSink>(
    mut frames: mpsc::Receiver<String>,
    shutdown: CancellationToken,
    sink: &mut W,
) {
    loop {
        tokio::select! {
            biased;
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send_frame(frame).await {
                        debug!(error = %e, "Failed to write frame");
                        shutdown.cancel();
                        break;
                    }
                }
                None => break,
            },
            () = shutdown.cancelled() => {
                while let Ok(frame) = frames.try_recv() {
                    if sink.send_frame(frame).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }
    sink.close().await;
}
