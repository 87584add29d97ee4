//! Server lifecycle management
//!
//! Starts the broadcaster and the HTTP server, then waits for a shutdown
//! signal and stops both.

use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use movienight_core::{
    service::{Broadcaster, ChatService},
    Config,
};

pub struct MovieNightServer {
    config: Config,
    chat: ChatService,
    listen: String,
}

impl MovieNightServer {
    pub const fn new(config: Config, chat: ChatService, listen: String) -> Self {
        Self {
            config,
            chat,
            listen,
        }
    }

    /// Start all components and wait for shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();

        let period = Duration::from_millis(self.config.chat.flush_interval_ms);
        let broadcaster = Broadcaster::spawn(self.chat.room().clone(), period, shutdown.clone());
        info!(interval_ms = self.config.chat.flush_interval_ms, "Broadcaster started");

        let addr: SocketAddr = self
            .listen
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address '{}': {e}", self.listen))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}"))?;
        info!("HTTP server listening on {}", addr);

        let router = movienight_api::create_router(self.chat.clone(), self.config.chat.outbound_buffer);

        let graceful = {
            let shutdown = shutdown.clone();
            async move {
                shutdown_signal().await;
                info!("Shutdown signal received, starting graceful shutdown...");
                shutdown.cancel();
            }
        };

        if let Err(e) = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(graceful)
            .await
        {
            error!("HTTP server error: {}", e);
        }

        // The server may also stop on its own
        shutdown.cancel();
        if let Err(e) = broadcaster.await {
            error!("Broadcaster task failed: {}", e);
        }

        info!(summary = %self.chat.stats().snapshot().summary(), "MovieNight server stopped");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
