use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters reported by `/stats`
pub struct ChatStats {
    started_at: DateTime<Utc>,
    messages_in: AtomicU64,
    messages_out: AtomicU64,
    connections: AtomicU64,
    peak_connections: AtomicU64,
}

impl ChatStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            messages_in: AtomicU64::new(0),
            messages_out: AtomicU64::new(0),
            connections: AtomicU64::new(0),
            peak_connections: AtomicU64::new(0),
        }
    }

    pub fn message_in(&self) {
        self.messages_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_out(&self, count: u64) {
        self.messages_out.fetch_add(count, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        let now = self.connections.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_connections.fetch_max(now, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        // Saturate instead of wrapping if a close is reported twice
        let _ = self
            .connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: Utc::now() - self.started_at,
            messages_in: self.messages_in.load(Ordering::Relaxed),
            messages_out: self.messages_out.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            peak_connections: self.peak_connections.load(Ordering::Relaxed),
        }
    }
}

impl Default for ChatStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub uptime: chrono::Duration,
    pub messages_in: u64,
    pub messages_out: u64,
    pub connections: u64,
    pub peak_connections: u64,
}

impl StatsSnapshot {
    /// One-line summary shown in chat
    #[must_use]
    pub fn summary(&self) -> String {
        let secs = self.uptime.num_seconds().max(0);
        format!(
            "Connections: {} (peak {}) Messages in: {} Messages out: {} Uptime: {}h{:02}m{:02}s",
            self.connections,
            self.peak_connections,
            self.messages_in,
            self.messages_out,
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }
}
