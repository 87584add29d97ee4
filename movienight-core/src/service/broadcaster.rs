use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

use super::room::Room;

/// Periodic flush of the room's outbound queue
pub struct Broadcaster;

impl Broadcaster {
    /// Flush every `period` until `shutdown` fires, then flush once more
    /// so messages queued during shutdown still go out
    #[must_use]
    pub fn spawn(
        room: Arc<Room>,
        period: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let sent = room.flush();
                        if sent > 0 {
                            trace!(messages = sent, "Flushed batch");
                        }
                    }
                }
            }

            room.flush();
            info!("Broadcaster stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{connect, decode_frames, test_room};
    use movienight_proto::ServerMessage;

    #[tokio::test(start_paused = true)]
    async fn test_batches_messages_within_one_period() {
        let room = Arc::new(test_room());
        let (handle, mut rx) = connect("10.0.0.1");
        room.join("Viewer", handle).unwrap();
        let _playing = rx.recv().await.unwrap();

        let shutdown = CancellationToken::new();
        let task = Broadcaster::spawn(room.clone(), Duration::from_millis(100), shutdown.clone());

        // Let the first tick carry the join event
        let _join = rx.recv().await.unwrap();

        room.enqueue(ServerMessage::error("a")).unwrap();
        room.enqueue(ServerMessage::error("b")).unwrap();
        room.enqueue(ServerMessage::error("c")).unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(
            decode_frames(&frame),
            vec![
                ServerMessage::error("a"),
                ServerMessage::error("b"),
                ServerMessage::error("c"),
            ]
        );

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_flush_on_shutdown() {
        let room = Arc::new(test_room());
        let (handle, mut rx) = connect("10.0.0.1");
        room.join("Viewer", handle).unwrap();
        let _playing = rx.recv().await.unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let task = Broadcaster::spawn(room.clone(), Duration::from_secs(3600), shutdown);
        task.await.unwrap();

        // The join event was still delivered
        let frame = rx.recv().await.unwrap();
        assert_eq!(decode_frames(&frame).len(), 1);
    }
}
