//! Best-effort fan-out of one event to many peers.
//!
//! Delivery is fire-and-forget: an event is queued on each target's
//! connection and the broadcaster moves on. A peer whose connection went away
//! after the snapshot was taken, or whose queue is full, is skipped, logged
//! and counted. It never aborts delivery to the remaining peers and never
//! fails the caller.

use crate::peers::{ConnectionId, Peer};
use crate::protocol::ServerEvent;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use utoipa::ToSchema;

/// Per-peer delivery failure during fan-out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    #[error("connection {0} is not draining its queue")]
    Backpressure(ConnectionId),
}

/// Running totals of fan-out outcomes.
#[derive(Debug, Default)]
pub struct FanoutStats {
    delivered: AtomicU64,
    skipped: AtomicU64,
}

impl FanoutStats {
    pub fn snapshot(&self) -> FanoutSnapshot {
        FanoutSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FanoutSnapshot {
    /// Events queued on a live connection
    pub delivered: u64,
    /// Events dropped because the target connection was gone or backed up
    pub skipped: u64,
}

#[derive(Debug, Default)]
pub struct Broadcaster {
    stats: FanoutStats,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every peer in `targets` and return how many
    /// deliveries succeeded.
    pub fn broadcast(&self, event: ServerEvent, targets: &[Peer]) -> usize {
        let kind = event.kind();
        let event = Arc::new(event);
        let mut delivered = 0;

        for peer in targets {
            let outcome = if peer.connection.is_live() {
                peer.connection.send(Arc::clone(&event))
            } else {
                Err(DeliveryFailure::ConnectionClosed(peer.connection.id()))
            };

            match outcome {
                Ok(()) => delivered += 1,
                Err(e) => {
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        peer_id = %peer.id,
                        platform = %peer.platform,
                        event = kind,
                        error = %e,
                        "Skipping peer during fan-out"
                    );
                }
            }
        }

        self.stats
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        tracing::debug!(
            event = kind,
            delivered,
            targets = targets.len(),
            "Broadcast complete"
        );

        delivered
    }

    pub fn stats(&self) -> FanoutSnapshot {
        self.stats.snapshot()
    }
}
