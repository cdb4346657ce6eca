//! Connected agents and the registry that owns them.
//!
//! A [`Peer`] is created when a connection sends a `register` event and is
//! removed when that connection goes away. The [`PeerRegistry`] is the only
//! owner of the peer set; everything else works from point-in-time
//! snapshots, so fan-out never iterates while holding the registry lock.

/// The registry of currently connected peers.
pub mod registry;

pub use registry::PeerRegistry;

use crate::broadcast::DeliveryFailure;
use crate::protocol::ServerEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use utoipa::ToSchema;
use uuid::Uuid;

/// Identity of a registered peer. Fresh per registration, stable across
/// re-registration on the same connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PeerId(Uuid);

impl PeerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Events a connection may have queued before fan-out starts skipping it.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Outbound side of one transport connection.
///
/// The transport owns the receiving half and writes whatever arrives to the
/// socket. Once that receiver is dropped the handle reports itself as not
/// live and every send fails with [`DeliveryFailure::ConnectionClosed`].
/// A receiver that stops draining fills the queue, after which sends fail
/// with [`DeliveryFailure::Backpressure`] until it catches up.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Arc<ServerEvent>>,
}

impl ConnectionHandle {
    /// Create a handle together with the receiver its events are written to.
    pub fn channel() -> (Self, mpsc::Receiver<Arc<ServerEvent>>) {
        Self::with_capacity(OUTBOUND_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<Arc<ServerEvent>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue an event for this connection without waiting for the write.
    pub fn send(&self, event: Arc<ServerEvent>) -> Result<(), DeliveryFailure> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryFailure::Backpressure(self.id),
            TrySendError::Closed(_) => DeliveryFailure::ConnectionClosed(self.id),
        })
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

/// A connected agent.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: PeerId,
    /// Free-form platform label supplied at registration ("claude", "manus", ...)
    pub platform: String,
    pub submitter_id: Option<String>,
    pub connection: ConnectionHandle,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Peer {
    pub fn summary(&self) -> PeerSummary {
        PeerSummary {
            id: self.id,
            platform: self.platform.clone(),
            connected_at: self.connected_at,
        }
    }
}

/// Wire view of a peer used in status events and REST responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeerSummary {
    pub id: PeerId,
    pub platform: String,
    pub connected_at: DateTime<Utc>,
}
