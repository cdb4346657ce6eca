use super::{ConnectionHandle, ConnectionId, Peer, PeerId};
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Registry of currently connected peers, keyed by their connection.
///
/// All operations take the lock for the duration of a single map operation
/// and never across I/O.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<ConnectionId, Peer>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the peer speaking on `connection`.
    ///
    /// Registering again on the same connection keeps the peer identity and
    /// replaces its labels.
    pub fn register(
        &self,
        platform: impl Into<String>,
        submitter_id: Option<String>,
        connection: ConnectionHandle,
    ) -> Peer {
        let now = Utc::now();
        let platform = platform.into();
        let mut peers = self.peers.write();

        let peer = peers
            .entry(connection.id())
            .and_modify(|existing| {
                existing.platform = platform.clone();
                existing.submitter_id = submitter_id.clone();
                existing.last_activity = now;
            })
            .or_insert_with(|| Peer {
                id: PeerId::new(),
                platform,
                submitter_id,
                connection,
                connected_at: now,
                last_activity: now,
            });

        peer.clone()
    }

    /// Remove the peer registered on `connection`, if any.
    pub fn unregister(&self, connection: &ConnectionId) -> Option<Peer> {
        self.peers.write().remove(connection)
    }

    pub fn peer_for_connection(&self, connection: &ConnectionId) -> Option<Peer> {
        self.peers.read().get(connection).cloned()
    }

    /// Refresh the last-activity timestamp of the peer on `connection`.
    pub fn touch(&self, connection: &ConnectionId) {
        if let Some(peer) = self.peers.write().get_mut(connection) {
            peer.last_activity = Utc::now();
        }
    }

    pub fn live_count(&self) -> usize {
        self.peers.read().len()
    }

    /// Point-in-time copy of every registered peer, oldest registration first.
    pub fn snapshot(&self) -> Vec<Peer> {
        let mut peers: Vec<Peer> = self.peers.read().values().cloned().collect();
        peers.sort_by_key(|p| p.connected_at);
        peers
    }

    /// Connections whose peer should be evicted: the transport has gone away,
    /// or (when `idle_timeout` is set) nothing was heard from them for too long.
    pub fn stale_connections(&self, idle_timeout: Option<Duration>) -> Vec<ConnectionId> {
        let now = Utc::now();
        self.peers
            .read()
            .values()
            .filter(|peer| {
                !peer.connection.is_live()
                    || idle_timeout.is_some_and(|idle| now - peer.last_activity > idle)
            })
            .map(|peer| peer.connection.id())
            .collect()
    }
}
