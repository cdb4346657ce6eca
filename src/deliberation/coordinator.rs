//! Round orchestration.
//!
//! The [`Coordinator`] turns boundary events into store operations and
//! fan-outs:
//!
//! 1. `start_round` snapshots the registry. The snapshot becomes the round's
//!    participants, its size the quorum, and it is also the fan-out target
//!    of the `collective_query`.
//! 2. `submit_response` appends through the store. The store hands the
//!    synthesis claim to exactly one append; only that caller synthesizes,
//!    marks the round complete and fans out the `collective_response`.
//!
//! No timeout is applied: a round whose participants never all answer stays
//! in progress.

use super::{
    AgentResponse, AppendOutcome, DeliberationStore, IgnoreReason, MessageHistory, MessageId,
    Query, QueryMessage, Round, RoundId, StructuralSynthesizer, Synthesis, Synthesizer,
};
use crate::broadcast::{Broadcaster, FanoutSnapshot};
use crate::peers::{ConnectionHandle, ConnectionId, Peer, PeerId, PeerRegistry, PeerSummary};
use crate::protocol::ServerEvent;
use crate::types::{AppError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Returned by [`Coordinator::start_round`] as soon as the query is fanned out.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundStarted {
    pub round_id: RoundId,
    pub message_id: MessageId,
    pub required_responses: usize,
    /// Participants the query was actually delivered to
    pub recipients: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Counted toward quorum; the round is still waiting.
    Counted,
    /// Counted, and it completed the round with this synthesis.
    Completed(Synthesis),
    /// Recorded without counting.
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub round_id: RoundId,
    pub count: usize,
    pub required: usize,
    pub disposition: Disposition,
}

impl SubmitOutcome {
    pub fn counted(&self) -> bool {
        !matches!(self.disposition, Disposition::Ignored(_))
    }
}

/// Read-only view for status requests.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub connected_peers: Vec<PeerSummary>,
    pub total_connections: usize,
    pub total_messages: usize,
    pub active_rounds: usize,
    pub fanout: FanoutSnapshot,
}

pub struct Coordinator {
    registry: Arc<PeerRegistry>,
    store: Arc<DeliberationStore>,
    history: Arc<MessageHistory>,
    broadcaster: Arc<Broadcaster>,
    synthesizer: Arc<dyn Synthesizer>,
}

impl Coordinator {
    pub fn new(registry: Arc<PeerRegistry>, store: Arc<DeliberationStore>) -> Self {
        Self {
            registry,
            store,
            history: Arc::new(MessageHistory::new()),
            broadcaster: Arc::new(Broadcaster::new()),
            synthesizer: Arc::new(StructuralSynthesizer),
        }
    }

    /// Replace the synthesis policy.
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<DeliberationStore> {
        &self.store
    }

    pub fn history(&self) -> &Arc<MessageHistory> {
        &self.history
    }

    // ============= Membership =============

    /// Register the peer on `connection` and announce the new membership.
    pub fn register_peer(
        &self,
        platform: impl Into<String>,
        submitter_id: Option<String>,
        connection: ConnectionHandle,
    ) -> Peer {
        let peer = self.registry.register(platform, submitter_id, connection);
        info!(peer_id = %peer.id, platform = %peer.platform, "Peer registered");
        self.announce_membership();
        peer
    }

    /// Drop the peer on `connection`, announcing the change if there was one.
    pub fn disconnect(&self, connection: &ConnectionId) -> Option<Peer> {
        let peer = self.registry.unregister(connection)?;
        info!(peer_id = %peer.id, platform = %peer.platform, "Peer disconnected");
        self.announce_membership();
        Some(peer)
    }

    /// Send the full peer list to every peer.
    pub fn announce_membership(&self) -> usize {
        let peers = self.registry.snapshot();
        let event = ServerEvent::StatusUpdate {
            connected_peers: peers.iter().map(Peer::summary).collect(),
            total_connections: peers.len(),
            timestamp: Utc::now(),
        };
        self.broadcaster.broadcast(event, &peers)
    }

    // ============= Rounds =============

    /// Open a round for `query` and fan it out to every registered peer.
    ///
    /// Returns without waiting for any response.
    pub fn start_round(&self, query: Query) -> Result<RoundStarted> {
        if query.content.trim().is_empty() {
            return Err(AppError::InvalidInput("content must not be empty".to_string()));
        }
        if query.user_id.trim().is_empty() {
            return Err(AppError::InvalidInput("userId must not be empty".to_string()));
        }

        let message = QueryMessage::from(query);
        self.history.append(message.clone());

        let participants = self.registry.snapshot();
        let round = Round::new(message.clone(), participants.iter().map(|p| p.id).collect());
        let required_responses = round.required_responses;
        let round_id = self.store.create(round);

        info!(
            round_id = %round_id,
            required_responses,
            user_id = %message.user_id,
            "Round started"
        );

        let recipients = self.broadcaster.broadcast(
            ServerEvent::CollectiveQuery {
                round_id,
                query: message.clone(),
                required_responses,
            },
            &participants,
        );

        // Nobody to wait for
        if let Some(responses) = self.store.claim_synthesis(&round_id)? {
            self.complete_round(round_id, responses)?;
        }

        Ok(RoundStarted {
            round_id,
            message_id: message.id,
            required_responses,
            recipients,
        })
    }

    /// Record `peer_id`'s answer for a round, synthesizing if it completes
    /// the quorum.
    pub fn submit_response(
        &self,
        round_id: &RoundId,
        peer_id: PeerId,
        platform: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<SubmitOutcome> {
        let response = AgentResponse::new(peer_id, platform, content);
        debug!(round_id = %round_id, peer_id = %peer_id, platform = %response.platform, "Response received");

        let outcome = self.store.append_response(round_id, response)?;
        let (count, required) = (outcome.count(), outcome.required());

        let disposition = match outcome {
            AppendOutcome::Pending { .. } => Disposition::Counted,
            AppendOutcome::QuorumReached { responses, .. } => {
                Disposition::Completed(self.complete_round(*round_id, responses)?)
            }
            AppendOutcome::Ignored { reason, .. } => {
                debug!(round_id = %round_id, peer_id = %peer_id, ?reason, "Response not counted");
                Disposition::Ignored(reason)
            }
        };

        Ok(SubmitOutcome {
            round_id: *round_id,
            count,
            required,
            disposition,
        })
    }

    fn complete_round(&self, round_id: RoundId, responses: Vec<AgentResponse>) -> Result<Synthesis> {
        let synthesis = self.synthesizer.synthesize(&responses);
        self.store.mark_complete(&round_id, synthesis.clone())?;

        let delivered = self.broadcaster.broadcast(
            ServerEvent::CollectiveResponse {
                round_id,
                synthesis: synthesis.clone(),
                responses,
            },
            &self.registry.snapshot(),
        );

        info!(
            round_id = %round_id,
            responses = synthesis.response_count,
            delivered,
            "Round complete"
        );
        Ok(synthesis)
    }

    pub fn round(&self, round_id: &RoundId) -> Result<Round> {
        self.store.get(round_id)
    }

    pub fn status(&self) -> StatusSnapshot {
        let peers = self.registry.snapshot();
        StatusSnapshot {
            total_connections: peers.len(),
            connected_peers: peers.iter().map(Peer::summary).collect(),
            total_messages: self.history.len(),
            active_rounds: self.store.in_progress_count(),
            fanout: self.broadcaster.stats(),
        }
    }
}
