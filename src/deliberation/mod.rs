//! Deliberation rounds: one fan-out/fan-in cycle per submitted query.
//!
//! # Lifecycle
//!
//! ```text
//! start_round ──► in_progress ──(quorum of participant responses)──► complete
//!                      │
//!                      └── never reaches quorum: stays in_progress
//! ```
//!
//! The quorum of a round is the number of peers registered when it started.
//! Those peers are its participants; only the first response of each
//! participant counts. Everything else a round receives (duplicates, answers
//! from peers that joined later, answers after synthesis) is kept for audit
//! in [`Round::ignored_responses`] (bounded, with the excess only counted)
//! and never re-triggers synthesis.

/// The coordinator driving rounds from query to synthesis.
pub mod coordinator;
/// Append-only log of submitted queries.
pub mod history;
/// Round storage with atomic append-and-check.
pub mod store;
/// Pluggable synthesis of collected responses.
pub mod synthesis;

pub use coordinator::{Coordinator, Disposition, RoundStarted, StatusSnapshot, SubmitOutcome};
pub use history::MessageHistory;
pub use store::{AppendOutcome, DeliberationStore};
pub use synthesis::{Consensus, Perspective, StructuralSynthesizer, Synthesis, Synthesizer};

use crate::peers::PeerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identity of a round. Random v4 UUIDs, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RoundId(Uuid);

impl RoundId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a submitted message in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A query as submitted by a user, before it is stamped and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub content: String,
    pub user_id: String,
    pub conversation_id: Option<String>,
    /// Where the query came from ("websocket", "api", or the sender's platform)
    pub platform: String,
}

impl Query {
    pub fn new(content: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            user_id: user_id.into(),
            conversation_id: None,
            platform: "api".to_string(),
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }
}

/// A stored query, as recorded in history and carried by `collective_query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryMessage {
    pub id: MessageId,
    pub content: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub platform: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Query> for QueryMessage {
    fn from(query: Query) -> Self {
        Self {
            id: MessageId::new(),
            content: query.content,
            user_id: query.user_id,
            conversation_id: query.conversation_id,
            platform: query.platform,
            timestamp: Utc::now(),
        }
    }
}

/// One peer's answer within a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub peer_id: PeerId,
    pub platform: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl AgentResponse {
    pub fn new(peer_id: PeerId, platform: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            peer_id,
            platform: platform.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    InProgress,
    Complete,
}

/// Why a response was recorded without counting toward quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The peer already has a counted response in this round
    Duplicate,
    /// The peer was not registered when the round started
    NotParticipant,
    /// The round had already met its quorum
    Late,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IgnoredResponse {
    pub response: AgentResponse,
    pub reason: IgnoreReason,
}

/// Floor on kept uncounted responses, so rounds with few participants
/// still show some of them.
const MIN_IGNORED_KEPT: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: RoundId,
    pub query: QueryMessage,
    /// Peers registered at round start; the only peers whose answers count
    pub participants: Vec<PeerId>,
    /// Fixed at creation to `participants.len()`
    pub required_responses: usize,
    /// Counted responses in arrival order
    pub responses: Vec<AgentResponse>,
    /// Uncounted responses, oldest first, up to [`Round::ignored_capacity`]
    pub ignored_responses: Vec<IgnoredResponse>,
    /// Uncounted responses dropped once `ignored_responses` was full
    pub ignored_overflow: usize,
    pub status: RoundStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<Synthesis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Round {
    pub fn new(query: QueryMessage, participants: Vec<PeerId>) -> Self {
        Self {
            id: RoundId::new(),
            query,
            required_responses: participants.len(),
            participants,
            responses: Vec::new(),
            ignored_responses: Vec::new(),
            ignored_overflow: 0,
            status: RoundStatus::InProgress,
            created_at: Utc::now(),
            synthesis: None,
            completed_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == RoundStatus::Complete
    }

    pub fn quorum_met(&self) -> bool {
        self.responses.len() >= self.required_responses
    }

    /// How many uncounted responses are kept before further ones are only
    /// tallied in `ignored_overflow`.
    pub fn ignored_capacity(&self) -> usize {
        self.participants.len().max(MIN_IGNORED_KEPT)
    }

    fn record_ignored(&mut self, response: AgentResponse, reason: IgnoreReason) {
        if self.ignored_responses.len() < self.ignored_capacity() {
            self.ignored_responses.push(IgnoredResponse { response, reason });
        } else {
            self.ignored_overflow += 1;
        }
    }

    fn is_participant(&self, peer_id: &PeerId) -> bool {
        self.participants.contains(peer_id)
    }

    fn has_counted(&self, peer_id: &PeerId) -> bool {
        self.responses.iter().any(|r| &r.peer_id == peer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_round_ids_are_unique() {
        let ids: HashSet<RoundId> = (0..1000).map(|_| RoundId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_round_quorum_fixed_to_participants() {
        let participants = vec![PeerId::new(), PeerId::new(), PeerId::new()];
        let round = Round::new(Query::new("hello", "user").into(), participants);

        assert_eq!(round.required_responses, 3);
        assert_eq!(round.status, RoundStatus::InProgress);
        assert!(!round.quorum_met());
    }

    #[test]
    fn test_empty_round_meets_quorum_immediately() {
        let round = Round::new(Query::new("hello", "user").into(), vec![]);
        assert!(round.quorum_met());
    }

    #[test]
    fn test_round_serializes_status_snake_case() {
        let round = Round::new(Query::new("hello", "user").into(), vec![]);
        let json = serde_json::to_value(&round).unwrap();

        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["requiredResponses"], 0);
        assert!(json.get("synthesis").is_none());
    }
}
