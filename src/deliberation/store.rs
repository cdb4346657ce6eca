use super::{AgentResponse, IgnoreReason, Round, RoundId, RoundStatus, Synthesis};
use crate::types::{AppError, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of appending a response to a round.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// Counted; the round still waits for more participants.
    Pending { count: usize, required: usize },
    /// Counted, and this append was the one that met the quorum. The caller
    /// now holds the round's only synthesis claim.
    QuorumReached {
        count: usize,
        required: usize,
        responses: Vec<AgentResponse>,
    },
    /// Recorded for audit only; the counted total is unchanged.
    Ignored {
        count: usize,
        required: usize,
        reason: IgnoreReason,
    },
}

impl AppendOutcome {
    /// Counted responses after the append.
    pub fn count(&self) -> usize {
        match self {
            AppendOutcome::Pending { count, .. }
            | AppendOutcome::QuorumReached { count, .. }
            | AppendOutcome::Ignored { count, .. } => *count,
        }
    }

    /// The round's quorum, as fixed at creation.
    pub fn required(&self) -> usize {
        match self {
            AppendOutcome::Pending { required, .. }
            | AppendOutcome::QuorumReached { required, .. }
            | AppendOutcome::Ignored { required, .. } => *required,
        }
    }
}

#[derive(Debug)]
struct RoundEntry {
    round: Round,
    /// Set by whichever caller first observes the quorum met. Stays set, so
    /// synthesis can be claimed once even before `mark_complete` lands.
    synthesis_claimed: bool,
}

impl RoundEntry {
    fn claim_if_quorum_met(&mut self) -> Option<Vec<AgentResponse>> {
        if self.synthesis_claimed || self.round.is_complete() || !self.round.quorum_met() {
            return None;
        }
        self.synthesis_claimed = true;
        Some(self.round.responses.clone())
    }
}

/// Owner of every round. Each round sits behind its own mutex so appends to
/// one round never wait on another; the outer map lock is held only to look
/// a round up or insert it.
#[derive(Debug, Default)]
pub struct DeliberationStore {
    rounds: RwLock<HashMap<RoundId, Arc<Mutex<RoundEntry>>>>,
}

impl DeliberationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, round: Round) -> RoundId {
        let id = round.id;
        let entry = RoundEntry {
            round,
            synthesis_claimed: false,
        };
        self.rounds.write().insert(id, Arc::new(Mutex::new(entry)));
        id
    }

    fn entry(&self, id: &RoundId) -> Result<Arc<Mutex<RoundEntry>>> {
        self.rounds
            .read()
            .get(id)
            .cloned()
            .ok_or(AppError::RoundNotFound(*id))
    }

    pub fn get(&self, id: &RoundId) -> Result<Round> {
        Ok(self.entry(id)?.lock().round.clone())
    }

    /// Append a response and check the quorum in one indivisible step.
    ///
    /// Exactly one append per round can return
    /// [`AppendOutcome::QuorumReached`]. Fails with `RoundNotFound` without
    /// touching any state when the round is unknown.
    pub fn append_response(&self, id: &RoundId, response: AgentResponse) -> Result<AppendOutcome> {
        let entry = self.entry(id)?;
        let mut entry = entry.lock();

        let required = entry.round.required_responses;
        let reason = if entry.synthesis_claimed || entry.round.is_complete() {
            Some(IgnoreReason::Late)
        } else if !entry.round.is_participant(&response.peer_id) {
            Some(IgnoreReason::NotParticipant)
        } else if entry.round.has_counted(&response.peer_id) {
            Some(IgnoreReason::Duplicate)
        } else {
            None
        };

        if let Some(reason) = reason {
            entry.round.record_ignored(response, reason);
            return Ok(AppendOutcome::Ignored {
                count: entry.round.responses.len(),
                required,
                reason,
            });
        }

        entry.round.responses.push(response);
        let count = entry.round.responses.len();

        Ok(match entry.claim_if_quorum_met() {
            Some(responses) => AppendOutcome::QuorumReached {
                count,
                required,
                responses,
            },
            None => AppendOutcome::Pending { count, required },
        })
    }

    /// Claim synthesis for a round whose quorum is already met without any
    /// further append (a round with no participants).
    pub fn claim_synthesis(&self, id: &RoundId) -> Result<Option<Vec<AgentResponse>>> {
        Ok(self.entry(id)?.lock().claim_if_quorum_met())
    }

    /// Record the synthesis and mark the round complete. Returns `false`
    /// without changing anything if the round was already complete.
    pub fn mark_complete(&self, id: &RoundId, synthesis: Synthesis) -> Result<bool> {
        let entry = self.entry(id)?;
        let mut entry = entry.lock();

        if entry.round.is_complete() {
            return Ok(false);
        }

        entry.synthesis_claimed = true;
        entry.round.status = RoundStatus::Complete;
        entry.round.synthesis = Some(synthesis);
        entry.round.completed_at = Some(Utc::now());
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.rounds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.read().is_empty()
    }

    pub fn in_progress_count(&self) -> usize {
        self.rounds
            .read()
            .values()
            .filter(|entry| !entry.lock().round.is_complete())
            .count()
    }

    /// Drop completed rounds that finished before `cutoff`. In-progress
    /// rounds are never evicted.
    pub fn evict_completed_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut rounds = self.rounds.write();
        let before = rounds.len();
        rounds.retain(|_, entry| {
            let entry = entry.lock();
            !matches!(entry.round.completed_at, Some(done) if done < cutoff)
        });
        before - rounds.len()
    }
}
