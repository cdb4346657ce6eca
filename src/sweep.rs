//! Periodic eviction of finished rounds and dead peers.
//!
//! Completed rounds are kept for `completed_round_ttl_secs` after completion
//! so they stay queryable, then dropped. Rounds still in progress are never
//! touched. Peers are dropped once their transport is gone, or once they
//! have been silent longer than `peer_idle_timeout_secs` if that is set.

use crate::deliberation::Coordinator;
use crate::utils::toml_config::SweepConfig;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// What a single sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rounds_evicted: usize,
    pub peers_evicted: usize,
}

pub struct Sweeper {
    coordinator: Arc<Coordinator>,
    config: SweepConfig,
}

impl Sweeper {
    pub fn new(coordinator: Arc<Coordinator>, config: SweepConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Run one sweep now.
    pub fn run_once(&self) -> SweepReport {
        let cutoff = Utc::now() - self.config.round_ttl();
        let rounds_evicted = self.coordinator.store().evict_completed_before(cutoff);

        let registry = self.coordinator.registry();
        let peers_evicted = registry
            .stale_connections(self.config.peer_idle_timeout())
            .iter()
            .filter_map(|connection| registry.unregister(connection))
            .inspect(|peer| debug!(peer_id = %peer.id, platform = %peer.platform, "Evicting stale peer"))
            .count();

        if peers_evicted > 0 {
            self.coordinator.announce_membership();
        }

        SweepReport {
            rounds_evicted,
            peers_evicted,
        }
    }

    /// Start a background task that sweeps every `interval_secs`.
    ///
    /// The task runs until it is aborted.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval = self.config.interval();

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            // The first tick completes immediately
            interval_timer.tick().await;
            loop {
                interval_timer.tick().await;

                let report = self.run_once();
                if report != SweepReport::default() {
                    info!(
                        rounds = report.rounds_evicted,
                        peers = report.peers_evicted,
                        "Sweep evicted stale state"
                    );
                }
            }
        })
    }
}
