use super::AgentResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

/// Turns the counted responses of a round into its final result.
///
/// Called exactly once per round, with responses in arrival order.
/// Implementations must be pure apart from stamping a timestamp.
#[cfg_attr(test, mockall::automock)]
pub trait Synthesizer: Send + Sync {
    fn synthesize(&self, responses: &[AgentResponse]) -> Synthesis;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Consensus {
    #[serde(rename = "multiple perspectives")]
    MultiplePerspectives,
    #[serde(rename = "single perspective")]
    SinglePerspective,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Perspective {
    pub source: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Synthesis {
    pub summary: String,
    pub response_count: usize,
    pub perspectives: Vec<Perspective>,
    pub consensus: Consensus,
    pub timestamp: DateTime<Utc>,
}

/// Structural placeholder: lists every perspective and labels whether more
/// than one platform contributed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSynthesizer;

impl Synthesizer for StructuralSynthesizer {
    fn synthesize(&self, responses: &[AgentResponse]) -> Synthesis {
        let platforms: HashSet<&str> = responses.iter().map(|r| r.platform.as_str()).collect();
        let consensus = if platforms.len() > 1 {
            Consensus::MultiplePerspectives
        } else {
            Consensus::SinglePerspective
        };

        Synthesis {
            summary: format!("Collective response from {} agents", responses.len()),
            response_count: responses.len(),
            perspectives: responses
                .iter()
                .map(|r| Perspective {
                    source: r.platform.clone(),
                    content: r.content.clone(),
                })
                .collect(),
            consensus,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peers::PeerId;
    use rstest::rstest;

    fn responses(platforms: &[&str]) -> Vec<AgentResponse> {
        platforms
            .iter()
            .map(|p| AgentResponse::new(PeerId::new(), *p, format!("{} says hi", p)))
            .collect()
    }

    #[rstest]
    #[case(&[], Consensus::SinglePerspective)]
    #[case(&["alpha"], Consensus::SinglePerspective)]
    #[case(&["alpha", "alpha"], Consensus::SinglePerspective)]
    #[case(&["alpha", "beta"], Consensus::MultiplePerspectives)]
    #[case(&["alpha", "beta", "gamma"], Consensus::MultiplePerspectives)]
    fn test_consensus_label(#[case] platforms: &[&str], #[case] expected: Consensus) {
        let synthesis = StructuralSynthesizer.synthesize(&responses(platforms));
        assert_eq!(synthesis.consensus, expected);
    }

    #[test]
    fn test_perspectives_keep_arrival_order() {
        let synthesis = StructuralSynthesizer.synthesize(&responses(&["gamma", "alpha", "beta"]));

        let sources: Vec<&str> = synthesis
            .perspectives
            .iter()
            .map(|p| p.source.as_str())
            .collect();
        assert_eq!(sources, vec!["gamma", "alpha", "beta"]);
        assert_eq!(synthesis.response_count, 3);
        assert_eq!(synthesis.summary, "Collective response from 3 agents");
    }

    #[test]
    fn test_consensus_wire_labels() {
        assert_eq!(
            serde_json::to_value(Consensus::MultiplePerspectives).unwrap(),
            "multiple perspectives"
        );
        assert_eq!(
            serde_json::to_value(Consensus::SinglePerspective).unwrap(),
            "single perspective"
        );
    }
}
