//! PageRank over signed reputation graphs.
//!
//! This module provides the deterministic power iteration and the result
//! types it emits.

pub mod engine;
pub mod results;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::graph::{NodeInput, NEG_CONSUMER_ID};

/// Converged scores for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankScore {
    pub id: String,
    /// Accumulated endorsement.
    pub p_rank: BigUint,
    /// Accumulated rejection.
    pub n_rank: BigUint,
}

/// Result of a ranking run.
#[derive(Debug, Clone, Serialize)]
pub struct RankOutcome {
    /// Scores sorted lexicographically by id.
    pub scores: Vec<RankScore>,
    /// Number of power iterations performed.
    pub iterations: usize,
    /// Final L1 distance between successive score vectors.
    pub delta: BigUint,
    /// Whether the delta dropped below the convergence threshold before the
    /// iteration cap.
    pub converged: bool,
}

impl RankOutcome {
    /// Score record for a specific id.
    pub fn score(&self, id: &str) -> Option<&RankScore> {
        self.scores
            .binary_search_by(|score| score.id.as_str().cmp(id))
            .ok()
            .map(|ix| &self.scores[ix])
    }

    /// Positive rank for an id, zero when the id was not emitted.
    pub fn p_rank(&self, id: &str) -> BigUint {
        self.score(id)
            .map(|score| score.p_rank.clone())
            .unwrap_or_else(BigUint::zero)
    }

    /// Negative rank for an id, zero when the id was not emitted.
    pub fn n_rank(&self, id: &str) -> BigUint {
        self.score(id)
            .map(|score| score.n_rank.clone())
            .unwrap_or_else(BigUint::zero)
    }

    /// Seed triple for the next staged round: the emitted scores for `id`,
    /// or zeros when the id was not emitted.
    pub fn node_input(&self, id: &str) -> NodeInput {
        match self.score(id) {
            Some(score) => NodeInput::new(id, score.p_rank.clone(), score.n_rank.clone()),
            None => NodeInput::fresh(id),
        }
    }

    /// The `negConsumer` rank to carry into the next round's
    /// [`Graph::new`](crate::Graph::new).
    pub fn neg_consumer_rank(&self) -> BigUint {
        self.p_rank(NEG_CONSUMER_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> RankOutcome {
        RankOutcome {
            scores: vec![
                RankScore {
                    id: "a".to_string(),
                    p_rank: BigUint::from(7u32),
                    n_rank: BigUint::zero(),
                },
                RankScore {
                    id: "b".to_string(),
                    p_rank: BigUint::from(3u32),
                    n_rank: BigUint::from(2u32),
                },
            ],
            iterations: 4,
            delta: BigUint::zero(),
            converged: true,
        }
    }

    #[test]
    fn test_score_lookup() {
        let outcome = outcome();
        assert_eq!(outcome.p_rank("a"), BigUint::from(7u32));
        assert_eq!(outcome.n_rank("b"), BigUint::from(2u32));
        assert!(outcome.score("z").is_none());
    }

    #[test]
    fn test_node_input_seeds_next_round() {
        let outcome = outcome();
        let seeded = outcome.node_input("b");
        assert_eq!(seeded.p_rank, BigUint::from(3u32));
        assert_eq!(seeded.n_rank, BigUint::from(2u32));

        let fresh = outcome.node_input("z");
        assert!(fresh.p_rank.is_zero() && fresh.n_rank.is_zero());
    }

    #[test]
    fn test_neg_consumer_rank_defaults_to_zero() {
        assert!(outcome().neg_consumer_rank().is_zero());
    }

    #[test]
    fn test_score_serializes() {
        let json = serde_json::to_string(&outcome().scores[0]).unwrap();
        let back: RankScore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome().scores[0]);
    }
}
