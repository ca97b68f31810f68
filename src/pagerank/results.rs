//! Result merging and emission.
//!
//! After convergence, every negative half-node folds its accumulated score
//! into the `n_rank` slot of its positive counterpart and disappears from
//! the result set.

use num_bigint::BigUint;

use crate::graph::builder::{Graph, NodeInput, NodeKind};
use crate::pagerank::{RankOutcome, RankScore};

impl Graph {
    /// Fold negative halves into their positive counterparts and package
    /// the surviving nodes, sorted by id.
    pub(crate) fn into_outcome(
        mut self,
        iterations: usize,
        delta: BigUint,
        converged: bool,
    ) -> RankOutcome {
        self.merge_negatives();

        let mut scores: Vec<RankScore> = self
            .nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Positive)
            .map(|node| RankScore {
                id: node.key.clone(),
                p_rank: node.p_rank.clone(),
                n_rank: node.n_rank.clone(),
            })
            .collect();
        scores.sort_by(|a, b| a.id.cmp(&b.id));

        RankOutcome {
            scores,
            iterations,
            delta,
            converged,
        }
    }

    /// Move each negative half's score into its counterpart's `n_rank`,
    /// creating the counterpart when the id only ever received rejection.
    fn merge_negatives(&mut self) {
        for neg_ix in self.sorted_neg_ixs() {
            let id = self.nodes[neg_ix as usize].id.clone();
            let neg_rank = self.nodes[neg_ix as usize].p_rank.clone();

            let pos_ix = match self.key_to_ix.get(&id) {
                Some(&ix) => ix,
                None => {
                    let input = NodeInput::fresh(id.clone());
                    self.init_node(&id, &input, NodeKind::Positive)
                }
            };
            self.nodes[pos_ix as usize].n_rank = neg_rank;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed;
    use crate::graph::{NodeInput, NEG_CONSUMER_ID};
    use num_bigint::BigInt;
    use num_traits::Zero;

    fn new_graph() -> Graph {
        Graph::new(
            fixed::scaled(85) / 100u32,
            fixed::precision() / 1_000_000u32,
            BigUint::zero(),
        )
    }

    fn node(id: &str) -> NodeInput {
        NodeInput::fresh(id)
    }

    fn weight(value: i64) -> BigInt {
        fixed::scaled_signed(value)
    }

    #[test]
    fn test_negative_half_folds_into_counterpart() {
        let mut graph = new_graph();
        graph.add_personalization_node(&node("a"));
        graph.link(&node("a"), &node("e"), &weight(-1));

        let outcome = graph.run();
        let e = outcome.score("e").unwrap();

        assert!(e.p_rank.is_zero());
        assert!(!e.n_rank.is_zero());
        // the negative half itself is gone from the results
        assert!(outcome.score("e_1").is_none());
    }

    #[test]
    fn test_results_exclude_consumer_without_negatives() {
        let mut graph = new_graph();
        graph.link(&node("a"), &node("b"), &weight(1));
        graph.link(&node("b"), &node("a"), &weight(1));

        let outcome = graph.run();

        assert!(outcome.score(NEG_CONSUMER_ID).is_none());
        assert_eq!(outcome.scores.len(), 2);
    }

    #[test]
    fn test_scores_are_sorted_by_id() {
        let mut graph = new_graph();
        graph.link(&node("c"), &node("a"), &weight(1));
        graph.link(&node("a"), &node("b"), &weight(-2));

        let outcome = graph.run();

        let ids: Vec<&str> = outcome.scores.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
