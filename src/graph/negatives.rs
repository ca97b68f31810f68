//! Negative-rank preprocessing.
//!
//! Before ranking, every node that accumulated rejection in a previous round
//! gets a synthetic out-edge to the `negConsumer` sink, sized so that the
//! node's remaining outgoing influence shrinks in proportion to its
//! negative/positive ratio. This pass is a carry-over mechanism: it only
//! fires across staged rounds, because fresh graphs carry no prior scores.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::fixed;
use crate::graph::builder::{Graph, NodeInput, NodeKind, NEG_CONSUMER_ID};

impl Graph {
    /// Freeze the graph for ranking.
    ///
    /// Called by [`rank`](Graph::rank); explicit calls are allowed and
    /// idempotent, so the preprocessing step runs exactly once.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.process_negatives();
        self.finalized = true;
    }

    /// Inject the damping out-edge for every negatively ranked node.
    fn process_negatives(&mut self) {
        let neg_consumer = NodeInput::new(
            NEG_CONSUMER_ID,
            self.neg_consumer_rank.clone(),
            BigUint::zero(),
        );

        for neg_ix in self.sorted_neg_ixs() {
            let neg = &self.nodes[neg_ix as usize];
            let id = neg.id.clone();
            let neg_rank = neg.p_rank.clone();

            // the positive half was never materialized
            let Some(&pos_ix) = self.key_to_ix.get(&id) else {
                continue;
            };
            let pos = &self.nodes[pos_ix as usize];
            // no outgoing influence to damp
            if pos.degree.is_zero() {
                continue;
            }
            // no prior signal to form a ratio from
            if pos.p_rank.is_zero() || neg_rank.is_zero() {
                continue;
            }
            let pos_rank = pos.p_rank.clone();
            let pos_degree = pos.degree.clone();

            let consumer_ix = self.init_node(NEG_CONSUMER_ID, &neg_consumer, NodeKind::Positive);

            let ratio = fixed::mul_div(&neg_rank, &self.precision, &pos_rank);
            let neg_multiple = if ratio > self.neg_ratio_cutoff() {
                // past the admission threshold: cap the attenuation multiple
                self.max_neg_offset.clone()
            } else {
                // 1 / (1 - ratio) - 1, strictly increasing, zero at ratio 0
                let remainder = fixed::checked_sub(&self.precision, &ratio);
                fixed::checked_sub(
                    &fixed::mul_div(&self.precision, &self.precision, &remainder),
                    &self.precision,
                )
            };
            let neg_weight = fixed::mul_div(&neg_multiple, &pos_degree, &self.precision);

            *self
                .edges
                .entry(pos_ix)
                .or_default()
                .entry(consumer_ix)
                .or_insert_with(BigUint::zero) += &neg_weight;
            self.nodes[pos_ix as usize].degree += &neg_weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

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

    /// A node with prior ranks pRank=2, nRank=1, one outgoing unit link, and
    /// one inbound rejection.
    fn staged_graph() -> Graph {
        let mut graph = new_graph();
        let b = NodeInput::new("b", fixed::scaled(2), fixed::scaled(1));
        graph.link(&b, &node("x"), &weight(1));
        graph.link(&node("y"), &b, &weight(-1));
        graph
    }

    #[test]
    fn test_fresh_graph_gets_no_consumer() {
        let mut graph = new_graph();
        graph.link(&node("y"), &node("b"), &weight(-1));
        graph.link(&node("b"), &node("x"), &weight(1));

        let before = graph.node_count();
        graph.finalize();

        assert_eq!(graph.node_count(), before);
        assert_eq!(graph.edge_weight("b", NEG_CONSUMER_ID), None);
    }

    #[test]
    fn test_staged_node_bleeds_into_consumer() {
        let mut graph = staged_graph();
        graph.finalize();

        // ratio = 1/2, so negMultiple = 1/(1 - 1/2) - 1 = 1 and the consumer
        // edge equals the prior degree
        assert_eq!(
            graph.edge_weight("b", NEG_CONSUMER_ID),
            Some(&fixed::scaled(1))
        );
        assert_eq!(graph.degree("b"), Some(&fixed::scaled(2)));
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut graph = staged_graph();
        graph.finalize();
        graph.finalize();

        assert_eq!(
            graph.edge_weight("b", NEG_CONSUMER_ID),
            Some(&fixed::scaled(1))
        );
        assert_eq!(graph.degree("b"), Some(&fixed::scaled(2)));
    }

    #[test]
    fn test_ratio_past_cutoff_is_clamped() {
        let mut graph = new_graph();
        // stored pos rank comes from the outgoing link's input, stored neg
        // rank from the inbound rejection's input; they disagree here, so
        // the ratio is 1 and only the clamp keeps the multiple finite
        graph.link(
            &NodeInput::new("b", fixed::scaled(2), BigUint::zero()),
            &node("x"),
            &weight(1),
        );
        graph.link(
            &node("y"),
            &NodeInput::new("b", BigUint::zero(), fixed::scaled(2)),
            &weight(-1),
        );
        graph.finalize();

        assert_eq!(
            graph.edge_weight("b", NEG_CONSUMER_ID),
            Some(&fixed::scaled(10))
        );
        assert_eq!(graph.degree("b"), Some(&fixed::scaled(11)));
    }

    #[test]
    fn test_skips_when_positive_half_missing() {
        let mut graph = new_graph();
        graph.link(
            &node("y"),
            &NodeInput::new("c", BigUint::zero(), fixed::scaled(1)),
            &weight(-1),
        );
        graph.finalize();

        assert_eq!(graph.edge_weight("c", NEG_CONSUMER_ID), None);
        assert!(graph.key_to_ix.get(NEG_CONSUMER_ID).is_none());
    }

    #[test]
    fn test_skips_when_degree_is_zero() {
        let mut graph = new_graph();
        let c = NodeInput::new("c", fixed::scaled(1), fixed::scaled(1));
        // c exists in both halves with prior scores but never links out
        graph.link(&node("y"), &c, &weight(1));
        graph.link(&node("y"), &node("z"), &weight(1));
        graph.link(&node("x"), &c, &weight(-1));
        graph.finalize();

        assert_eq!(graph.edge_weight("c", NEG_CONSUMER_ID), None);
    }
}
