//! The damped power iteration.
//!
//! Computes the PageRank fixed point of a finalized graph entirely in
//! fixed-point big integers, so identical inputs produce bit-identical
//! scores on every platform. Every traversal runs in sorted key order;
//! hash-map iteration order never reaches the arithmetic.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::fixed;
use crate::graph::Graph;
use crate::pagerank::RankOutcome;

/// Emit per-iteration convergence telemetry (when the `tracing` feature is
/// enabled). When disabled, this is a no-op and the compiler eliminates it.
macro_rules! trace_iteration {
    ($iteration:expr, $delta:expr) => {
        #[cfg(feature = "tracing")]
        tracing::trace!(iteration = $iteration, delta = %$delta, "power iteration");
    };
}

impl Graph {
    /// Compute scores and hand each surviving node to `callback` as
    /// `(id, pRank, nRank)`.
    ///
    /// The graph is finalized, iterated until the L1 delta between
    /// successive score vectors drops below epsilon, and merged; the
    /// callback then runs exactly once per node, sorted by id. The
    /// `negConsumer` sink appears like any other positive node whenever the
    /// preprocessor created it.
    pub fn rank<F>(self, mut callback: F)
    where
        F: FnMut(&str, &BigUint, &BigUint),
    {
        let outcome = self.run();
        for score in &outcome.scores {
            callback(&score.id, &score.p_rank, &score.n_rank);
        }
    }

    /// Compute scores and return them as a deterministically ordered
    /// sequence together with convergence information.
    pub fn run(mut self) -> RankOutcome {
        self.finalize();

        let one = self.precision.clone();
        let node_count = BigUint::from(self.nodes.len());
        let alpha = self.params.alpha.clone();
        let epsilon = self.params.epsilon.clone();
        let personalized = !self.params.personalization.is_empty();

        // Personalization weights are degree-based so that every root
        // contributes equal teleport mass per unit of weight.
        let p_weights = self.init_personalization_nodes();

        // Normalize each outgoing row to a probability distribution:
        // weight * 1.0 / degree.
        let order = self.sorted_node_ixs();
        for &ix in &order {
            let degree = self.nodes[ix as usize].degree.clone();
            if degree.is_zero() {
                continue;
            }
            for target_ix in self.sorted_row_targets(ix) {
                if let Some(weight) = self
                    .edges
                    .get_mut(&ix)
                    .and_then(|row| row.get_mut(&target_ix))
                {
                    *weight = fixed::mul_div(weight, &one, &degree);
                }
            }
        }

        self.init_scores(&node_count, &p_weights);

        // Frozen, sorted edge rows for the iteration; edges no longer change
        // from here on.
        let rows: Vec<Vec<(u32, BigUint)>> = (0..self.nodes.len() as u32)
            .map(|ix| {
                self.sorted_row_targets(ix)
                    .into_iter()
                    .map(|target_ix| (target_ix, self.edges[&ix][&target_ix].clone()))
                    .collect()
            })
            .collect();
        let root_ixs: Vec<u32> = self
            .params
            .personalization
            .clone()
            .iter()
            .map(|id| self.personalization_ix(id))
            .collect();

        let mut prev: Vec<BigUint> = vec![BigUint::zero(); self.nodes.len()];
        let mut delta = one.clone();
        let mut iterations = 0;
        let mut converged = true;

        while delta > epsilon {
            if iterations >= self.max_iterations {
                converged = false;
                break;
            }

            // Snapshot scores, collect dangling mass, zero the slate.
            let mut dangling = BigUint::zero();
            for &ix in &order {
                let node = &mut self.nodes[ix as usize];
                prev[ix as usize] = node.p_rank.clone();
                if node.degree.is_zero() {
                    dangling += &prev[ix as usize];
                }
                node.p_rank = BigUint::zero();
            }
            let dangling = fixed::mul_div(&dangling, &alpha, &one);

            for &source_ix in &order {
                for (target_ix, weight) in &rows[source_ix as usize] {
                    // alpha * prev / 1.0, then * w / 1.0 -- two scaling
                    // steps in exactly this order
                    let share = fixed::mul_div(&alpha, &prev[source_ix as usize], &one);
                    let share = fixed::mul_div(&share, weight, &one);
                    self.nodes[*target_ix as usize].p_rank += share;
                }
                if !personalized {
                    // uniform teleport plus redistributed dangling mass
                    let teleport = fixed::checked_sub(&one, &alpha) / &node_count;
                    self.nodes[source_ix as usize].p_rank += teleport + &dangling / &node_count;
                }
            }

            if personalized {
                // Teleport and dangling mass flow only to the roots, which
                // is what denies outside nodes any inbound teleport mass.
                // The final division applies to the whole sum; see DESIGN.md
                // on the pinned associativity.
                for (i, &root_ix) in root_ixs.iter().enumerate() {
                    let boost = (fixed::checked_sub(&one, &alpha) + &dangling) * &p_weights[i];
                    let node = &mut self.nodes[root_ix as usize];
                    node.p_rank = (&node.p_rank + boost) / &one;
                }
            }

            delta = BigUint::zero();
            for &ix in &order {
                delta += fixed::abs_diff(&self.nodes[ix as usize].p_rank, &prev[ix as usize]);
            }
            iterations += 1;
            trace_iteration!(iterations, delta);
        }

        self.into_outcome(iterations, delta, converged)
    }

    /// Degree-normalized weights for the personalization roots.
    ///
    /// A dangling root still teleports, so its placeholder weight is 1.0.
    /// Root scores are reset so that equal teleport weight implies equal
    /// start mass.
    fn init_personalization_nodes(&mut self) -> Vec<BigUint> {
        let personalization = self.params.personalization.clone();
        let mut p_weights = Vec::with_capacity(personalization.len());
        let mut weight_sum = BigUint::zero();
        let mut score_sum = BigUint::zero();

        for id in &personalization {
            let ix = self.personalization_ix(id);
            let node = &self.nodes[ix as usize];
            let weight = if node.degree.is_zero() {
                self.precision.clone()
            } else {
                node.degree.clone()
            };
            weight_sum += &weight;
            score_sum += &node.p_rank;
            p_weights.push(weight);
        }

        for (i, id) in personalization.iter().enumerate() {
            let ix = self.personalization_ix(id);
            p_weights[i] = fixed::mul_div(&p_weights[i], &self.precision, &weight_sum);
            self.nodes[ix as usize].p_rank =
                fixed::mul_div(&score_sum, &p_weights[i], &self.precision);
        }

        p_weights
    }

    /// Seed start scores so that the initial mass is 1.0, unless a staged
    /// computation already carried scores in (start sum above 0.9).
    fn init_scores(&mut self, node_count: &BigUint, p_weights: &[BigUint]) {
        let mut total = BigUint::zero();
        for node in &self.nodes {
            total += &node.p_rank;
        }

        if total > &self.precision * 9u32 / 10u32 {
            return;
        }
        let deficit = fixed::checked_sub(&self.precision, &total);

        if p_weights.is_empty() {
            for ix in self.sorted_node_ixs() {
                self.nodes[ix as usize].p_rank += &deficit / node_count;
            }
            return;
        }

        // deficit * 1.0 / pWeights[i] -- the scale-inverted reference form,
        // preserved bit-for-bit; see DESIGN.md
        let personalization = self.params.personalization.clone();
        for (i, id) in personalization.iter().enumerate() {
            let ix = self.personalization_ix(id);
            self.nodes[ix as usize].p_rank +=
                fixed::mul_div(&deficit, &self.precision, &p_weights[i]);
        }
    }

    fn personalization_ix(&self, id: &str) -> u32 {
        match self.key_to_ix.get(id) {
            Some(&ix) => ix,
            None => panic!("personalization root {id:?} missing from graph"),
        }
    }
}
