//! Graph builder with signed edge handling
//!
//! This module provides a mutable graph that uses FxHashMap for O(1) edge
//! lookups during construction. Nodes live in an arena `Vec` and are
//! addressed through a string-key index map; every conceptual participant
//! splits into a positive half (keyed by its id) and a negative half (keyed
//! with a `_1` suffix) so that a single weight map can carry both
//! endorsement and rejection.

use std::cmp::Ordering;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::fixed::{self, MAX_NEG_OFFSET};

/// Reserved id of the synthetic sink that absorbs the damped outflow of
/// negatively ranked nodes.
pub const NEG_CONSUMER_ID: &str = "negConsumer";

/// Default cap on power iterations.
///
/// Convergence is geometric at rate alpha; the reference scenarios all
/// converge in under a hundred iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 1_000;

/// Which half of a conceptual node an internal node represents.
///
/// Positive halves consume positively weighted links, negative halves
/// consume negatively weighted ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Positive = 0,
    Negative = 1,
}

impl NodeKind {
    pub(crate) fn opposite(self) -> Self {
        match self {
            NodeKind::Positive => NodeKind::Negative,
            NodeKind::Negative => NodeKind::Positive,
        }
    }
}

/// Internal storage key for a node half: `u` for the positive half of `u`,
/// `u_1` for the negative half. Callers observe negative half keys in
/// intermediate states, so the suffix is part of the public contract.
pub(crate) fn node_key(id: &str, kind: NodeKind) -> String {
    match kind {
        NodeKind::Positive => id.to_string(),
        NodeKind::Negative => format!("{id}_{}", NodeKind::Negative as u8),
    }
}

/// Caller-facing `(id, pRank, nRank)` triple.
///
/// The ranks carry prior-round scores and gate edge admission; a fresh
/// computation passes zero for both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInput {
    pub id: String,
    pub p_rank: BigUint,
    pub n_rank: BigUint,
}

impl NodeInput {
    /// Construct an input triple.
    pub fn new(id: impl Into<String>, p_rank: BigUint, n_rank: BigUint) -> Self {
        Self {
            id: id.into(),
            p_rank,
            n_rank,
        }
    }

    /// Input for an id with no prior scores.
    pub fn fresh(id: impl Into<String>) -> Self {
        Self::new(id, BigUint::zero(), BigUint::zero())
    }
}

/// An internal node half.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// Storage key (`u` or `u_1`), unique within the graph.
    pub key: String,
    /// Underlying id, shared by both halves.
    pub id: String,
    pub kind: NodeKind,
    /// Positive score. For negative halves this accumulates rejection mass
    /// until result merging moves it into the counterpart's `n_rank`.
    pub p_rank: BigUint,
    /// Populated at result-merge time only.
    pub n_rank: BigUint,
    /// Sum of outgoing edge weights.
    pub degree: BigUint,
}

/// Iteration parameters: damping factor, convergence threshold, and the
/// ordered personalization vector.
#[derive(Debug, Clone)]
pub(crate) struct RankParams {
    pub alpha: BigUint,
    pub epsilon: BigUint,
    pub personalization: Vec<String>,
}

/// A single-use signed reputation graph.
///
/// Construct with [`Graph::new`], populate with
/// [`add_personalization_node`](Graph::add_personalization_node) and
/// [`link`](Graph::link), then consume with [`rank`](Graph::rank) or
/// [`run`](Graph::run). Multi-round computations build a fresh graph per
/// round, seeded with the previous round's scores.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Node storage; indices are stable for the graph's lifetime.
    pub(crate) nodes: Vec<Node>,
    /// Maps storage key -> node index.
    pub(crate) key_to_ix: FxHashMap<String, u32>,
    /// Indices of negative halves, in insertion order.
    pub(crate) neg_nodes: Vec<u32>,
    /// Adjacency: source index -> target index -> weight.
    pub(crate) edges: FxHashMap<u32, FxHashMap<u32, BigUint>>,
    pub(crate) params: RankParams,
    /// Prior-round positive rank of the `negConsumer` sink.
    pub(crate) neg_consumer_rank: BigUint,
    /// Fixed-point 1.0.
    pub(crate) precision: BigUint,
    /// Fixed-point attenuation cap (10.0).
    pub(crate) max_neg_offset: BigUint,
    pub(crate) max_iterations: usize,
    pub(crate) finalized: bool,
}

impl Graph {
    /// Create an empty graph.
    ///
    /// All three arguments are fixed-point values at scale
    /// [`fixed::precision`]: the damping factor `alpha` (typically 0.85),
    /// the convergence threshold `epsilon`, and the `negConsumer` sink's
    /// positive rank from the previous round (zero for a fresh
    /// computation).
    pub fn new(alpha: BigUint, epsilon: BigUint, neg_consumer_rank: BigUint) -> Self {
        Self {
            nodes: Vec::new(),
            key_to_ix: FxHashMap::default(),
            neg_nodes: Vec::new(),
            edges: FxHashMap::default(),
            params: RankParams {
                alpha,
                epsilon,
                personalization: Vec::new(),
            },
            neg_consumer_rank,
            precision: fixed::precision(),
            max_neg_offset: fixed::scaled(MAX_NEG_OFFSET),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            finalized: false,
        }
    }

    /// Cap the number of power iterations.
    ///
    /// Convergence is geometric at rate `alpha`, so the default of
    /// [`DEFAULT_MAX_ITERATIONS`] is far above what well-formed graphs need;
    /// hitting the cap is reported through
    /// [`RankOutcome::converged`](crate::RankOutcome).
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Append a node to the personalization vector and make sure its
    /// positive half exists.
    ///
    /// Order is preserved and duplicates are kept. Personalization nodes
    /// receive all teleport and dangling mass, which is what denies
    /// non-personalized nodes the ability to manufacture their own rank.
    pub fn add_personalization_node(&mut self, node: &NodeInput) {
        self.params.personalization.push(node.id.clone());
        let key = node_key(&node.id, NodeKind::Positive);
        self.init_node(&key, node, NodeKind::Positive);
    }

    /// Create a weighted edge from `source` to `target`.
    ///
    /// A positive weight endorses the target; a negative weight rejects it
    /// and lands on the target's negative half. Linking the same pair again
    /// accumulates weight, and opposing edges to the same target cancel.
    /// A source whose prior rejection ratio exceeds
    /// `MAX_NEG_OFFSET / (MAX_NEG_OFFSET + 1)` is past saving and the link
    /// is silently dropped.
    pub fn link(&mut self, source: &NodeInput, target: &NodeInput, weight: &BigInt) {
        if !source.p_rank.is_zero() {
            let ratio = fixed::mul_div(&source.n_rank, &self.precision, &source.p_rank);
            if ratio > self.neg_ratio_cutoff() {
                return;
            }
        }

        // Negative halves never originate edges; the source is always the
        // positive half.
        let source_key = node_key(&source.id, NodeKind::Positive);
        let source_ix = self.init_node(&source_key, source, NodeKind::Positive);

        let (kind, magnitude) = match weight.sign() {
            Sign::Minus => (NodeKind::Negative, weight.magnitude().clone()),
            _ => (NodeKind::Positive, weight.magnitude().clone()),
        };
        let target_key = node_key(&target.id, kind);
        let target_ix = self.init_node(&target_key, target, kind);

        self.nodes[source_ix as usize].degree += &magnitude;
        *self
            .edges
            .entry(source_ix)
            .or_default()
            .entry(target_ix)
            .or_insert_with(BigUint::zero) += &magnitude;

        self.cancel_opposites(source_ix, &target.id, kind);
    }

    /// The admission threshold `MAX_NEG_OFFSET / (MAX_NEG_OFFSET + 1)` in
    /// fixed point.
    pub(crate) fn neg_ratio_cutoff(&self) -> BigUint {
        fixed::mul_div(
            &self.max_neg_offset,
            &self.precision,
            &(&self.max_neg_offset + &self.precision),
        )
    }

    /// Cancel the symmetric part of opposing edges from one source to the
    /// two halves of the same target id. The cancelled mass is removed from
    /// the source degree on both sides.
    fn cancel_opposites(&mut self, source_ix: u32, target_id: &str, kind: NodeKind) {
        let key = node_key(target_id, kind);
        let opposite_key = node_key(target_id, kind.opposite());

        let Some(&opposite_ix) = self.key_to_ix.get(&opposite_key) else {
            return;
        };
        let Some(&target_ix) = self.key_to_ix.get(&key) else {
            return;
        };
        let Some(row) = self.edges.get(&source_ix) else {
            return;
        };
        if !row.contains_key(&opposite_ix) {
            return;
        }

        // Map semantics: a missing entry reads as zero.
        let edge = row.get(&target_ix).cloned().unwrap_or_else(BigUint::zero);
        let opposite = row.get(&opposite_ix).cloned().unwrap_or_else(BigUint::zero);
        let two = BigUint::from(2u32);

        match opposite.cmp(&edge) {
            Ordering::Greater => {
                self.remove_edge(source_ix, target_ix);
                if let Some(row) = self.edges.get_mut(&source_ix) {
                    row.insert(opposite_ix, &opposite - &edge);
                }
                self.shrink_degree(source_ix, &(&edge * &two));
            }
            Ordering::Less => {
                self.remove_edge(source_ix, opposite_ix);
                if let Some(row) = self.edges.get_mut(&source_ix) {
                    row.insert(target_ix, &edge - &opposite);
                }
                self.shrink_degree(source_ix, &(&opposite * &two));
            }
            Ordering::Equal => {
                self.remove_edge(source_ix, opposite_ix);
                self.remove_edge(source_ix, target_ix);
                self.shrink_degree(source_ix, &(&opposite * &two));
            }
        }
    }

    fn shrink_degree(&mut self, ix: u32, cancelled: &BigUint) {
        let node = &mut self.nodes[ix as usize];
        node.degree = fixed::checked_sub(&node.degree, cancelled);
    }

    /// Materialize the node half stored under `key`, then refresh its score
    /// from the input. The refresh is unconditional: later links carry
    /// fresher prior-round scores.
    pub(crate) fn init_node(&mut self, key: &str, input: &NodeInput, kind: NodeKind) -> u32 {
        let ix = match self.key_to_ix.get(key) {
            Some(&ix) => ix,
            None => {
                let ix = self.nodes.len() as u32;
                self.nodes.push(Node {
                    key: key.to_string(),
                    id: input.id.clone(),
                    kind,
                    p_rank: BigUint::zero(),
                    n_rank: BigUint::zero(),
                    degree: BigUint::zero(),
                });
                self.key_to_ix.insert(key.to_string(), ix);
                // negative halves are tracked separately for preprocessing
                // and result merging
                if kind == NodeKind::Negative {
                    self.neg_nodes.push(ix);
                }
                ix
            }
        };
        let rank = match kind {
            NodeKind::Positive => input.p_rank.clone(),
            NodeKind::Negative => input.n_rank.clone(),
        };
        self.nodes[ix as usize].p_rank = rank;
        ix
    }

    fn remove_edge(&mut self, source_ix: u32, target_ix: u32) {
        if let Some(row) = self.edges.get_mut(&source_ix) {
            row.remove(&target_ix);
            if row.is_empty() {
                self.edges.remove(&source_ix);
            }
        }
    }

    /// Number of node halves currently in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The personalization vector, in insertion order.
    pub fn personalization(&self) -> &[String] {
        &self.params.personalization
    }

    /// Stored out-degree for a node key (pre-normalization).
    pub fn degree(&self, key: &str) -> Option<&BigUint> {
        self.key_to_ix
            .get(key)
            .map(|&ix| &self.nodes[ix as usize].degree)
    }

    /// Stored weight of the edge `source_key -> target_key`.
    pub fn edge_weight(&self, source_key: &str, target_key: &str) -> Option<&BigUint> {
        let &source_ix = self.key_to_ix.get(source_key)?;
        let &target_ix = self.key_to_ix.get(target_key)?;
        self.edges.get(&source_ix)?.get(&target_ix)
    }

    /// Node indices sorted lexicographically by key.
    ///
    /// Hash-map iteration order is not reproducible across platforms; every
    /// traversal that feeds the arithmetic or the emission goes through a
    /// sorted index list.
    pub(crate) fn sorted_node_ixs(&self) -> Vec<u32> {
        let mut ixs: Vec<u32> = (0..self.nodes.len() as u32).collect();
        ixs.sort_by(|a, b| self.nodes[*a as usize].key.cmp(&self.nodes[*b as usize].key));
        ixs
    }

    /// Negative-half indices sorted lexicographically by key.
    pub(crate) fn sorted_neg_ixs(&self) -> Vec<u32> {
        let mut ixs = self.neg_nodes.clone();
        ixs.sort_by(|a, b| self.nodes[*a as usize].key.cmp(&self.nodes[*b as usize].key));
        ixs
    }

    /// Outgoing targets of `source_ix`, sorted lexicographically by target
    /// key. Empty when the source has no edges.
    pub(crate) fn sorted_row_targets(&self, source_ix: u32) -> Vec<u32> {
        let mut targets: Vec<u32> = self
            .edges
            .get(&source_ix)
            .map(|row| row.keys().copied().collect())
            .unwrap_or_default();
        targets.sort_by(|a, b| self.nodes[*a as usize].key.cmp(&self.nodes[*b as usize].key));
        targets
    }
}
