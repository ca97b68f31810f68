//! Deterministic personalized PageRank with signed edges.
//!
//! `reprank` scores the nodes of a directed weighted graph in which every
//! edge either endorses (positive weight) or rejects (negative weight) its
//! target. Each node ends up with two non-negative scores: a *positive rank*
//! measuring accumulated endorsement, and a *negative rank* measuring
//! accumulated rejection. Score mass is seeded exclusively from a
//! personalization set, so nodes outside that set cannot manufacture rank
//! for themselves, and nodes that picked up rejection in a previous round
//! bleed part of their outgoing influence into a synthetic `negConsumer`
//! sink. This makes the computation usable for sybil-resistant reputation,
//! voting, and governance.
//!
//! All arithmetic is fixed point over arbitrary-precision integers (scale
//! `10^18` by default) with truncating division: identical inputs produce
//! bit-identical scores on every platform.
//!
//! # Quick start
//!
//! ```rust
//! use num_bigint::BigUint;
//! use reprank::{fixed, Graph, NodeInput};
//!
//! let alpha = fixed::scaled(85) / 100u32;           // 0.85
//! let epsilon = fixed::precision() / 1_000_000u32;  // 1e-6
//! let mut graph = Graph::new(alpha, epsilon, BigUint::from(0u32));
//!
//! let alice = NodeInput::fresh("alice");
//! let bob = NodeInput::fresh("bob");
//! let carol = NodeInput::fresh("carol");
//!
//! graph.add_personalization_node(&alice);
//! graph.link(&alice, &bob, &fixed::scaled_signed(2));
//! graph.link(&alice, &carol, &fixed::scaled_signed(-1));
//!
//! let outcome = graph.run();
//! assert!(outcome.converged);
//! assert!(outcome.p_rank("bob") > BigUint::from(0u32));
//! ```
//!
//! # Staged rounds
//!
//! A [`Graph`] is single-use: [`Graph::rank`] and [`Graph::run`] consume it.
//! Multi-round computations build a fresh graph per round, seeded with the
//! previous round's scores via [`RankOutcome::node_input`] and
//! [`RankOutcome::neg_consumer_rank`].

pub mod fixed;
pub mod graph;
pub mod pagerank;

pub use graph::{Graph, NodeInput, NodeKind, DEFAULT_MAX_ITERATIONS, NEG_CONSUMER_ID};
pub use pagerank::{RankOutcome, RankScore};
