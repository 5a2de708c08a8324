//! Inferred topology: immutable snapshots built from the evidence graph.

pub mod builder;
pub mod correlate;
pub mod model;

pub use builder::{build_snapshot, classify_role};
pub use model::{NodeRole, TopologyEdge, TopologyNode, TopologySnapshot};
