//! Discovery evidence: typed observations and the merge graph they feed.

pub mod graph;
pub mod model;

pub use model::{edge_key, Endpoint, Evidence, EvidenceDetail, EvidenceSource};
