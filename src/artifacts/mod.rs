//! Schema boundary for the three AI-produced artifacts.
//!
//! The planner, vendor expert, and policy judge are external collaborators;
//! the core only ever sees their finished artifacts, delivered as events.
//! Each artifact is validated whole-or-nothing before the state machine
//! touches it — a failed validation never partially applies.

pub mod plan;
pub mod translation;
pub mod verdict;

pub use plan::{Plan, PlanAction, PlanPhase, PlanTask};
pub use translation::{DeviceConfig, VendorTranslation};
pub use verdict::{PolicyDecision, PolicyVerdict};
