//! Change-orchestration state machine.
//!
//! A run moves through the fixed layer pipeline (intake → context →
//! deterministic checks → planner → vendor expert → verification → policy
//! judge → deploy) under status and risk gating. All mutation goes through
//! [`engine::RunRegistry::apply`], which serializes transitions per run and
//! evaluates every guard against the pre-transition state.

pub mod engine;
pub mod events;
pub mod model;
pub mod reducer;
pub mod risk;

pub use engine::{ApplyOutcome, RunRegistry};
pub use events::RunEvent;
pub use model::{Layer, OrchestrationRun, RiskLevel, RunScope, RunStatus, LAYER_ORDER};
