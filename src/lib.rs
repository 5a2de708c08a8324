pub mod artifacts;
pub mod config;
pub mod discovery;
pub mod error;
pub mod evidence;
pub mod observability;
pub mod orchestrator;
pub mod topology;

use std::sync::Arc;

use config::CoreConfig;
use evidence::graph::EvidenceGraph;
use orchestrator::engine::RunRegistry;

/// Shared state handed to discovery collectors and the orchestration
/// event API. Everything inside is independently `Arc`-shared; cloning
/// the context is cheap.
#[derive(Clone)]
pub struct NetOpsContext {
    pub config: Arc<CoreConfig>,
    /// Evidence graph fed by discovery collectors.
    pub graph: Arc<EvidenceGraph>,
    /// Orchestration run registry — one serialized state machine per run.
    pub runs: Arc<RunRegistry>,
}

impl NetOpsContext {
    /// Wire together the core from a loaded configuration.
    pub fn new(config: CoreConfig) -> Self {
        let config = Arc::new(config);
        let graph = Arc::new(EvidenceGraph::new(config.discovery.scoring()));
        let runs = Arc::new(RunRegistry::new(config.orchestration.clone()));
        Self { config, graph, runs }
    }
}
