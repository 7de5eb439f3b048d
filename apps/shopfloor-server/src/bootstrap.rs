use std::sync::Arc;

use anyhow::Context;
use shopfloor_contract::{lint, ContractStore, Validator};
use shopfloor_engine::{CacheSettings, CachedEngine, Engine, OperationRunner};
use shopfloor_graph::{GraphStore, Neo4jStore};
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Load the contract and wire the engine to the configured Neo4j store.
pub(crate) fn build_runner(cfg: &ServerConfig) -> anyhow::Result<Arc<dyn OperationRunner>> {
    let contracts = ContractStore::load(&cfg.contract_path)
        .with_context(|| format!("loading contract {}", cfg.contract_path.display()))?;
    report_lint(&contracts);

    let store = Neo4jStore::new(&cfg.neo4j).context("configuring Neo4j store")?;
    info!(store = %store.label(), "graph store configured");
    Ok(runner_for(
        contracts,
        Arc::new(store),
        Validator::new(cfg.rules.clone()),
        cfg.cache,
    ))
}

pub(crate) fn runner_for(
    contracts: ContractStore,
    graph: Arc<dyn GraphStore>,
    validator: Validator,
    cache: Option<CacheSettings>,
) -> Arc<dyn OperationRunner> {
    let engine = Engine::new(Arc::new(contracts), graph).with_validator(validator);
    match cache {
        Some(settings) => {
            info!(
                ttl_secs = settings.ttl.as_secs(),
                capacity = settings.capacity,
                "result cache enabled"
            );
            Arc::new(CachedEngine::new(engine, settings))
        }
        None => Arc::new(engine),
    }
}

fn report_lint(contracts: &ContractStore) {
    for contract in contracts.iter() {
        let report = lint(contract);
        if !report.unbound.is_empty() {
            warn!(
                operation = %report.operation,
                placeholders = ?report.unbound,
                "query references parameters with no input field"
            );
        }
        if !report.unused.is_empty() {
            warn!(
                operation = %report.operation,
                fields = ?report.unused,
                "input fields never referenced by the query"
            );
        }
    }
}

pub(crate) fn attach_http_layers(
    router: axum::Router<()>,
    concurrency_limit: usize,
) -> axum::Router<()> {
    use tower::limit::ConcurrencyLimitLayer;
    use tower_http::trace::TraceLayer;

    router
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
}
