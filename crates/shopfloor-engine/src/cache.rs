use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use shopfloor_contract::{RawInputs, ValidatedInputs};
use shopfloor_graph::Record;
use tracing::debug;

use crate::engine::{record_outcome, Engine};
use crate::error::RunError;
use crate::shaper::{shape, OperationSummary, ResponseEnvelope};
use crate::OperationRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            capacity: 1024,
        }
    }
}

/// Memoizes successful results above an [`Engine`], keyed by operation name
/// and validated inputs. Validation runs on every call; only execution is
/// skipped on a hit. Failures are never cached.
#[derive(Clone)]
pub struct CachedEngine {
    inner: Engine,
    cache: Cache<String, Arc<Vec<Record>>>,
}

impl CachedEngine {
    pub fn new(inner: Engine, settings: CacheSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.capacity)
            .time_to_live(settings.ttl.max(Duration::from_secs(1)))
            .build();
        Self { inner, cache }
    }

    async fn run_cached(
        &self,
        name: &str,
        raw: &RawInputs,
    ) -> Result<(ResponseEnvelope, bool), RunError> {
        let (contract, inputs) = self.inner.prepare(name, raw)?;
        let key = fingerprint(&contract.name, &inputs);
        if let Some(hit) = self.cache.get(&key).await {
            debug!(target: "engine", operation = %name, key = %key, "result cache hit");
            return Ok((shape(contract, inputs, hit.as_ref().clone()), true));
        }
        let records = self.inner.execute_prepared(contract, &inputs).await?;
        self.cache.insert(key, Arc::new(records.clone())).await;
        Ok((shape(contract, inputs, records), false))
    }
}

#[async_trait]
impl OperationRunner for CachedEngine {
    fn list_operation_names(&self) -> Vec<String> {
        self.inner.list_operation_names()
    }

    fn describe(&self, name: &str) -> Result<OperationSummary, RunError> {
        self.inner.describe(name)
    }

    async fn run(&self, name: &str, raw: &RawInputs) -> Result<ResponseEnvelope, RunError> {
        let started = Instant::now();
        let (result, cached) = match self.run_cached(name, raw).await {
            Ok((envelope, cached)) => (Ok(envelope), cached),
            Err(err) => (Err(err), false),
        };
        record_outcome(name, &result, started.elapsed(), cached);
        result
    }
}

/// Stable SHA-256 key for an operation and its validated inputs.
pub fn fingerprint(operation: &str, inputs: &ValidatedInputs) -> String {
    let canonical = canonicalize_json(&Value::Object(inputs.as_map().clone()));
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn canonicalize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<(&String, &Value)> = map.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (key, val) in pairs {
                out.insert(key.clone(), canonicalize_json(val));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_json).collect()),
        _ => value.clone(),
    }
}
