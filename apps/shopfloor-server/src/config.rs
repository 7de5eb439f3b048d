use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use jsonschema::{validator_for, Validator};
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shopfloor_contract::DomainRules;
use shopfloor_engine::CacheSettings;
use shopfloor_graph::Neo4jConfig;

pub(crate) const DEFAULT_CONTRACT: &str = "shopfloor_tool_contract.json";
const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_CONC: usize = 1024;

/// Optional TOML file named by `SHOPFLOOR_CONFIG`. Environment variables win
/// over anything set here. The Neo4j password is only read from the
/// environment.
#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Path to the operation contract (JSON or YAML).
    #[serde(default)]
    pub contract: Option<String>,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub neo4j: Neo4jSection,
    #[serde(default)]
    pub cache: CacheSection,
    /// Allowed values per input field name. An entry replaces the built-in
    /// whitelist for that field.
    #[serde(default)]
    pub whitelists: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Maximum in-flight requests.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Neo4jSection {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Result cache lifetime; 0 disables caching.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
    #[serde(default)]
    pub capacity: Option<u64>,
}

static FILE_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema = schemars::schema_for!(FileConfig);
    let schema_value = serde_json::to_value(&schema).expect("schema value");
    validator_for(&schema_value).expect("valid schema")
});

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config does not match schema: {0}")]
    Schema(String),
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

pub(crate) fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_file(&content)
}

pub(crate) fn parse_file(content: &str) -> Result<FileConfig, ConfigError> {
    let raw: toml::Value = toml::from_str(content)?;
    let json_value =
        serde_json::to_value(&raw).map_err(|err| ConfigError::Schema(err.to_string()))?;
    let validation_errors: Vec<_> = FILE_SCHEMA
        .iter_errors(&json_value)
        .map(|e| e.to_string())
        .collect();
    if !validation_errors.is_empty() {
        return Err(ConfigError::Schema(validation_errors.join(", ")));
    }
    Ok(toml::from_str(content)?)
}

/// Everything the server needs to start.
#[derive(Debug)]
pub(crate) struct ServerConfig {
    pub contract_path: PathBuf,
    pub addr: SocketAddr,
    pub concurrency_limit: usize,
    pub neo4j: Neo4jConfig,
    pub cache: Option<CacheSettings>,
    pub rules: DomainRules,
}

impl ServerConfig {
    /// Read `SHOPFLOOR_CONFIG` (if set) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        let file = match non_empty(env("SHOPFLOOR_CONFIG")) {
            Some(path) => load_file(Path::new(&path))?,
            None => FileConfig::default(),
        };
        Self::resolve(file, env)
    }

    pub fn resolve<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| non_empty(env(key));

        let contract_path = var("SHOPFLOOR_CONTRACT")
            .or(file.contract)
            .unwrap_or_else(|| DEFAULT_CONTRACT.to_string());

        let bind = var("SHOPFLOOR_BIND")
            .or(file.http.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let port = match var("SHOPFLOOR_PORT") {
            Some(raw) => parse_var("SHOPFLOOR_PORT", raw)?,
            None => match var("PORT") {
                Some(raw) => parse_var("PORT", raw)?,
                None => file.http.port.unwrap_or(DEFAULT_PORT),
            },
        };
        let ip: IpAddr = bind.trim().parse().map_err(|_| ConfigError::Invalid {
            key: "SHOPFLOOR_BIND",
            value: bind.clone(),
        })?;
        let addr = SocketAddr::new(ip, port);
        let concurrency_limit = match var("SHOPFLOOR_HTTP_MAX_CONC") {
            Some(raw) => parse_var("SHOPFLOOR_HTTP_MAX_CONC", raw)?,
            None => file.http.max_concurrency.unwrap_or(DEFAULT_MAX_CONC),
        };
        if concurrency_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "SHOPFLOOR_HTTP_MAX_CONC",
                value: "0".into(),
            });
        }

        let uri = var("NEO4J_URI")
            .or(file.neo4j.uri)
            .ok_or(ConfigError::Missing("NEO4J_URI"))?;
        let user = var("NEO4J_USER")
            .or(file.neo4j.user)
            .ok_or(ConfigError::Missing("NEO4J_USER"))?;
        let password = var("NEO4J_PASSWORD").ok_or(ConfigError::Missing("NEO4J_PASSWORD"))?;
        let mut neo4j = Neo4jConfig::new(uri, user, password);
        if let Some(database) = var("NEO4J_DATABASE").or(file.neo4j.database) {
            neo4j = neo4j.with_database(database);
        }
        let timeout_secs = match var("NEO4J_TIMEOUT_SECS") {
            Some(raw) => Some(parse_var::<u64>("NEO4J_TIMEOUT_SECS", raw)?),
            None => file.neo4j.timeout_secs,
        };
        if let Some(secs) = timeout_secs.filter(|secs| *secs > 0) {
            neo4j = neo4j.with_timeout(Duration::from_secs(secs));
        }

        let ttl_secs = match var("SHOPFLOOR_CACHE_TTL_SECS") {
            Some(raw) => parse_var("SHOPFLOOR_CACHE_TTL_SECS", raw)?,
            None => file.cache.ttl_secs.unwrap_or(0),
        };
        let capacity = match var("SHOPFLOOR_CACHE_CAP") {
            Some(raw) => parse_var("SHOPFLOOR_CACHE_CAP", raw)?,
            None => file
                .cache
                .capacity
                .unwrap_or(CacheSettings::default().capacity),
        };
        let cache = (ttl_secs > 0).then(|| CacheSettings {
            ttl: Duration::from_secs(ttl_secs),
            capacity,
        });

        let rules = file
            .whitelists
            .into_iter()
            .fold(DomainRules::default(), |rules, (field, values)| {
                rules.with_whitelist(field, values)
            });

        Ok(Self {
            contract_path: PathBuf::from(contract_path),
            addr,
            concurrency_limit,
            neo4j,
            cache,
            rules,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}
