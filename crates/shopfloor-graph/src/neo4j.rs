use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::{GraphError, GraphSession, GraphStore, Params, Record};

const DEFAULT_DATABASE: &str = "neo4j";
const MAX_BODY_SNIPPET: usize = 256;

/// Connection settings for the Neo4j Query API.
#[derive(Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub timeout: Option<Duration>,
}

impl Neo4jConfig {
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
            database: DEFAULT_DATABASE.to_string(),
            timeout: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for Neo4jConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neo4jConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Map a driver-style URI onto the HTTP base of the Query API.
///
/// `neo4j+s://host` and `bolt+s://host` become `https://host`; `neo4j://host`
/// and `bolt://host` become `http://host:7474`. HTTP URIs are kept as given.
pub fn query_base_url(uri: &str) -> Result<Url, GraphError> {
    let parsed = Url::parse(uri.trim())
        .map_err(|err| GraphError::Config(format!("invalid uri '{uri}': {err}")))?;
    let host = || {
        parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| GraphError::Config(format!("uri '{uri}' has no host")))
    };
    let base = match parsed.scheme() {
        "http" | "https" => return Ok(parsed.clone()),
        "neo4j+s" | "neo4j+ssc" | "bolt+s" | "bolt+ssc" => format!("https://{}", host()?),
        "neo4j" | "bolt" => format!("http://{}:7474", host()?),
        other => {
            return Err(GraphError::Config(format!(
                "unsupported uri scheme '{other}'"
            )))
        }
    };
    Url::parse(&base).map_err(|err| GraphError::Config(format!("invalid uri '{uri}': {err}")))
}

fn query_endpoint(base: &Url, database: &str) -> Result<Url, GraphError> {
    let mut endpoint = base.clone();
    endpoint
        .path_segments_mut()
        .map_err(|_| GraphError::Config(format!("uri '{base}' cannot be a base")))?
        .pop_if_empty()
        .extend(["db", database, "query", "v2"]);
    Ok(endpoint)
}

struct Credentials {
    user: String,
    password: String,
}

/// Graph store backed by the Neo4j HTTP Query API.
///
/// The `reqwest` client pools connections; each session is an independent
/// auto-commit request context.
#[derive(Clone)]
pub struct Neo4jStore {
    client: reqwest::Client,
    endpoint: Url,
    database: String,
    credentials: Arc<Credentials>,
}

impl Neo4jStore {
    pub fn new(config: &Neo4jConfig) -> Result<Self, GraphError> {
        if config.database.trim().is_empty() {
            return Err(GraphError::Config("database name is empty".into()));
        }
        let base = query_base_url(&config.uri)?;
        let endpoint = query_endpoint(&base, &config.database)?;
        let mut builder = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| GraphError::Config(format!("http client: {err}")))?;
        Ok(Self {
            client,
            endpoint,
            database: config.database.clone(),
            credentials: Arc::new(Credentials {
                user: config.user.clone(),
                password: config.password.clone(),
            }),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        let id = uuid::Uuid::new_v4().to_string();
        debug!(session = %id, database = %self.database, "graph session opened");
        Ok(Box::new(Neo4jSession {
            id,
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            credentials: Arc::clone(&self.credentials),
        }))
    }

    fn label(&self) -> String {
        format!("neo4j {} db={}", self.endpoint.origin().ascii_serialization(), self.database)
    }
}

struct Neo4jSession {
    id: String,
    client: reqwest::Client,
    endpoint: Url,
    credentials: Arc<Credentials>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    errors: Vec<QueryErrorBody>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct QueryErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl GraphSession for Neo4jSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&mut self, statement: &str, params: &Params) -> Result<Vec<Record>, GraphError> {
        let body = json!({
            "statement": statement,
            "parameters": params,
        });
        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|err| GraphError::Connection(err.without_url().to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| GraphError::Connection(err.without_url().to_string()))?;
        decode_response(status, &text)
    }

    async fn close(self: Box<Self>) {
        debug!(session = %self.id, "graph session released");
    }
}

fn decode_response(status: reqwest::StatusCode, text: &str) -> Result<Vec<Record>, GraphError> {
    let parsed: Option<QueryResponse> = serde_json::from_str(text).ok();
    if let Some(QueryResponse { errors, .. }) = &parsed {
        if let Some(first) = errors.first() {
            let message = errors
                .iter()
                .map(|e| e.message.as_str())
                .filter(|m| !m.is_empty())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GraphError::Query {
                code: first.code.clone(),
                message,
            });
        }
    }
    if !status.is_success() {
        return Err(GraphError::Connection(format!(
            "HTTP {}: {}",
            status.as_u16(),
            snippet(text)
        )));
    }
    let data = parsed
        .and_then(|resp| resp.data)
        .ok_or_else(|| GraphError::Protocol(format!("missing data in {}", snippet(text))))?;
    rows_to_records(data)
}

fn rows_to_records(data: QueryData) -> Result<Vec<Record>, GraphError> {
    let mut records = Vec::with_capacity(data.values.len());
    for row in data.values {
        if row.len() != data.fields.len() {
            return Err(GraphError::Protocol(format!(
                "row has {} values for {} fields",
                row.len(),
                data.fields.len()
            )));
        }
        records.push(data.fields.iter().cloned().zip(row).collect());
    }
    Ok(records)
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_BODY_SNIPPET {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_BODY_SNIPPET).collect();
    cut.push_str("...");
    cut
}
