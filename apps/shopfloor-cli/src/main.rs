use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use shopfloor_contract::{lint, ContractStore, LintReport, RawInputs, Validator};
use shopfloor_engine::{Engine, OperationRunner, ResponseEnvelope};
use shopfloor_graph::{Neo4jConfig, Neo4jStore};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "shopfloor-cli", version, about = "Shopfloor operation contract helpers")]
struct Cli {
    /// Operation contract (JSON or YAML)
    #[arg(
        long,
        global = true,
        env = "SHOPFLOOR_CONTRACT",
        default_value = "shopfloor_tool_contract.json"
    )]
    contract: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print operation names in contract order
    List,
    /// Validate inputs for an operation without running it
    Check(InputArgs),
    /// Run an operation against Neo4j and print the response
    Call {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        neo4j: Neo4jArgs,
    },
    /// Compare query placeholders with declared inputs
    Lint,
}

#[derive(Args)]
struct InputArgs {
    /// Operation name
    operation: String,
    /// Inputs as a JSON object
    #[arg(default_value = "{}")]
    inputs: String,
}

#[derive(Args)]
struct Neo4jArgs {
    #[arg(long, env = "NEO4J_URI")]
    uri: String,
    #[arg(long, env = "NEO4J_USER")]
    user: String,
    #[arg(long, env = "NEO4J_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, env = "NEO4J_DATABASE", default_value = "neo4j")]
    database: String,
    /// Per-request timeout in seconds (0 = none)
    #[arg(long, env = "NEO4J_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
}

impl Neo4jArgs {
    fn config(&self) -> Neo4jConfig {
        let config = Neo4jConfig::new(&self.uri, &self.user, &self.password)
            .with_database(&self.database);
        if self.timeout_secs > 0 {
            config.with_timeout(Duration::from_secs(self.timeout_secs))
        } else {
            config
        }
    }
}

fn main() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let store = ContractStore::load(&cli.contract)
        .with_context(|| format!("loading {}", cli.contract.display()))?;
    debug!(operations = store.len(), "contract loaded");
    match &cli.command {
        Commands::List => {
            for name in store.names() {
                println!("{name}");
            }
            Ok(0)
        }
        Commands::Check(args) => {
            let validated = check_operation(&store, args)?;
            print_pretty(&validated)?;
            Ok(0)
        }
        Commands::Call { input, neo4j } => {
            let envelope = call_operation(store, input, &neo4j.config())?;
            print_pretty(&envelope)?;
            Ok(0)
        }
        Commands::Lint => {
            let reports = lint_all(&store);
            for report in &reports {
                println!("{}", describe_lint(report));
            }
            Ok(lint_exit_code(&reports))
        }
    }
}

fn parse_inputs(raw: &str) -> Result<RawInputs> {
    match serde_json::from_str(raw).context("inputs are not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("inputs must be a JSON object, got {other}"),
    }
}

fn check_operation(store: &ContractStore, args: &InputArgs) -> Result<Value> {
    let contract = store.lookup(&args.operation)?;
    let validated = Validator::default().validate(contract, &parse_inputs(&args.inputs)?)?;
    Ok(Value::Object(validated.into_map()))
}

fn call_operation(
    store: ContractStore,
    args: &InputArgs,
    neo4j: &Neo4jConfig,
) -> Result<ResponseEnvelope> {
    let inputs = parse_inputs(&args.inputs)?;
    let graph = Neo4jStore::new(neo4j).context("configuring Neo4j store")?;
    let engine = Engine::new(Arc::new(store), Arc::new(graph));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    Ok(runtime.block_on(engine.run(&args.operation, &inputs))?)
}

fn lint_all(store: &ContractStore) -> Vec<LintReport> {
    store.iter().map(lint).collect()
}

fn describe_lint(report: &LintReport) -> String {
    if report.is_clean() {
        return format!("{}: ok", report.operation);
    }
    let mut parts = Vec::new();
    if !report.unbound.is_empty() {
        parts.push(format!("unbound ${}", report.unbound.join(", $")));
    }
    if !report.unused.is_empty() {
        parts.push(format!("unused {}", report.unused.join(", ")));
    }
    format!("{}: {}", report.operation, parts.join("; "))
}

/// Unbound placeholders fail at query time; unused inputs are only noise.
fn lint_exit_code(reports: &[LintReport]) -> i32 {
    if reports.iter().any(|r| !r.unbound.is_empty()) {
        1
    } else {
        0
    }
}

fn print_pretty<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
