//! Speedcompare CLI - start comparisons and inspect jobs on a running daemon

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9627";

#[derive(Parser)]
#[command(name = "speedcompare")]
#[command(about = "Paired page performance comparisons", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "SPEEDCOMPARE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Who requests the job
    #[arg(long, env = "USER", default_value = "cli")]
    created_by: String,
}

/// Options shared by every start command
#[derive(Args, Clone)]
struct RunArgs {
    /// Emulate a mobile device
    #[arg(long)]
    mobile: bool,

    /// Testing-service location
    #[arg(long)]
    location: Option<String>,

    /// Also measure the repeat view
    #[arg(long)]
    caching: bool,

    /// Acceleration config as a JSON file (skips generation)
    #[arg(long)]
    config_file: Option<PathBuf>,
}

impl RunArgs {
    fn to_params(&self) -> Result<serde_json::Map<String, Value>> {
        let mut params = serde_json::Map::new();
        params.insert("mobile".to_string(), json!(self.mobile));
        params.insert("caching".to_string(), json!(self.caching));
        if let Some(location) = &self.location {
            params.insert("location".to_string(), json!(location));
        }
        if let Some(path) = &self.config_file {
            params.insert("acceleration_config".to_string(), read_json(path)?);
        }
        Ok(params)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    Baseline,
    Accelerated,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Test,
    Comparison,
    MultiComparison,
    BulkComparison,
}

impl Kind {
    fn as_str(&self) -> &'static str {
        match self {
            Kind::Test => "TEST",
            Kind::Comparison => "COMPARISON",
            Kind::MultiComparison => "MULTI_COMPARISON",
            Kind::BulkComparison => "BULK_COMPARISON",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single test
    Test {
        url: String,

        #[arg(long, value_enum, default_value = "baseline")]
        role: Role,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Compare one URL as-is against accelerated
    Compare {
        url: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Repeat a comparison sequentially
    Multi {
        url: String,

        /// Number of comparisons
        #[arg(short, long, default_value = "3")]
        runs: u32,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Start a campaign over many URLs
    Bulk {
        /// URLs sharing the run options below
        urls: Vec<String>,

        /// JSON array of comparison specs (`{"url": ..., "runs": ..., ...}`)
        #[arg(long, conflicts_with = "urls")]
        file: Option<PathBuf>,

        /// Comparisons per URL
        #[arg(short, long, default_value = "1")]
        runs: u32,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Show the stored state of a job
    Status {
        #[arg(value_enum)]
        kind: Kind,

        job_id: String,

        /// Print the full job document
        #[arg(long)]
        full: bool,
    },

    /// Trigger one advance of a job
    Advance {
        #[arg(value_enum)]
        kind: Kind,

        job_id: String,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct StartResult {
    job_id: String,
    kind: String,
}

#[derive(Deserialize)]
struct StatusResult {
    job_id: String,
    kind: String,
    finished: bool,
    version: i64,
    updated_at: i64,
    job: Value,
}

#[derive(Tabled)]
struct StatusRow {
    job_id: String,
    kind: String,
    state: String,
    version: i64,
    updated_at: i64,
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn read_json(path: &PathBuf) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Request object with the run options flattened in
fn start_params(created_by: &str, url: Option<&str>, run: &RunArgs) -> Result<Value> {
    let mut params = run.to_params()?;
    params.insert("created_by".to_string(), json!(created_by));
    if let Some(url) = url {
        params.insert("url".to_string(), json!(url));
    }
    Ok(Value::Object(params))
}

async fn start(rpc_url: &str, method: &str, params: Value) -> Result<()> {
    let result = call_rpc(rpc_url, method, params).await?;
    let started: StartResult = serde_json::from_value(result)?;

    println!("{}", "✓ Job started".green().bold());
    println!();
    println!("{}", Table::new(vec![started]));
    Ok(())
}

/// Headline of a job document, depending on its kind
fn summary(kind: &str, job: &Value) -> Option<String> {
    match kind {
        "TEST" => Some(format!(
            "{} test, status {}, retries {}",
            job["role"].as_str().unwrap_or("?").to_lowercase(),
            job["status"].as_str().unwrap_or("?"),
            job["retry_count"]
        )),
        "COMPARISON" => Some(format!(
            "baseline {} / accelerated {}",
            job["baseline_test"].as_str().unwrap_or("-"),
            job["accelerated_test"].as_str().unwrap_or("-")
        )),
        "MULTI_COMPARISON" => Some(format!(
            "{} of {} comparisons started",
            job["comparisons"].as_array().map_or(0, Vec::len),
            job["runs"]
        )),
        "BULK_COMPARISON" => Some(format!(
            "{} of {} URLs started",
            job["multi_comparisons"].as_array().map_or(0, Vec::len),
            job["comparisons_to_start"].as_array().map_or(0, Vec::len)
        )),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test { url, role, run } => {
            let mut params = start_params(&cli.created_by, Some(&url), &run)?;
            params["role"] = json!(match role {
                Role::Baseline => "BASELINE",
                Role::Accelerated => "ACCELERATED",
            });
            start(&cli.rpc_url, "test.start.v1", params).await?;
        }

        Commands::Compare { url, run } => {
            let params = start_params(&cli.created_by, Some(&url), &run)?;
            start(&cli.rpc_url, "comparison.start.v1", params).await?;
        }

        Commands::Multi { url, runs, run } => {
            let mut params = start_params(&cli.created_by, Some(&url), &run)?;
            params["runs"] = json!(runs);
            start(&cli.rpc_url, "multi_comparison.start.v1", params).await?;
        }

        Commands::Bulk {
            urls,
            file,
            runs,
            run,
        } => {
            let comparisons = match file {
                Some(path) => read_json(&path)?,
                None => {
                    let specs = urls
                        .iter()
                        .map(|url| {
                            let mut spec = start_params(&cli.created_by, Some(url), &run)?;
                            if let Some(object) = spec.as_object_mut() {
                                object.remove("created_by");
                            }
                            spec["runs"] = json!(runs);
                            Ok(spec)
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Value::Array(specs)
                }
            };
            let params = json!({
                "created_by": cli.created_by,
                "comparisons": comparisons,
            });
            start(&cli.rpc_url, "bulk_comparison.start.v1", params).await?;
        }

        Commands::Status { kind, job_id, full } => {
            let params = json!({ "kind": kind.as_str(), "job_id": job_id });
            let result = call_rpc(&cli.rpc_url, "job.status.v1", params).await?;
            let status: StatusResult = serde_json::from_value(result)?;

            let state = if status.finished {
                "FINISHED".green().to_string()
            } else {
                "IN PROGRESS".yellow().to_string()
            };
            let headline = summary(&status.kind, &status.job);
            let row = StatusRow {
                job_id: status.job_id,
                kind: status.kind,
                state,
                version: status.version,
                updated_at: status.updated_at,
            };
            println!("{}", Table::new(vec![row]));

            if let Some(headline) = headline {
                println!("  {} {}", "•".bold(), headline);
            }
            if full {
                println!();
                println!("{}", serde_json::to_string_pretty(&status.job)?);
            }
        }

        Commands::Advance { kind, job_id } => {
            let params = json!({ "kind": kind.as_str(), "job_id": job_id });
            call_rpc(&cli.rpc_url, "job.advance.v1", params).await?;
            println!("{}", format!("✓ Advance of {} dispatched", job_id).green().bold());
        }
    }

    Ok(())
}
