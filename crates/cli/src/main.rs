use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use sift_core::{Delta, DeltaKind, MetaObj};
use sift_query::{Conditions, MetaAdapter, Searcher};
use sift_store::{spawn_ingest, uid_from_raw, CacheHandle};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "siftctl", version, about = "Sift CLI: query cached records")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Scope (namespace) to query; empty selects all scopes
    #[arg(long = "scope", global = true, default_value = "")]
    scope: String,

    /// Resource kind tag for the stock adapter (logging only)
    #[arg(long = "kind", global = true, default_value = "object")]
    kind: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Filter and order records from a JSON snapshot file
    Ls {
        /// Path to a JSON array of raw objects (each with a `metadata` section)
        file: String,
        /// Exact-match condition key=value (repeatable)
        #[arg(long = "match", value_parser = parse_kv)]
        matches: Vec<(String, String)>,
        /// Fuzzy condition key=value (repeatable)
        #[arg(long = "fuzzy", value_parser = parse_kv)]
        fuzzy: Vec<(String, String)>,
        /// Order-by field: name or createTime
        #[arg(long = "order-by", default_value = "name")]
        order_by: String,
        /// Reverse the ordering
        #[arg(long = "reverse", action = ArgAction::SetTrue)]
        reverse: bool,
        /// Truncate output to the first N records
        #[arg(long = "limit")]
        limit: Option<usize>,
    },
    /// Fetch a single record by name
    Get {
        /// Path to a JSON array of raw objects
        file: String,
        /// Record name
        name: String,
    },
}

fn parse_kv(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

fn init_tracing() {
    let env = std::env::var("SIFT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("SIFT_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid SIFT_METRICS_ADDR; expected host:port");
        }
    }
}

/// Read a JSON array of raw objects and feed it through the ingest loop,
/// returning the read handle once the first snapshot is published.
async fn load_into_store(path: &str) -> Result<CacheHandle> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path))?;
    let objects = value
        .as_array()
        .context("snapshot file must hold a JSON array of objects")?;

    let cap = std::env::var("SIFT_QUEUE_CAP")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(2048);
    let (tx, handle) = spawn_ingest(cap);
    let mut sent = 0usize;
    for raw in objects {
        let d = Delta {
            uid: uid_from_raw(raw),
            kind: DeltaKind::Applied,
            raw: raw.clone(),
        };
        tx.send(d).await.context("ingest channel closed")?;
        sent += 1;
    }
    // closing the sender drains the coalescer and publishes the snapshot
    drop(tx);
    info!(sent, file = %path, "snapshot loaded");

    let wait_secs = std::env::var("SIFT_WAIT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(8);
    let mut rx = handle.subscribe_epoch();
    let deadline = Instant::now() + Duration::from_secs(wait_secs);
    while *rx.borrow() == 0 && sent > 0 {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let rem = deadline.duration_since(now).min(Duration::from_secs(2));
        if tokio::time::timeout(rem, rx.changed()).await.is_err() {
            break;
        }
    }
    Ok(handle)
}

fn print_records(output: Output, items: &[MetaObj]) -> Result<()> {
    match output {
        Output::Human => {
            println!("NAMESPACE   NAME                 AGE");
            for item in items {
                let ns_col = item.namespace.clone().unwrap_or_else(|| "-".to_string());
                println!("{:<11} {:<20} {}", ns_col, item.name, render_age(item.creation_ts));
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(items)?),
        Output::Yaml => print!("{}", serde_yaml::to_string(items)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ls { file, matches, fuzzy, order_by, reverse, limit } => {
            info!(file = %file, scope = %cli.scope, order_by = %order_by, reverse, "ls invoked");
            let handle = load_into_store(&file).await?;
            let engine = Searcher::new(MetaAdapter::new(&cli.kind), handle);
            let mut conditions = Conditions::new();
            for (k, v) in matches {
                conditions.matches.insert(k, v);
            }
            for (k, v) in fuzzy {
                conditions.fuzzy.insert(k, v);
            }
            match engine.search(&cli.scope, &conditions, &order_by, reverse) {
                Ok(mut items) => {
                    if let Some(n) = limit {
                        items.truncate(n);
                    }
                    print_records(cli.output, &items)?;
                }
                Err(e) => {
                    error!(error = %e, "search failed");
                    eprintln!("ls error: {}", e);
                }
            }
        }
        Commands::Get { file, name } => {
            info!(file = %file, scope = %cli.scope, name = %name, "get invoked");
            let handle = load_into_store(&file).await?;
            let engine = Searcher::new(MetaAdapter::new(&cli.kind), handle);
            match engine.get(&cli.scope, &name) {
                Ok(item) => print_records(cli.output, std::slice::from_ref(&item))?,
                Err(e) => {
                    error!(error = %e, "get failed");
                    eprintln!("get error: {}", e);
                }
            }
        }
    }

    Ok(())
}

fn render_age(creation_ts: i64) -> String {
    if creation_ts <= 0 {
        return "-".to_string();
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let mut secs = (now - creation_ts).max(0) as u64;
    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3600;
    secs %= 3600;
    let mins = secs / 60;
    secs %= 60;
    if days > 0 {
        format!("{}d{}h", days, hours)
    } else if hours > 0 {
        format!("{}h{}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", secs)
    }
}
