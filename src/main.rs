use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use topkey::controller::ScanController;
use topkey::frame::Value;
use topkey::query::MemorySource;
use topkey::server;
use topkey::types::{ScanConfig, ScanSessionState};

/// topkey: incremental top-K key scanner over a remote key-value store's
/// query interface, with an embedded operator HTTP surface.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "topkey",
    version,
    about = "Incremental top-K key scanner with an embedded operator HTTP surface.",
    long_about = None
)]
struct Cli {
    /// Bind address for the operator HTTP surface.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Poll interval between scan steps in milliseconds.
    #[arg(long = "interval-ms", default_value_t = 1000)]
    interval_ms: u64,

    /// Cap on the retained top-K record set.
    #[arg(long, default_value_t = 100)]
    bound: usize,

    /// Advisory per-page work hint passed to the source.
    #[arg(long = "page-hint", default_value_t = 100)]
    page_hint: usize,

    /// Glob-style key filter.
    #[arg(long = "match", default_value = "*")]
    pattern: String,

    /// Size of the synthetic demo keyspace.
    #[arg(long, default_value_t = 10_000)]
    keys: usize,

    /// Serve the operator HTTP surface instead of running the one-shot demo.
    #[arg(long, default_value_t = false)]
    serve: bool,

    /// Write the final record set as pretty JSON to this path (demo mode).
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    tracing::info!(
        bind = %cli.bind,
        interval_ms = cli.interval_ms,
        bound = cli.bound,
        page_hint = cli.page_hint,
        pattern = %cli.pattern,
        keys = cli.keys,
        "topkey configuration"
    );

    let source = Arc::new(MemorySource::synthetic(cli.keys));
    let config = ScanConfig {
        result_bound: cli.bound,
        page_work_hint: cli.page_hint,
        match_pattern: cli.pattern.clone(),
    };
    let controller = ScanController::new(source, config);
    controller.set_interval_ms(cli.interval_ms).await;

    if cli.serve {
        server::spawn_server(&cli.bind, controller).await?;
        return Ok(());
    }

    // One-shot demo: scan the synthetic keyspace to completion and print
    // the resulting table.
    controller.update_total_keys().await;
    controller.start().await;
    loop {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let snapshot = controller.snapshot().await;
        if !snapshot.running {
            print_records_table(&snapshot);
            if let Some(path) = cli.output.as_deref() {
                write_records_json(path, &snapshot)?;
                println!("Wrote JSON records to {}", path.display());
            }
            break;
        }
    }

    Ok(())
}

fn print_records_table(snapshot: &ScanSessionState) {
    let frame = topkey::table::to_table(&snapshot.records);
    let mut key_w = "Key".len();
    let mut kind_w = "Type".len();
    for record in &snapshot.records {
        key_w = key_w.max(record.key.len());
        if let Some(kind) = &record.kind {
            kind_w = kind_w.max(kind.len());
        }
    }
    let metric_w = "Memory (bytes)".len();

    println!(
        "\nTop {} keys (processed {}/{})",
        snapshot.records.len(),
        snapshot.progress.processed,
        snapshot.progress.total
    );
    println!(
        "{:<key_w$}  {:<kind_w$}  {:>metric_w$}",
        "Key", "Type", "Memory (bytes)",
    );
    println!("{:-<key_w$}  {:-<kind_w$}  {:-<metric_w$}", "", "", "");
    for row in 0..frame.rows() {
        let key = frame.cell("key", row).and_then(Value::as_text).unwrap_or("");
        let kind = frame.cell("type", row).and_then(Value::as_text).unwrap_or("-");
        let metric = frame
            .cell("metric", row)
            .and_then(Value::as_f64)
            .map(|m| format!("{m:.0}"))
            .unwrap_or_else(|| "-".to_string());
        println!("{key:<key_w$}  {kind:<kind_w$}  {metric:>metric_w$}");
    }
}

fn write_records_json(path: &std::path::Path, snapshot: &ScanSessionState) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot.records)?;
    Ok(())
}
