//! kemono-extract — Binary Entrypoint
//! Crawls one creator (or one post) and prints the event stream as JSON lines.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kemono_extractor::ingest::config::{load_config_default, load_config_from};
use kemono_extractor::ingest::ensure_metrics_described;
use kemono_extractor::ingest::providers::http::HttpSource;
use kemono_extractor::{Extractor, Target};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kemono-extract")]
#[command(about = "Emit directory/file events for a kemono.party creator or post")]
#[command(version)]
struct Cli {
    /// Service name, e.g. `fanbox` or `patreon`
    service: String,

    /// Creator id
    user_id: String,

    /// Post id; fetches just this post instead of the whole listing
    post_id: Option<String>,

    /// Stop after this many posts
    #[arg(short, long)]
    limit: Option<usize>,

    /// Config file (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the site root
    #[arg(long)]
    root: Option<String>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    metrics: bool,

    /// Log as JSON instead of compact text
    #[arg(long)]
    json_logs: bool,
}

/// Logs go to stderr; stdout carries only events.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kemono_extractor=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn install_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    Ok(handle)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let metrics = if cli.metrics {
        Some(install_metrics()?)
    } else {
        None
    };

    let mut cfg = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config_default()?,
    };
    if let Some(root) = cli.root {
        cfg.root = root.trim_end_matches('/').to_string();
    }

    let source = Arc::new(HttpSource::from_config(&cfg).context("building http client")?);
    let target = Target {
        service: cli.service,
        user_id: cli.user_id,
        post_id: cli.post_id,
    };
    info!(root = %cfg.root, ?target, "starting extraction");

    let mut extractor = Extractor::new(source, target);
    if let Some(n) = cli.limit {
        extractor = extractor.with_limit(n);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut count = 0usize;
    let result = loop {
        match extractor.next_event().await {
            Ok(Some(ev)) => {
                serde_json::to_writer(&mut out, &ev).context("writing event")?;
                out.write_all(b"\n").context("writing event")?;
                count += 1;
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    out.flush().context("flushing stdout")?;

    info!(events = count, posts = extractor.posts_seen(), "done");

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }

    result.context("extraction aborted")
}
