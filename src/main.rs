use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use tls_probe::config;
use tls_probe::{ProbeConfig, TlsChecker, TransportChoice};

#[derive(Parser)]
#[command(name = "tls-probe")]
#[command(version, about = "Checks whether this host negotiates a modern TLS version")]
struct Cli {
    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Attestation endpoint to query
    #[arg(long)]
    endpoint: Option<String>,

    /// Transport to use: direct or jsonp
    #[arg(long)]
    transport: Option<String>,

    /// Cache freshness window in milliseconds
    #[arg(long)]
    ttl_ms: Option<i64>,

    /// Verdict database location
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Ignore the cached verdict and ask the endpoint again
    #[arg(long)]
    fresh: bool,

    /// Print the verdict as JSON
    #[arg(long)]
    json: bool,

    /// Write logs to the data directory instead of stderr
    #[arg(long)]
    log_file: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            if cli.json {
                println!("{}", json!({ "error": e.to_string() }));
            } else {
                eprintln!("error: {e:#}");
            }
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = resolve_config(cli)?;

    let compatible = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(TlsChecker::run_once(&config, cli.fresh))?;

    if cli.json {
        println!(
            "{}",
            json!({ "compatible": compatible, "version": tls_probe::VERSION })
        );
    } else if compatible {
        println!("compatible: a modern TLS version was negotiated");
    } else {
        println!("incompatible: no modern TLS version could be negotiated");
    }

    Ok(compatible)
}

/// Config file first, then environment variables, then flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<ProbeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {:?}", path))?
        }
        None => ProbeConfig::default(),
    };

    config.apply_env();

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(raw) = &cli.transport {
        config.transport = raw
            .parse::<TransportChoice>()
            .map_err(|()| anyhow::anyhow!("Unknown transport {raw:?} (expected direct or jsonp)"))?;
    }
    if let Some(ttl_ms) = cli.ttl_ms {
        config.ttl_ms = ttl_ms;
    }
    if let Some(db_path) = &cli.db_path {
        config.db_path = Some(db_path.clone());
    }

    Ok(config)
}

/// Logs go to stderr, or as JSON to a file under the data directory when
/// stderr must stay clean. The returned guard keeps the non-blocking
/// writer flushing until main exits.
fn init_logging(log_to_file: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if log_to_file {
        let log_path = config::log_path();
        if let Some(dir) = log_path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }

        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(writer)
                .init();
            return Some(guard);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    None
}
