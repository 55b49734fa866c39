use ontotrade::config::SystemConfig;
use ontotrade::dispatch::{AnalysisDispatcher, AnalysisPoll};
use ontotrade::engine::AnalysisEngine;
use ontotrade::market_data::MarketSnapshot;

use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, debug, error, info};
use std::env;
use std::fs;
use std::sync::Arc;
use tokio::time::{Duration, interval};

/// Install env_logger. Without RUST_LOG the logger accepts debug records but
/// the global level starts at info, so debug_mode can raise it after the
/// config is read.
fn init_logging() -> bool {
    let from_env = env::var_os("RUST_LOG").is_some();
    let mut builder = env_logger::Builder::from_default_env();
    if !from_env {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
    if !from_env {
        log::set_max_level(LevelFilter::Info);
    }
    from_env
}

#[tokio::main]
async fn main() -> Result<()> {
    let level_from_env = init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let (config_file, snapshot_file) = match args.as_slice() {
        [snapshot] => ("config.json", snapshot.as_str()),
        [config, snapshot] => (config.as_str(), snapshot.as_str()),
        _ => return Err(anyhow!("usage: ontotrade [config.json] <snapshot.json>")),
    };

    let config = SystemConfig::load_from_file(config_file)?;
    if config.debug_mode && !level_from_env {
        log::set_max_level(LevelFilter::Debug);
        debug!("Debug logging enabled by configuration");
    }

    let snapshot_str = fs::read_to_string(snapshot_file)
        .with_context(|| format!("reading market snapshot {}", snapshot_file))?;
    let snapshot: MarketSnapshot = serde_json::from_str(&snapshot_str)
        .with_context(|| format!("parsing market snapshot {}", snapshot_file))?;
    info!(
        "Analysing {} ({} bars, ML {})",
        snapshot.symbol,
        snapshot.bars.len(),
        if config.ml_enabled { "enabled" } else { "disabled" }
    );

    let dispatcher = AnalysisDispatcher::new(Arc::new(AnalysisEngine::new(config)));
    let mut ticket = dispatcher.dispatch(snapshot);

    let mut poll_tick = interval(Duration::from_millis(50));
    let outcome = loop {
        poll_tick.tick().await;
        match ticket.try_poll() {
            AnalysisPoll::Ready(outcome) => break outcome,
            AnalysisPoll::Pending => debug!("Analysis for {} still running", ticket.symbol()),
            AnalysisPoll::Closed => {
                return Err(anyhow!("Analysis for {} ended without a result", ticket.symbol()));
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if outcome.is_failed() {
        error!("Analysis for {} failed", outcome.symbol());
        std::process::exit(1);
    }
    Ok(())
}
