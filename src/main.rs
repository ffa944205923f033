mod config;
mod cycle;
mod market_data;
mod metrics;
mod state;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{Cli, Config, RunMode};
use market_data::adapters::coingecko::CoinGeckoFeed;

fn init_tracing(directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .init();
}

// Single-threaded by construction: one cycle at a time, one writer.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Parse first so --help/--version exit before any setup.
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    let mode = cli.apply(&mut config);

    init_tracing(&config.log_level);

    // The exporter shares the single runtime thread: /metrics answers between cycles.
    if let Some(addr) = config.metrics_addr {
        crate::metrics::prometheus::init_metrics_server(addr)?;
        info!(%addr, "prometheus exporter listening");
    }

    let feed = CoinGeckoFeed::new(&config.api_url, &config.asset_id, config.request_timeout)?;
    let path = config.dashboard_path.as_path();

    info!(
        asset = feed.asset_id(),
        path = %path.display(),
        ?mode,
        "xrp-dashboard-updater starting"
    );

    match mode {
        RunMode::Single => {
            crate::metrics::prometheus::record_cycle("single");
            match cycle::run_cycle(&feed, path).await {
                Ok(_) => Ok(ExitCode::SUCCESS),
                Err(_) => Ok(ExitCode::FAILURE),
            }
        }
        RunMode::Continuous { interval } => {
            let shutdown = async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!(error = %err, "failed to listen for Ctrl-C, running until killed");
                    std::future::pending::<()>().await;
                }
            };

            let summary = cycle::run_continuous(&feed, path, interval, shutdown).await;
            info!(cycles = summary.cycles, writes = summary.writes, "goodbye");
            Ok(ExitCode::SUCCESS)
        }
    }
}
