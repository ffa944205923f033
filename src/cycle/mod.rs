use std::future::Future;
use std::path::Path;
use std::time::Duration;

use chrono::Local;
use tokio::time::sleep;
use tracing::{error, info};

use crate::market_data::traits::PriceFeed;
use crate::metrics::prometheus as telemetry;
use crate::state::store::{StoreError, UpdateOutcome, apply_update};

/// Counts from a continuous run, returned once the loop is interrupted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: u64,
    pub writes: u64,
}

/// One fetch → merge → persist pass.
pub async fn run_cycle(feed: &dyn PriceFeed, path: &Path) -> Result<UpdateOutcome, StoreError> {
    info!(
        at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        path = %path.display(),
        "dashboard update starting"
    );

    info!(feed = feed.name(), "fetching live price data");
    let snapshot = feed.fetch_price_snapshot().await;

    let result = apply_update(path, snapshot);
    match &result {
        Ok(outcome) => info!(
            path = %path.display(),
            price_updated = outcome.price_updated,
            last_updated = outcome.last_updated.as_deref().unwrap_or("unchanged"),
            binance_reserves = outcome.exchange_supply.binance_reserves,
            total_exchange_supply = outcome.exchange_supply.total_exchange_supply,
            "dashboard updated successfully"
        ),
        Err(err) => error!(path = %path.display(), error = %err, "dashboard update failed"),
    }

    result
}

/// Repeats [`run_cycle`] every `interval` until `shutdown` resolves.
///
/// The interval is measured from the end of one cycle to the start of the
/// next, so a slow fetch pushes every later cycle back. `shutdown` is only
/// observed between cycles; a cycle in flight always runs to completion.
pub async fn run_continuous<F>(
    feed: &dyn PriceFeed,
    path: &Path,
    interval: Duration,
    shutdown: F,
) -> LoopSummary
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let interval_minutes = interval.as_secs() / 60;
    info!(interval_minutes, "starting continuous update mode, press Ctrl+C to stop");

    let mut summary = LoopSummary::default();
    loop {
        telemetry::record_cycle("continuous");
        summary.cycles += 1;
        if run_cycle(feed, path).await.is_ok() {
            summary.writes += 1;
        }

        info!(interval_minutes, "next update in {interval_minutes} minutes");

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!(cycles = summary.cycles, writes = summary.writes, "update loop stopped by user");
                break;
            }
            _ = sleep(interval) => {}
        }
    }

    summary
}
