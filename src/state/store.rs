use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::market_data::adapters::exchange_supply::fetch_exchange_supply;
use crate::market_data::types::{ExchangeSupply, PriceSnapshot};
use crate::metrics::prometheus as telemetry;
use crate::state::document::DashboardDocument;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dashboard document {} not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{} is not valid JSON: {source}", .path.display())]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("{} does not hold a JSON object at the top level", .path.display())]
    NotAnObject { path: PathBuf },

    #[error("`{field}` is a {found}, expected an object")]
    Shape { field: String, found: &'static str },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

impl StoreError {
    pub fn reason(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Read { .. } => "read",
            StoreError::Parse { .. } => "parse",
            StoreError::NotAnObject { .. } => "not_an_object",
            StoreError::Shape { .. } => "shape",
            StoreError::Write { .. } => "write",
        }
    }
}

/// What a successful `apply_update` wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub price_updated: bool,
    /// Timestamp stamped into `metadata.last_updated`, if the metrics changed.
    pub last_updated: Option<String>,
    pub exchange_supply: ExchangeSupply,
}

/// Read-modify-write of the dashboard document, stamped with local time.
pub fn apply_update(
    path: &Path,
    incoming: Option<PriceSnapshot>,
) -> Result<UpdateOutcome, StoreError> {
    apply_update_at(path, incoming, Local::now().naive_local())
}

/// Load, merge and persist with an explicit timestamp.
///
/// Nothing is written unless the document loads and both merges succeed.
/// Without a snapshot the market metrics and `last_updated` keep their
/// prior values; exchange supply is refreshed either way.
pub fn apply_update_at(
    path: &Path,
    incoming: Option<PriceSnapshot>,
    now: NaiveDateTime,
) -> Result<UpdateOutcome, StoreError> {
    let result = merge_and_persist(path, incoming, now);

    match &result {
        Ok(_) => telemetry::record_store_write(),
        Err(err) => telemetry::record_store_failure(err.reason()),
    }

    result
}

fn merge_and_persist(
    path: &Path,
    incoming: Option<PriceSnapshot>,
    now: NaiveDateTime,
) -> Result<UpdateOutcome, StoreError> {
    let mut document = DashboardDocument::load(path)?;
    debug!(
        path = %path.display(),
        previous_price_usd = ?document.price_usd(),
        previous_update = ?document.last_updated(),
        "dashboard document loaded"
    );

    let last_updated = match incoming {
        Some(snapshot) => {
            let stamp = document.apply_snapshot(&snapshot, now)?;
            info!(price_usd = snapshot.price_usd, last_updated = %stamp, "market metrics updated");
            Some(stamp)
        }
        None => {
            warn!("no live price data, keeping existing market metrics");
            None
        }
    };

    let supply = fetch_exchange_supply();
    document.apply_exchange_supply(&supply)?;
    info!(
        total_exchange_supply_b = %format!("{:.2}", supply.total_exchange_supply as f64 / 1e9),
        "exchange supply updated"
    );

    document.persist(path)?;

    Ok(UpdateOutcome {
        price_updated: last_updated.is_some(),
        last_updated,
        exchange_supply: supply,
    })
}
