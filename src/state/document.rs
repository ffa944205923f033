use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::market_data::types::{ExchangeSupply, PriceSnapshot};
use crate::state::store::StoreError;

pub const METADATA: &str = "metadata";
pub const LAST_UPDATED: &str = "last_updated";
pub const MARKET_METRICS: &str = "current_market_metrics";
pub const SUPPLY_METRICS: [&str; 3] = ["trigger_dashboard", "exchange_supply_depletion", "key_metrics"];
pub const BINANCE_RESERVES: &str = "binance_reserves_xrp";
pub const TOTAL_EXCHANGE_SUPPLY: &str = "total_exchange_supply_xrp";

/// ISO-8601 local time without offset, microsecond precision.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// The persisted dashboard JSON.
///
/// Only the market metrics, the update timestamp and the exchange supply
/// figures are ever written; every other section is carried through
/// untouched, in its original key order.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardDocument {
    root: Map<String, Value>,
}

impl DashboardDocument {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path: path.to_path_buf() });
            }
            Err(source) => {
                return Err(StoreError::Read { path: path.to_path_buf(), source });
            }
        };

        let value: Value = serde_json::from_str(&text)
            .map_err(|source| StoreError::Parse { path: path.to_path_buf(), source })?;

        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(StoreError::NotAnObject { path: path.to_path_buf() }),
        }
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.get(&[METADATA, LAST_UPDATED]).and_then(Value::as_str)
    }

    pub fn price_usd(&self) -> Option<f64> {
        self.get(&[MARKET_METRICS, "price_usd"]).and_then(Value::as_f64)
    }

    /// Overwrites the four market metrics and stamps `metadata.last_updated`.
    /// Returns the timestamp written.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &PriceSnapshot,
        now: NaiveDateTime,
    ) -> Result<String, StoreError> {
        let metrics = self.section_mut(&[MARKET_METRICS])?;
        metrics.insert("price_usd".into(), Value::from(snapshot.price_usd));
        metrics.insert("price_change_24h_pct".into(), Value::from(snapshot.price_change_24h_pct));
        metrics.insert("market_cap_usd".into(), Value::from(snapshot.market_cap_usd));
        metrics.insert("volume_24h_usd".into(), Value::from(snapshot.volume_24h_usd));

        let stamp = now.format(TIMESTAMP_FORMAT).to_string();
        self.section_mut(&[METADATA])?
            .insert(LAST_UPDATED.into(), Value::String(stamp.clone()));

        Ok(stamp)
    }

    /// Supply figures are stored as decimal strings, as the viewer expects.
    pub fn apply_exchange_supply(&mut self, supply: &ExchangeSupply) -> Result<(), StoreError> {
        let key_metrics = self.section_mut(&SUPPLY_METRICS)?;
        key_metrics.insert(
            BINANCE_RESERVES.into(),
            Value::String(supply.binance_reserves.to_string()),
        );
        key_metrics.insert(
            TOTAL_EXCHANGE_SUPPLY.into(),
            Value::String(supply.total_exchange_supply.to_string()),
        );
        Ok(())
    }

    /// Pretty-prints to a sibling temp file, then renames it over `path`.
    /// A symlinked store is written through: the rename lands on the
    /// link's target, so the link itself survives.
    pub fn persist(&self, path: &Path) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write { path: path.to_path_buf(), source };

        let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;

        // temp files are created 0600; keep whatever mode the store had
        if let Ok(meta) = fs::metadata(&target) {
            tmp.as_file().set_permissions(meta.permissions()).map_err(write_err)?;
        }

        serde_json::to_writer_pretty(&mut tmp, &self.root).map_err(|err| write_err(err.into()))?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        tmp.persist(&target).map_err(|err| write_err(err.error))?;
        Ok(())
    }

    fn get(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.root.get(*first)?, |value, key| value.get(*key))
    }

    /// Walks to the object at `path`, creating empty objects for missing
    /// sections. Fails if an existing value on the way is not an object.
    fn section_mut(&mut self, path: &[&str]) -> Result<&mut Map<String, Value>, StoreError> {
        let mut current = &mut self.root;
        for (depth, key) in path.iter().enumerate() {
            let entry = current
                .entry(*key)
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                other => {
                    return Err(StoreError::Shape {
                        field: path[..=depth].join("."),
                        found: json_kind(other),
                    });
                }
            };
        }
        Ok(current)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
