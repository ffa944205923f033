use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::market_data::traits::PriceFeed;
use crate::market_data::types::PriceSnapshot;
use crate::metrics::prometheus as telemetry;

pub const DEFAULT_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_ASSET_ID: &str = "ripple";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const FEED_NAME: &str = "coingecko";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API returned status {0}")]
    Status(StatusCode),

    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("response has no quote for asset {0:?}")]
    MissingAsset(String),
}

impl FetchError {
    /// Short label used for the failure metric.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Request(_) => "request",
            FetchError::Status(_) => "status",
            FetchError::Decode(_) => "decode",
            FetchError::MissingAsset(_) => "missing_asset",
        }
    }
}

/// One entry of the `/simple/price` response, keyed by asset id.
/// Every field is required; a null or absent value fails the decode.
#[derive(Debug, Deserialize)]
struct SimplePriceQuote {
    usd: f64,
    usd_24h_change: f64,
    usd_market_cap: f64,
    usd_24h_vol: f64,
}

impl From<SimplePriceQuote> for PriceSnapshot {
    fn from(quote: SimplePriceQuote) -> Self {
        PriceSnapshot {
            price_usd: quote.usd,
            price_change_24h_pct: quote.usd_24h_change,
            market_cap_usd: quote.usd_market_cap,
            volume_24h_usd: quote.usd_24h_vol,
        }
    }
}

/// CoinGecko's free `/simple/price` endpoint. No API key required.
pub struct CoinGeckoFeed {
    client: Client,
    base_url: String,
    asset_id: String,
}

impl CoinGeckoFeed {
    pub fn new(
        base_url: impl Into<String>,
        asset_id: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            asset_id: asset_id.into(),
        })
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Single GET for price, 24h change, market cap and 24h volume.
    pub async fn try_fetch(&self) -> Result<PriceSnapshot, FetchError> {
        let url = format!("{}/simple/price", self.base_url.trim_end_matches('/'));
        debug!(%url, asset = %self.asset_id, "requesting price quote");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", self.asset_id.as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
                ("include_market_cap", "true"),
                ("include_24hr_vol", "true"),
            ])
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let mut quotes: HashMap<String, SimplePriceQuote> =
            response.json().await.map_err(FetchError::Decode)?;

        quotes
            .remove(&self.asset_id)
            .map(PriceSnapshot::from)
            .ok_or_else(|| FetchError::MissingAsset(self.asset_id.clone()))
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    fn name(&self) -> &'static str {
        FEED_NAME
    }

    async fn fetch_price_snapshot(&self) -> Option<PriceSnapshot> {
        let started = Instant::now();
        let result = self.try_fetch().await;
        telemetry::record_fetch_latency_ms(FEED_NAME, started.elapsed().as_secs_f64() * 1_000.0);

        match result {
            Ok(snapshot) => {
                telemetry::record_fetch(FEED_NAME, "ok");
                info!(
                    asset = %self.asset_id,
                    price_usd = %format!("{:.4}", snapshot.price_usd),
                    change_24h_pct = %format!("{:.2}", snapshot.price_change_24h_pct),
                    market_cap_b = %format!("{:.2}", snapshot.market_cap_usd / 1e9),
                    volume_24h_b = %format!("{:.2}", snapshot.volume_24h_usd / 1e9),
                    "live price fetched"
                );
                Some(snapshot)
            }
            Err(err) => {
                telemetry::record_fetch(FEED_NAME, "error");
                telemetry::record_fetch_failure(FEED_NAME, err.reason());
                warn!(
                    asset = %self.asset_id,
                    reason = err.reason(),
                    error = %err,
                    "could not fetch live price data"
                );
                None
            }
        }
    }
}
