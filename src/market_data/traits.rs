use async_trait::async_trait;

use super::types::PriceSnapshot;

/// Source of live price data for one asset.
///
/// Infallible from the caller's side: implementations log and record
/// their own failures and hand back `None`, so a bad fetch only ever
/// means "no update this cycle".
#[async_trait]
pub trait PriceFeed: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_price_snapshot(&self) -> Option<PriceSnapshot>;
}
