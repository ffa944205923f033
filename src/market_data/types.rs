/// The four market metrics pulled from the quote API in one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSnapshot {
    pub price_usd: f64,
    pub price_change_24h_pct: f64,
    pub market_cap_usd: f64,
    pub volume_24h_usd: f64,
}

/// Coins held on exchanges, in whole XRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeSupply {
    pub binance_reserves: u64,
    pub total_exchange_supply: u64,
}
