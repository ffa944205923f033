use crate::market_data::types::ExchangeSupply;

/// Last known Binance reserve, 3.6B XRP.
pub const BINANCE_RESERVES_XRP: u64 = 3_600_000_000;

/// Last known supply across all tracked exchanges, 8.5B XRP.
pub const TOTAL_EXCHANGE_SUPPLY_XRP: u64 = 8_500_000_000;

/// Exchange reserve figures.
///
/// Placeholder values until a paid on-chain data provider is wired in;
/// does no I/O and cannot fail.
pub fn fetch_exchange_supply() -> ExchangeSupply {
    ExchangeSupply {
        binance_reserves: BINANCE_RESERVES_XRP,
        total_exchange_supply: TOTAL_EXCHANGE_SUPPLY_XRP,
    }
}
