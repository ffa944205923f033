pub mod coingecko;
pub mod exchange_supply;
