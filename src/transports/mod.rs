//! Transport implementations

pub mod coingecko;

pub use coingecko::CoinGeckoTransport;
