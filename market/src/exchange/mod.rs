//! Exchange collaborators used by the control plane: symbol metadata for
//! wildcard resolution and historical bars for seeding windows.

pub mod binance;
pub mod errors;
pub mod types;

use async_trait::async_trait;

pub use binance::BinanceFuturesClient;
pub use errors::ExchangeError;
pub use types::SymbolInfo;

use crate::interval::Interval;
use crate::types::Bar;

#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Every listed instrument with its quote asset and trading status.
    async fn exchange_info(&self) -> Result<Vec<SymbolInfo>, ExchangeError>;

    /// The most recent `limit` bars for `symbol`, oldest first.
    async fn historical_bars(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Bar>, ExchangeError>;
}

/// Symbols quoted in `reference_quote` that are currently trading.
pub fn resolve_wildcard(symbols: &[SymbolInfo], reference_quote: &str) -> Vec<String> {
    symbols
        .iter()
        .filter(|s| s.quote_asset.eq_ignore_ascii_case(reference_quote) && s.is_trading())
        .map(|s| s.symbol.to_ascii_uppercase())
        .collect()
}
