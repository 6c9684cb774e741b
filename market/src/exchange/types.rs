use serde::Deserialize;

pub const TRADING_STATUS: &str = "TRADING";

#[derive(Debug, Deserialize)]
pub struct ExchangeInfoEnvelope {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub quote_asset: String,
    pub status: String,
}

impl SymbolInfo {
    pub fn is_trading(&self) -> bool {
        self.status == TRADING_STATUS
    }
}

/// One row of the klines endpoint:
/// `[openTime, "o", "h", "l", "c", "v", closeTime, "quoteVol", trades, "takerBase", "takerQuote", "ignore"]`.
#[derive(Debug, Deserialize)]
pub struct KlineRow(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
    pub serde::de::IgnoredAny,
    pub serde::de::IgnoredAny,
    pub serde::de::IgnoredAny,
    pub serde::de::IgnoredAny,
    pub serde::de::IgnoredAny,
);
