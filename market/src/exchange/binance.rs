use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::errors::ExchangeError;
use super::types::{ExchangeInfoEnvelope, KlineRow, SymbolInfo};
use super::ExchangeApi;
use crate::interval::Interval;
use crate::types::Bar;

pub const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";

/// USDⓈ-M futures REST client (public market-data endpoints only).
#[derive(Clone)]
pub struct BinanceFuturesClient {
    http: Client,
    base_url: String,
}

impl BinanceFuturesClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ExchangeError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ExchangeApi for BinanceFuturesClient {
    #[instrument(skip(self), level = "debug")]
    async fn exchange_info(&self) -> Result<Vec<SymbolInfo>, ExchangeError> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.base_url);

        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let envelope: ExchangeInfoEnvelope = resp.json().await?;

        debug!(symbols = envelope.symbols.len(), "exchange info fetched");
        Ok(envelope.symbols)
    }

    #[instrument(skip(self), fields(symbol = %symbol, interval = %interval), level = "debug")]
    async fn historical_bars(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<Bar>, ExchangeError> {
        let url = format!("{}/fapi/v1/klines", self.base_url);
        let limit = limit.to_string();

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let rows: Vec<KlineRow> = resp.json().await?;
        let bars = bars_from_rows(rows, chrono::Utc::now().timestamp_millis())?;

        debug!(bars = bars.len(), "historical bars fetched");
        Ok(bars)
    }
}

/// Rows whose close time has passed at `now_ms` are final; the last row is
/// normally the still-forming bar.
pub fn bars_from_rows(rows: Vec<KlineRow>, now_ms: i64) -> Result<Vec<Bar>, ExchangeError> {
    rows.into_iter()
        .map(|r| {
            Ok(Bar {
                open_time_ms: r.0,
                open: parse(&r.1, "open")?,
                high: parse(&r.2, "high")?,
                low: parse(&r.3, "low")?,
                close: parse(&r.4, "close")?,
                volume: parse(&r.5, "volume")?,
                close_time_ms: r.6,
                closed: r.6 <= now_ms,
            })
        })
        .collect()
}

fn parse(v: &str, field: &'static str) -> Result<f64, ExchangeError> {
    v.parse::<f64>()
        .map_err(|source| ExchangeError::ParseFloat { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"[
        [1700000000000, "100.0", "101.0", "99.0", "100.5", "10.0", 1700000059999, "1000.0", 12, "5.0", "500.0", "0"],
        [1700000060000, "100.5", "102.0", "100.0", "101.5", "11.0", 1700000119999, "1100.0", 13, "6.0", "600.0", "0"]
    ]"#;

    #[test]
    fn rows_become_bars_in_order() {
        let rows: Vec<KlineRow> = serde_json::from_str(ROWS).unwrap();
        let bars = bars_from_rows(rows, 1_700_000_100_000).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 100.5);
        assert_eq!(bars[1].open_time_ms, 1_700_000_060_000);
        assert!(bars[0].closed);
        // Close time still in the future: the forming bar.
        assert!(!bars[1].closed);
    }

    #[test]
    fn bad_decimal_names_the_field() {
        let raw = r#"[[1, "1", "1", "1", "oops", "1", 2, "0", 0, "0", "0", "0"]]"#;
        let rows: Vec<KlineRow> = serde_json::from_str(raw).unwrap();

        let err = bars_from_rows(rows, 10).unwrap_err();

        assert!(matches!(err, ExchangeError::ParseFloat { field: "close", .. }));
    }

    #[test]
    fn exchange_info_envelope_decodes_camel_case() {
        let raw = r#"{"timezone":"UTC","symbols":[
            {"symbol":"BTCUSDT","pair":"BTCUSDT","status":"TRADING","baseAsset":"BTC","quoteAsset":"USDT"}
        ]}"#;
        let env: ExchangeInfoEnvelope = serde_json::from_str(raw).unwrap();

        assert_eq!(env.symbols[0].quote_asset, "USDT");
        assert!(env.symbols[0].is_trading());
    }

    #[test]
    fn base_url_is_normalized() {
        let c = BinanceFuturesClient::new("https://example.test/").unwrap();
        assert_eq!(c.base_url, "https://example.test");
    }
}
