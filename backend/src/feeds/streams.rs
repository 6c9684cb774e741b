use anyhow::Context;
use tracing::info;

use market::exchange::resolve_wildcard;
use market::{ExchangeApi, Interval};

/// Slice `group` (1-based) of `total` near-equal slices. The last slice also
/// takes the remainder, so every symbol lands in exactly one group.
pub fn symbols_for_group(symbols: &[String], group: usize, total: usize) -> &[String] {
    if total == 0 || group == 0 || group > total {
        return &[];
    }

    let size = symbols.len() / total;
    let start = (group - 1) * size;
    let end = if group == total { symbols.len() } else { start + size };
    &symbols[start..end]
}

/// `btcusdt@kline_1m` style stream name.
pub fn kline_stream(symbol: &str, interval: Interval) -> String {
    format!("{}@kline_{}", symbol.to_ascii_lowercase(), interval)
}

/// Every trading instrument of `reference_quote`, restricted to this
/// process's group, as kline stream names.
pub async fn discover_streams(
    exchange: &dyn ExchangeApi,
    reference_quote: &str,
    interval: Interval,
    group: usize,
    total: usize,
) -> anyhow::Result<Vec<String>> {
    let listing = exchange
        .exchange_info()
        .await
        .context("fetching instruments for the live feed")?;
    let symbols = resolve_wildcard(&listing, reference_quote);
    let mine = symbols_for_group(&symbols, group, total);

    info!(
        interval = %interval,
        group,
        total,
        matched = symbols.len(),
        subscribed = mine.len(),
        "live feed instruments discovered"
    );

    Ok(mine.iter().map(|s| kline_stream(s, interval)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use market::{Bar, ExchangeError, SymbolInfo};

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S{i}USDT")).collect()
    }

    #[test]
    fn groups_split_evenly_and_last_takes_remainder() {
        let all = symbols(10);

        assert_eq!(symbols_for_group(&all, 1, 3), &all[0..3]);
        assert_eq!(symbols_for_group(&all, 2, 3), &all[3..6]);
        assert_eq!(symbols_for_group(&all, 3, 3), &all[6..10]);
    }

    #[test]
    fn groups_cover_every_symbol_once() {
        let all = symbols(17);
        let joined: Vec<String> = (1..=4)
            .flat_map(|g| symbols_for_group(&all, g, 4).to_vec())
            .collect();

        assert_eq!(joined, all);
    }

    #[test]
    fn fewer_symbols_than_groups_go_to_the_last_group() {
        let all = symbols(2);

        assert!(symbols_for_group(&all, 1, 3).is_empty());
        assert!(symbols_for_group(&all, 2, 3).is_empty());
        assert_eq!(symbols_for_group(&all, 3, 3), &all[..]);
    }

    #[test]
    fn out_of_range_group_is_empty() {
        let all = symbols(6);

        assert!(symbols_for_group(&all, 0, 3).is_empty());
        assert!(symbols_for_group(&all, 4, 3).is_empty());
        assert!(symbols_for_group(&all, 1, 0).is_empty());
    }

    struct Listing(Vec<SymbolInfo>);

    #[async_trait]
    impl ExchangeApi for Listing {
        async fn exchange_info(&self) -> Result<Vec<SymbolInfo>, ExchangeError> {
            Ok(self.0.clone())
        }

        async fn historical_bars(
            &self,
            _symbol: &str,
            _interval: Interval,
            _limit: usize,
        ) -> Result<Vec<Bar>, ExchangeError> {
            Ok(Vec::new())
        }
    }

    fn info(symbol: &str, quote: &str, status: &str) -> SymbolInfo {
        SymbolInfo {
            symbol: symbol.into(),
            quote_asset: quote.into(),
            status: status.into(),
        }
    }

    #[tokio::test]
    async fn discovered_streams_follow_the_wildcard_filter() {
        let exchange = Listing(vec![
            info("BTCUSDT", "USDT", "TRADING"),
            info("ETHBTC", "BTC", "TRADING"),
            info("SOLUSDT", "USDT", "BREAK"),
            info("XRPUSDT", "USDT", "TRADING"),
        ]);

        let all = discover_streams(&exchange, "USDT", Interval::M5, 1, 1).await.unwrap();
        assert_eq!(all, vec!["btcusdt@kline_5m", "xrpusdt@kline_5m"]);

        let second = discover_streams(&exchange, "USDT", Interval::M5, 2, 2).await.unwrap();
        assert_eq!(second, vec!["xrpusdt@kline_5m"]);
    }
}
