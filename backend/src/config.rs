use std::str::FromStr;

use engine::{AggregationPolicy, EngineConfig};
use market::Interval;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// `production` switches logging to JSON output.
    pub app_env: String,

    /// REST base for instrument metadata and historical bars.
    pub exchange_rest_url: String,

    /// Combined-stream websocket endpoint of the live kline feed.
    pub kline_ws_url: String,

    /// Explicit stream names, e.g. `btcusdt@kline_1m`. When unset the feed
    /// subscribes to every instrument the `ALL` selector would resolve to.
    pub kline_streams: Option<Vec<String>>,

    /// Interval of the discovered streams.
    pub kline_interval: Interval,

    /// 1-based slice of the discovered instruments this process subscribes to.
    pub symbol_group: usize,

    /// Number of slices the discovered instruments are split into.
    pub total_groups: usize,

    /// Quote currency the `ALL` selector resolves against.
    pub reference_quote: String,

    /// Bars fetched per instrument on registration; also the window capacity.
    pub seed_limit: usize,

    /// Whether every rule (`all`) or any rule (`any`) must hold to alert.
    pub aggregation: AggregationPolicy,

    /// Cap on rule evaluations running at once, across all jobs.
    pub max_inflight_evaluations: usize,

    /// Capacity of each in-process topic.
    ///
    /// Acts as backpressure: a slow data plane eventually blocks the feed.
    pub topic_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_env: "dev".to_string(),
            exchange_rest_url: market::exchange::binance::DEFAULT_BASE_URL.to_string(),
            kline_ws_url: "wss://fstream.binance.com/stream".to_string(),
            kline_streams: None,
            kline_interval: Interval::M1,
            symbol_group: 1,
            total_groups: 1,
            reference_quote: "USDT".to_string(),
            seed_limit: 100,
            aggregation: AggregationPolicy::All,
            max_inflight_evaluations: 256,
            topic_capacity: 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparseable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let kline_streams = lookup("KLINE_STREAMS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|streams| !streams.is_empty());

        let total_groups = parsed(&lookup, "TOTAL_GROUPS", defaults.total_groups, |v: &usize| {
            *v > 0
        });
        let symbol_group = parsed(&lookup, "SYMBOL_GROUP", defaults.symbol_group, |v: &usize| {
            (1..=total_groups).contains(v)
        });

        Self {
            app_env: text("APP_ENV", defaults.app_env),
            exchange_rest_url: text("EXCHANGE_REST_URL", defaults.exchange_rest_url),
            kline_ws_url: text("KLINE_WS_URL", defaults.kline_ws_url),
            kline_streams,
            kline_interval: parsed(&lookup, "KLINE_INTERVAL", defaults.kline_interval, |_| true),
            symbol_group,
            total_groups,
            reference_quote: text("REFERENCE_QUOTE", defaults.reference_quote).to_ascii_uppercase(),
            seed_limit: parsed(&lookup, "SEED_LIMIT", defaults.seed_limit, |v: &usize| *v > 0),
            aggregation: parsed(&lookup, "ALERT_AGGREGATION", defaults.aggregation, |_| true),
            max_inflight_evaluations: parsed(
                &lookup,
                "MAX_INFLIGHT_EVALUATIONS",
                defaults.max_inflight_evaluations,
                |v: &usize| *v > 0,
            ),
            topic_capacity: parsed(&lookup, "TOPIC_CAPACITY", defaults.topic_capacity, |v: &usize| {
                *v > 0
            }),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// Combined-stream URL: `<base>?streams=a/b/c`.
    pub fn stream_url(&self, streams: &[String]) -> String {
        format!("{}?streams={}", self.kline_ws_url, streams.join("/"))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            reference_quote: self.reference_quote.clone(),
            seed_limit: self.seed_limit,
            aggregation: self.aggregation,
            max_inflight_evaluations: self.max_inflight_evaluations,
            ..EngineConfig::default()
        }
    }
}

fn parsed<T, L>(lookup: &L, key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + std::fmt::Debug,
    L: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    match raw.trim().parse::<T>() {
        Ok(v) if valid(&v) => v,
        _ => {
            warn!(key, value = %raw, fallback = ?default, "invalid config value; using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tracing_test::traced_test;

    fn from(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = from(&[]);

        assert_eq!(cfg.seed_limit, 100);
        assert_eq!(cfg.aggregation, AggregationPolicy::All);
        assert_eq!(cfg.topic_capacity, 1024);
        assert!(!cfg.is_production());
        assert_eq!(cfg.kline_streams, None);
        assert_eq!(cfg.kline_interval, Interval::M1);
        assert_eq!((cfg.symbol_group, cfg.total_groups), (1, 1));
        assert_eq!(
            cfg.stream_url(&["btcusdt@kline_1m".to_string()]),
            "wss://fstream.binance.com/stream?streams=btcusdt@kline_1m"
        );
    }

    #[test]
    fn values_are_read_and_normalized() {
        let cfg = from(&[
            ("APP_ENV", "production"),
            ("KLINE_STREAMS", "BTCUSDT@kline_1m, ethusdt@kline_5m,,"),
            ("REFERENCE_QUOTE", "usdc"),
            ("SEED_LIMIT", "250"),
            ("ALERT_AGGREGATION", "ANY"),
            ("MAX_INFLIGHT_EVALUATIONS", "16"),
            ("KLINE_INTERVAL", "15m"),
            ("SYMBOL_GROUP", "2"),
            ("TOTAL_GROUPS", "3"),
        ]);

        assert!(cfg.is_production());
        assert_eq!(
            cfg.kline_streams,
            Some(vec!["btcusdt@kline_1m".to_string(), "ethusdt@kline_5m".to_string()])
        );
        assert_eq!(cfg.kline_interval, Interval::M15);
        assert_eq!((cfg.symbol_group, cfg.total_groups), (2, 3));

        let engine = cfg.engine_config();
        assert_eq!(engine.reference_quote, "USDC");
        assert_eq!(engine.seed_limit, 250);
        assert_eq!(engine.aggregation, AggregationPolicy::Any);
        assert_eq!(engine.max_inflight_evaluations, 16);
    }

    #[test]
    #[traced_test]
    fn invalid_values_fall_back_with_a_warning() {
        let cfg = from(&[
            ("SEED_LIMIT", "lots"),
            ("TOPIC_CAPACITY", "0"),
            ("ALERT_AGGREGATION", "majority"),
            ("KLINE_INTERVAL", "7m"),
            ("SYMBOL_GROUP", "4"),
            ("TOTAL_GROUPS", "3"),
        ]);

        assert_eq!(cfg.seed_limit, 100);
        assert_eq!(cfg.topic_capacity, 1024);
        assert_eq!(cfg.aggregation, AggregationPolicy::All);
        assert_eq!(cfg.kline_interval, Interval::M1);
        assert_eq!((cfg.symbol_group, cfg.total_groups), (1, 3));
        assert!(logs_contain("invalid config value"));
    }
}
