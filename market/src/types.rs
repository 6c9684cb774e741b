use serde::{Deserialize, Deserializer};

/// One fixed-interval OHLCV sample.
///
/// `closed == false` marks the still-forming bar; the exchange keeps
/// re-sending it until the interval ends and a final `closed` copy arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub open_time_ms: i64,
    pub close_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub closed: bool,
}

/// Live bar event as published on the data topic:
/// `{"data":{"s":"BTCUSDT","k":{"i":"1m","x":false,"t":..,"T":..,"o":..}}}`.
///
/// The interval is kept as the raw string so events for intervals the engine
/// does not know still map to a (never registered) key instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct KlineEvent {
    pub symbol: String,
    pub interval: String,
    pub bar: Bar,
}

impl KlineEvent {
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let env: KlineEnvelope = serde_json::from_slice(raw)?;
        let k = env.data.kline;

        Ok(Self {
            symbol: env.data.symbol.to_ascii_uppercase(),
            interval: k.interval,
            bar: Bar {
                open_time_ms: k.open_time_ms,
                close_time_ms: k.close_time_ms,
                open: k.open,
                high: k.high,
                low: k.low,
                close: k.close,
                volume: k.volume,
                closed: k.closed,
            },
        })
    }

    /// Registry key: `SYMBOL:interval`.
    pub fn key(&self) -> String {
        job_key(&self.symbol, &self.interval)
    }
}

/// Builds the `instrument:interval` key shared by the control and data planes.
pub fn job_key(symbol: &str, interval: &str) -> String {
    format!("{symbol}:{interval}")
}

#[derive(Debug, Deserialize)]
struct KlineEnvelope {
    data: KlineData,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "k")]
    kline: RawKline,
}

#[derive(Debug, Deserialize)]
struct RawKline {
    #[serde(rename = "i")]
    interval: String,
    #[serde(rename = "x")]
    closed: bool,
    #[serde(rename = "t")]
    open_time_ms: i64,
    #[serde(rename = "T")]
    close_time_ms: i64,
    #[serde(rename = "o", deserialize_with = "decimal")]
    open: f64,
    #[serde(rename = "h", deserialize_with = "decimal")]
    high: f64,
    #[serde(rename = "l", deserialize_with = "decimal")]
    low: f64,
    #[serde(rename = "c", deserialize_with = "decimal")]
    close: f64,
    #[serde(rename = "v", deserialize_with = "decimal")]
    volume: f64,
}

/// Exchanges send prices either as JSON numbers or as decimal strings.
pub(crate) fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(v) => Ok(v),
        NumOrStr::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid decimal {s:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXCHANGE_FRAME: &str = r#"{
        "stream": "btcusdt@kline_1m",
        "data": {
            "e": "kline", "E": 1700000000123, "s": "BTCUSDT",
            "k": {
                "t": 1700000000000, "T": 1700000059999, "s": "BTCUSDT", "i": "1m",
                "o": "37000.10", "c": "37010.50", "h": "37020.00", "l": "36990.00",
                "v": "12.345", "n": 100, "x": true, "q": "456789.0"
            }
        }
    }"#;

    #[test]
    fn parses_exchange_frame_with_string_decimals() {
        let ev = KlineEvent::from_json(EXCHANGE_FRAME.as_bytes()).unwrap();

        assert_eq!(ev.symbol, "BTCUSDT");
        assert_eq!(ev.interval, "1m");
        assert_eq!(ev.key(), "BTCUSDT:1m");
        assert!(ev.bar.closed);
        assert_eq!(ev.bar.open_time_ms, 1_700_000_000_000);
        assert_eq!(ev.bar.close_time_ms, 1_700_000_059_999);
        assert!((ev.bar.close - 37010.5).abs() < 1e-9);
        assert!((ev.bar.volume - 12.345).abs() < 1e-9);
    }

    #[test]
    fn accepts_numeric_decimals() {
        let raw = r#"{"data":{"s":"ethusdt","k":{"i":"5m","x":false,"t":1,"T":2,
            "o":1.5,"h":2,"l":1,"c":1.75,"v":10}}}"#;
        let ev = KlineEvent::from_json(raw.as_bytes()).unwrap();

        assert_eq!(ev.key(), "ETHUSDT:5m");
        assert!(!ev.bar.closed);
        assert_eq!(ev.bar.close, 1.75);
    }

    #[test]
    fn rejects_garbage_decimal() {
        let raw = r#"{"data":{"s":"X","k":{"i":"1m","x":true,"t":1,"T":2,
            "o":"abc","h":"1","l":"1","c":"1","v":"1"}}}"#;
        assert!(KlineEvent::from_json(raw.as_bytes()).is_err());
    }

    #[test]
    fn rejects_missing_envelope() {
        assert!(KlineEvent::from_json(br#"{"s":"BTCUSDT"}"#).is_err());
        assert!(KlineEvent::from_json(b"not json").is_err());
    }
}
