use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown kline interval: {0:?}")]
pub struct UnknownInterval(pub String);

/// Kline interval as spelled by the exchange (`1m`, `4h`, `1M`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
    D3,
    W1,
    Mo1,
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

const TABLE: [(Interval, &str, u64); 15] = [
    (Interval::M1, "1m", MINUTE),
    (Interval::M3, "3m", 3 * MINUTE),
    (Interval::M5, "5m", 5 * MINUTE),
    (Interval::M15, "15m", 15 * MINUTE),
    (Interval::M30, "30m", 30 * MINUTE),
    (Interval::H1, "1h", HOUR),
    (Interval::H2, "2h", 2 * HOUR),
    (Interval::H4, "4h", 4 * HOUR),
    (Interval::H6, "6h", 6 * HOUR),
    (Interval::H8, "8h", 8 * HOUR),
    (Interval::H12, "12h", 12 * HOUR),
    (Interval::D1, "1d", DAY),
    (Interval::D3, "3d", 3 * DAY),
    (Interval::W1, "1w", 7 * DAY),
    // Calendar months vary; the exchange treats 1M as 30 days for bucketing purposes.
    (Interval::Mo1, "1M", 30 * DAY),
];

impl Interval {
    pub fn as_str(&self) -> &'static str {
        self.entry().1
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.entry().2)
    }

    fn entry(&self) -> &'static (Interval, &'static str, u64) {
        // Every variant has exactly one row.
        let idx = TABLE.iter().position(|(i, _, _)| i == self).unwrap_or(0);
        &TABLE[idx]
    }
}

impl FromStr for Interval {
    type Err = UnknownInterval;

    /// Case-sensitive: `1m` is one minute, `1M` is one month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TABLE
            .iter()
            .find(|(_, name, _)| *name == s)
            .map(|(i, _, _)| *i)
            .ok_or_else(|| UnknownInterval(s.to_string()))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_exchange_spelling() {
        for (interval, name, _) in TABLE.iter() {
            assert_eq!(name.parse::<Interval>().unwrap(), *interval);
            assert_eq!(interval.as_str(), *name);
        }
    }

    #[test]
    fn minute_and_month_are_distinct() {
        assert_eq!("1m".parse::<Interval>().unwrap().duration().as_secs(), 60);
        assert_eq!(
            "1M".parse::<Interval>().unwrap().duration().as_secs(),
            30 * 24 * 3600
        );
    }

    #[test]
    fn rejects_unknown_spelling() {
        let err = "7m".parse::<Interval>().unwrap_err();
        assert_eq!(err, UnknownInterval("7m".into()));
        assert!("".parse::<Interval>().is_err());
    }
}
