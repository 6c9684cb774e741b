use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// How per-rule results combine into one alert decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationPolicy {
    /// Every rule must be satisfied on the same update.
    #[default]
    All,
    /// At least one rule must be satisfied.
    Any,
}

impl AggregationPolicy {
    pub fn triggered(&self, met: &[bool]) -> bool {
        match self {
            Self::All => !met.is_empty() && met.iter().all(|m| *m),
            Self::Any => met.iter().any(|m| *m),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown aggregation policy {0:?} (expected \"all\" or \"any\")")]
pub struct UnknownPolicy(pub String);

impl FromStr for AggregationPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "any" => Ok(Self::Any),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Any => f.write_str("any"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Quote currency a wildcard (`ALL`) selector resolves against.
    pub reference_quote: String,

    /// Bars fetched to seed each window; also the window capacity.
    pub seed_limit: usize,

    /// Alert decision across the rules of one job.
    pub aggregation: AggregationPolicy,

    /// System-wide cap on rule evaluations running at the same time.
    ///
    /// Fan-out per event is one task per rule; this bounds the total across
    /// every job when many instruments update together.
    pub max_inflight_evaluations: usize,

    /// Historical fetches issued in parallel while seeding a wildcard registration.
    pub seed_fetch_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_quote: "USDT".to_string(),
            seed_limit: 100,
            aggregation: AggregationPolicy::All,
            max_inflight_evaluations: 256,
            seed_fetch_concurrency: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_requires_every_rule() {
        let p = AggregationPolicy::All;
        assert!(p.triggered(&[true, true]));
        assert!(!p.triggered(&[true, false]));
        assert!(!p.triggered(&[]));
    }

    #[test]
    fn any_requires_one_rule() {
        let p = AggregationPolicy::Any;
        assert!(p.triggered(&[false, true]));
        assert!(!p.triggered(&[false, false]));
        assert!(!p.triggered(&[]));
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("ALL".parse::<AggregationPolicy>(), Ok(AggregationPolicy::All));
        assert_eq!(" any ".parse::<AggregationPolicy>(), Ok(AggregationPolicy::Any));
        assert!("most".parse::<AggregationPolicy>().is_err());
    }
}
