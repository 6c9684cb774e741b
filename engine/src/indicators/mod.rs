//! Indicator function library.
//!
//! An indicator maps a chronological closing-price series to its most recent
//! value, or `0.0` when the series is too short. Each indicator is registered
//! under a case-insensitive name together with a builder that validates the
//! request's parameter mapping up front, so a misconfigured rule is rejected
//! at registration instead of silently evaluating to zero.

pub mod ema;
pub mod rsi;
pub mod sma;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use ema::Ema;
pub use rsi::Rsi;
pub use sma::Sma;

/// Raw `parameters` object from a registration request.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("unknown indicator {0:?}")]
    Unknown(String),

    #[error("missing parameter {0:?}")]
    MissingParameter(&'static str),

    #[error("parameter {name:?} must be {expected}, got {got}")]
    InvalidParameter {
        name: &'static str,
        expected: &'static str,
        got: String,
    },
}

pub trait Indicator: Send + Sync + fmt::Debug {
    fn compute(&self, closes: &[f64]) -> f64;
}

/// Validates parameters and produces a ready-to-run indicator.
pub type IndicatorBuilder =
    Arc<dyn Fn(&Parameters) -> Result<Arc<dyn Indicator>, IndicatorError> + Send + Sync>;

pub struct IndicatorLibrary {
    builders: HashMap<String, IndicatorBuilder>,
}

impl IndicatorLibrary {
    /// A library with no indicators at all.
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Registers `name`; a later registration under the same name wins.
    pub fn register<F>(&mut self, name: &str, builder: F)
    where
        F: Fn(&Parameters) -> Result<Arc<dyn Indicator>, IndicatorError> + Send + Sync + 'static,
    {
        self.builders
            .insert(name.to_ascii_uppercase(), Arc::new(builder));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(&name.to_ascii_uppercase())
    }

    pub fn build(
        &self,
        name: &str,
        params: &Parameters,
    ) -> Result<Arc<dyn Indicator>, IndicatorError> {
        let builder = self
            .builders
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| IndicatorError::Unknown(name.to_string()))?;
        builder(params)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builders.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for IndicatorLibrary {
    fn default() -> Self {
        let mut lib = Self::empty();
        lib.register("RSI", |p| Ok(Arc::new(Rsi::new(period(p)?))));
        lib.register("EMA", |p| Ok(Arc::new(Ema::new(period(p)?))));
        lib.register("SMA", |p| Ok(Arc::new(Sma::new(period(p)?))));
        lib
    }
}

/// Reads the lookback `period`: a positive whole number (`14` or `14.0`).
pub fn period(params: &Parameters) -> Result<usize, IndicatorError> {
    let raw = params
        .get("period")
        .ok_or(IndicatorError::MissingParameter("period"))?;

    let invalid = || IndicatorError::InvalidParameter {
        name: "period",
        expected: "a positive integer",
        got: raw.to_string(),
    };

    let v = raw.as_f64().ok_or_else(invalid)?;
    if v < 1.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        return Err(invalid());
    }
    Ok(v as usize)
}
