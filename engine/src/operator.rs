//! Threshold and crossing comparisons between consecutive indicator values.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    GreaterThan,
    LessThan,
    Crossing,
    CrossingUp,
    CrossingDown,
}

impl Operator {
    /// `value` is the freshly computed indicator, `previous` the one before it.
    pub fn holds(&self, value: f64, threshold: f64, previous: f64) -> bool {
        let up = previous < threshold && value >= threshold;
        let down = previous > threshold && value <= threshold;

        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::Crossing => up || down,
            Self::CrossingUp => up,
            Self::CrossingDown => down,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterThan => "GREATER THAN",
            Self::LessThan => "LESS THAN",
            Self::Crossing => "CROSSING",
            Self::CrossingUp => "CROSSING UP",
            Self::CrossingDown => "CROSSING DOWN",
        }
    }
}

impl FromStr for Operator {
    type Err = EvalError;

    /// Case-insensitive; words are separated by single spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GREATER THAN" => Ok(Self::GreaterThan),
            "LESS THAN" => Ok(Self::LessThan),
            "CROSSING" => Ok(Self::Crossing),
            "CROSSING UP" => Ok(Self::CrossingUp),
            "CROSSING DOWN" => Ok(Self::CrossingDown),
            _ => Err(EvalError::UnknownOperator(s.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies the operator named by `operator` to (value, threshold, previous).
pub fn evaluate(
    operator: &str,
    value: f64,
    threshold: f64,
    previous: f64,
) -> Result<bool, EvalError> {
    Ok(operator.parse::<Operator>()?.holds(value, threshold, previous))
}
