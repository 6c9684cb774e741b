use thiserror::Error;

use market::{ExchangeError, UnknownInterval};

use crate::indicators::IndicatorError;

/// Reasons a registration request is dropped without touching the registry.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("malformed control payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("empty instrument selector")]
    EmptySelector,

    #[error(transparent)]
    InvalidInterval(#[from] UnknownInterval),

    #[error("registration carries no indicator rules")]
    NoRules,

    #[error("rule #{index} ({indicator}) is invalid: {source}")]
    InvalidRule {
        index: usize,
        indicator: String,
        #[source]
        source: IndicatorError,
    },

    #[error("instrument metadata query failed: {0}")]
    Metadata(#[source] ExchangeError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("topic {0} is closed")]
    Closed(String),

    #[error("transport error: {0}")]
    Transport(String),
}
