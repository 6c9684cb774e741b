//! Market data model for the alert engine.
//!
//! Bars, per-instrument sliding windows, the exchange's kline event envelope,
//! and the exchange client used to seed windows and resolve wildcard selectors.

pub mod exchange;
pub mod interval;
pub mod types;
pub mod window;

pub use exchange::{ExchangeApi, ExchangeError, SymbolInfo};
pub use interval::{Interval, UnknownInterval};
pub use types::{Bar, KlineEvent, job_key};
pub use window::{Window, WindowError, WindowUpdate};
