//! Transport adapters between the outside world and the engine's topics.

pub mod alert_sink;
pub mod control_intake;
pub mod kline_ws;
pub mod streams;

pub use alert_sink::LineAlertSink;
pub use control_intake::run_control_intake;
pub use kline_ws::KlineWsFeed;
pub use streams::{discover_streams, symbols_for_group};
