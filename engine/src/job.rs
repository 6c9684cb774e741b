use std::collections::HashMap;
use std::sync::Arc;

use market::{Interval, Window};

use crate::rule::IndicatorRule;

/// An active monitoring configuration for one registry key.
///
/// `generation` is unique per installed job and scopes crossing state, so a
/// replacement under the same key starts from a clean slate.
#[derive(Debug, Clone)]
pub struct Job {
    pub generation: u64,
    pub interval: Interval,
    pub exchange: String,
    pub symbols: Vec<String>,
    pub rules: Arc<[IndicatorRule]>,
    /// Instruments whose seed fetch failed have no entry; their events are ignored.
    pub windows: HashMap<String, Window>,
}

impl Job {
    pub fn window(&self, symbol: &str) -> Option<&Window> {
        self.windows.get(symbol)
    }
}
