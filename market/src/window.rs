use std::collections::VecDeque;

use thiserror::Error;

use crate::types::Bar;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("cannot seed a window from an empty history")]
    EmptySeed,
}

/// Outcome of applying one live bar to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUpdate {
    /// Closed bar: oldest evicted, new bar appended.
    Shifted,
    /// Forming bar: newest slot overwritten in place.
    Replaced,
    /// Same closed bar seen again (at-least-once redelivery); nothing changed.
    Replay,
    /// Older than the newest slot; nothing changed.
    Stale,
}

impl WindowUpdate {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Shifted | Self::Replaced)
    }
}

/// Fixed-capacity, oldest-first history of bars for one instrument.
///
/// Capacity is the seed length and never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    bars: VecDeque<Bar>,
}

impl Window {
    pub fn seeded(history: Vec<Bar>) -> Result<Self, WindowError> {
        if history.is_empty() {
            return Err(WindowError::EmptySeed);
        }
        Ok(Self {
            bars: VecDeque::from(history),
        })
    }

    /// Applies a live bar.
    ///
    /// The close time of a slot doubles as its idempotency key: a bar older
    /// than the newest slot is stale, and a closed bar matching an already
    /// closed newest slot is a replay.
    pub fn apply(&mut self, bar: Bar) -> WindowUpdate {
        let Some(newest) = self.bars.back_mut() else {
            // Seeded windows are never empty.
            return WindowUpdate::Stale;
        };

        if bar.close_time_ms < newest.close_time_ms {
            return WindowUpdate::Stale;
        }
        if newest.closed && bar.close_time_ms == newest.close_time_ms {
            return WindowUpdate::Replay;
        }

        if bar.closed {
            self.bars.pop_front();
            self.bars.push_back(bar);
            WindowUpdate::Shifted
        } else {
            *newest = bar;
            WindowUpdate::Replaced
        }
    }

    /// Chronological closing prices; this is the copy handed to indicator tasks.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn newest(&self) -> Option<&Bar> {
        self.bars.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}
