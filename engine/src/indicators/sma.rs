use super::Indicator;

/// Simple mean of the last `period` closes.
#[derive(Debug, Clone, Copy)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Sma {
    fn compute(&self, closes: &[f64]) -> f64 {
        let p = self.period;
        if p == 0 || closes.len() < p {
            return 0.0;
        }
        closes[closes.len() - p..].iter().sum::<f64>() / p as f64
    }
}
