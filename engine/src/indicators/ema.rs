use super::Indicator;

/// Exponential moving average seeded with the simple mean of the first
/// `period` closes, smoothing factor `2 / (period + 1)`.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Ema {
    fn compute(&self, closes: &[f64]) -> f64 {
        let p = self.period;
        if p == 0 || closes.len() < p {
            return 0.0;
        }

        let k = 2.0 / (p as f64 + 1.0);
        let seed = closes[..p].iter().sum::<f64>() / p as f64;

        closes[p..]
            .iter()
            .fold(seed, |prev, c| c * k + prev * (1.0 - k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_short_is_zero() {
        assert_eq!(Ema::new(5).compute(&[1.0, 2.0, 3.0, 4.0]), 0.0);
    }

    #[test]
    fn exact_period_is_simple_mean() {
        assert_eq!(Ema::new(4).compute(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn smoothing_step() {
        // seed = 2.0, k = 2/4 = 0.5 -> 0.5 * 6 + 0.5 * 2 = 4
        assert_eq!(Ema::new(3).compute(&[1.0, 2.0, 3.0, 6.0]), 4.0);
    }

    #[test]
    fn constant_series_is_constant() {
        assert_eq!(Ema::new(10).compute(&[42.0; 50]), 42.0);
    }
}
