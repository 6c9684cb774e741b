use super::Indicator;

/// Relative Strength Index with Wilder smoothing.
///
/// The first average gain/loss is the simple mean of the first `period`
/// changes; later changes are smoothed with factor `1/period`.
#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for Rsi {
    fn compute(&self, closes: &[f64]) -> f64 {
        let p = self.period;
        if p == 0 || closes.len() <= p {
            return 0.0;
        }
        let pf = p as f64;

        let (mut avg_gain, mut avg_loss) = closes[..=p]
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold((0.0, 0.0), |(g, l), d| {
                if d > 0.0 { (g + d, l) } else { (g, l - d) }
            });
        avg_gain /= pf;
        avg_loss /= pf;

        for w in closes[p..].windows(2) {
            let d = w[1] - w[0];
            avg_gain = (avg_gain * (pf - 1.0) + d.max(0.0)) / pf;
            avg_loss = (avg_loss * (pf - 1.0) + (-d).max(0.0)) / pf;
        }

        let total = avg_gain + avg_loss;
        if total == 0.0 {
            0.0
        } else {
            100.0 * avg_gain / total
        }
    }
}
