use super::pair::{RollingPoint, SeriesPoint};
use super::stats;

/// Scalar metrics for the numerical panel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpreadSummary {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub latest_zscore: Option<f64>,
    pub latest_correlation: Option<f64>,
}

impl SpreadSummary {
    pub fn new(spread: &[SeriesPoint], zscore: &[RollingPoint], correlation: &[RollingPoint]) -> Self {
        let values: Vec<f64> = spread.iter().map(|p| p.value).collect();
        Self {
            mean: stats::mean(&values),
            std_dev: stats::sample_std_dev(&values),
            latest_zscore: latest(zscore),
            latest_correlation: latest(correlation),
        }
    }
}

/// Value of the most recent point, `None` if that point is undefined.
pub fn latest(series: &[RollingPoint]) -> Option<f64> {
    series.last().and_then(|p| p.value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertState {
    /// No z-score available yet.
    Waiting,
    Normal { zscore: f64 },
    Triggered { zscore: f64 },
}

/// Fires when the latest z-score leaves `[-threshold, threshold]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreAlert {
    pub threshold: f64,
}

impl ZScoreAlert {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.abs(),
        }
    }

    pub fn evaluate(&self, latest_zscore: Option<f64>) -> AlertState {
        match latest_zscore {
            None => AlertState::Waiting,
            Some(z) if z.abs() > self.threshold => AlertState::Triggered { zscore: z },
            Some(z) => AlertState::Normal { zscore: z },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rp(value: Option<f64>) -> RollingPoint {
        RollingPoint {
            timestamp_ms: 0,
            value,
        }
    }

    #[test]
    fn alert_states() {
        let alert = ZScoreAlert::new(2.0);
        assert_eq!(alert.evaluate(None), AlertState::Waiting);
        assert_eq!(alert.evaluate(Some(1.5)), AlertState::Normal { zscore: 1.5 });
        assert_eq!(alert.evaluate(Some(2.0)), AlertState::Normal { zscore: 2.0 });
        assert_eq!(alert.evaluate(Some(-2.5)), AlertState::Triggered { zscore: -2.5 });
    }

    #[test]
    fn summary_uses_last_point_only() {
        let spread = vec![
            SeriesPoint { timestamp_ms: 0, value: 1.0 },
            SeriesPoint { timestamp_ms: 1, value: 3.0 },
        ];
        let z = vec![rp(Some(0.7)), rp(None)];
        let corr = vec![rp(None), rp(Some(0.9))];
        let summary = SpreadSummary::new(&spread, &z, &corr);
        assert_eq!(summary.mean, Some(2.0));
        assert!((summary.std_dev.unwrap() - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(summary.latest_zscore, None);
        assert_eq!(summary.latest_correlation, Some(0.9));
    }

    #[test]
    fn empty_summary() {
        assert_eq!(SpreadSummary::new(&[], &[], &[]), SpreadSummary::default());
    }
}
