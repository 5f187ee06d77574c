use std::collections::HashMap;

use super::stats;
use crate::model::candle::Candle;

/// One bucket present in both legs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPoint {
    pub timestamp_ms: u64,
    pub price1: f64,
    pub price2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp_ms: u64,
    pub value: f64,
}

/// A rolling statistic; `value` is `None` where it is not defined yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingPoint {
    pub timestamp_ms: u64,
    pub value: Option<f64>,
}

/// Result of the hedge ratio estimate. Replaces a bare `0.0` "not computed"
/// marker so a genuine zero beta stays distinguishable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HedgeRatio {
    Estimated(f64),
    InsufficientData,
    ZeroVariance,
}

impl HedgeRatio {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Estimated(beta) => Some(*beta),
            _ => None,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, Self::Estimated(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadResult {
    pub spread: Vec<SeriesPoint>,
    pub hedge_ratio: HedgeRatio,
}

/// Inner join on exact bucket start. Rows with a non-finite price on either
/// side are dropped. Output follows `series1` order.
pub fn align(series1: &[Candle], series2: &[Candle]) -> Vec<AlignedPoint> {
    let by_time: HashMap<u64, f64> = series2.iter().map(|c| (c.open_time, c.close)).collect();
    series1
        .iter()
        .filter_map(|c| {
            let price2 = *by_time.get(&c.open_time)?;
            (c.close.is_finite() && price2.is_finite()).then_some(AlignedPoint {
                timestamp_ms: c.open_time,
                price1: c.close,
                price2,
            })
        })
        .collect()
}

/// beta = Cov(p1, p2) / Var(p1), both population moments over the full sample.
pub fn hedge_ratio(p1: &[f64], p2: &[f64]) -> HedgeRatio {
    let n = p1.len().min(p2.len());
    if n < 2 {
        return HedgeRatio::InsufficientData;
    }
    let (p1, p2) = (&p1[..n], &p2[..n]);
    match stats::population_variance(p1) {
        Some(var) if var > 0.0 => match stats::population_covariance(p1, p2) {
            Some(cov) if (cov / var).is_finite() => HedgeRatio::Estimated(cov / var),
            _ => HedgeRatio::ZeroVariance,
        },
        _ => HedgeRatio::ZeroVariance,
    }
}

/// Align both legs and derive `price2 - beta * price1` for every shared bucket.
pub fn compute_spread(series1: &[Candle], series2: &[Candle]) -> SpreadResult {
    spread_from_aligned(&align(series1, series2))
}

/// Spread over an already aligned sample. Beta is estimated once for the
/// whole window; the spread is empty unless it could be estimated.
pub fn spread_from_aligned(aligned: &[AlignedPoint]) -> SpreadResult {
    let (p1, p2) = split_legs(aligned);
    let hedge_ratio = hedge_ratio(&p1, &p2);
    let spread = match hedge_ratio {
        HedgeRatio::Estimated(beta) => aligned
            .iter()
            .map(|p| SeriesPoint {
                timestamp_ms: p.timestamp_ms,
                value: p.price2 - beta * p.price1,
            })
            .collect(),
        _ => Vec::new(),
    };
    SpreadResult {
        spread,
        hedge_ratio,
    }
}

/// Rolling z-score: `(x_i - mean) / std` over the trailing `window` values,
/// using the sample (n - 1) standard deviation.
pub fn zscore(series: &[SeriesPoint], window: usize) -> Vec<RollingPoint> {
    let values: Vec<f64> = series.iter().map(|p| p.value).collect();
    series
        .iter()
        .zip(zscore_values(&values, window))
        .map(|(p, value)| RollingPoint {
            timestamp_ms: p.timestamp_ms,
            value,
        })
        .collect()
}

pub fn zscore_values(values: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = stats::mean(slice)?;
            let sd = stats::sample_std_dev(slice)?;
            if sd <= 0.0 {
                return None;
            }
            let z = (values[i] - mean) / sd;
            z.is_finite().then_some(z)
        })
        .collect()
}

/// Rolling Pearson correlation of the two legs over the aligned sample.
/// Empty when fewer than `window` buckets are aligned.
pub fn rolling_corr(series1: &[Candle], series2: &[Candle], window: usize) -> Vec<RollingPoint> {
    rolling_corr_aligned(&align(series1, series2), window)
}

pub fn rolling_corr_aligned(aligned: &[AlignedPoint], window: usize) -> Vec<RollingPoint> {
    if aligned.len() < window {
        return Vec::new();
    }
    let (p1, p2) = split_legs(aligned);
    aligned
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let value = if window == 0 || i + 1 < window {
                None
            } else {
                let start = i + 1 - window;
                stats::pearson(&p1[start..=i], &p2[start..=i])
            };
            RollingPoint {
                timestamp_ms: p.timestamp_ms,
                value,
            }
        })
        .collect()
}

fn split_legs(aligned: &[AlignedPoint]) -> (Vec<f64>, Vec<f64>) {
    aligned.iter().map(|p| (p.price1, p.price2)).unzip()
}
