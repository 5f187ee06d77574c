use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::model::candle::{bucket_start, Candle, CandleBuilder};
use crate::model::tick::Tick;

/// Resampling bucket width. A custom width can only be built through
/// [`Timeframe::custom`] or from a `NonZeroU64`, so it is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    OneSecond,
    OneMinute,
    FiveMinutes,
    Custom(NonZeroU64),
}

impl Timeframe {
    pub fn custom(width: Duration) -> Result<Self, AppError> {
        u64::try_from(width.as_millis())
            .ok()
            .and_then(NonZeroU64::new)
            .map(Self::Custom)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "invalid bucket width {:?}: must be at least 1 ms",
                    width
                ))
            })
    }

    pub fn as_millis(&self) -> u64 {
        match self {
            Self::OneSecond => 1_000,
            Self::OneMinute => 60_000,
            Self::FiveMinutes => 300_000,
            Self::Custom(ms) => ms.get(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::OneSecond => "1s".to_string(),
            Self::OneMinute => "1m".to_string(),
            Self::FiveMinutes => "5m".to_string(),
            Self::Custom(ms) => format!("{}ms", ms),
        }
    }
}

impl FromStr for Timeframe {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1s" => Ok(Self::OneSecond),
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            other => Err(AppError::Config(format!(
                "unsupported timeframe '{}', expected one of 1s/1m/5m",
                other
            ))),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Aggregate ticks into fixed-width candles.
///
/// Ticks are folded in slice (arrival) order, so the last tick to arrive in
/// a bucket sets its close even if timestamps interleave. Buckets without
/// ticks are omitted and the output is strictly increasing by `open_time`.
pub fn resample(ticks: &[Tick], timeframe: Timeframe) -> Vec<Candle> {
    let interval_ms = timeframe.as_millis();
    let mut buckets: BTreeMap<u64, CandleBuilder> = BTreeMap::new();
    for tick in ticks {
        buckets
            .entry(bucket_start(tick.timestamp_ms, interval_ms))
            .and_modify(|cb| cb.update(tick.price, tick.qty))
            .or_insert_with(|| CandleBuilder::new(tick.price, tick.qty, tick.timestamp_ms, interval_ms));
    }
    buckets.values().map(CandleBuilder::finish).collect()
}

/// Resample only the ticks for `symbol` out of a mixed snapshot.
pub fn resample_symbol(snapshot: &[Tick], symbol: &str, timeframe: Timeframe) -> Vec<Candle> {
    let symbol = symbol.to_ascii_lowercase();
    let ticks: Vec<Tick> = snapshot
        .iter()
        .filter(|t| t.symbol == symbol)
        .cloned()
        .collect();
    resample(&ticks, timeframe)
}
