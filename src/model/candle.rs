/// One resampled bucket. `close` is the last traded price in arrival order,
/// `qty` the summed traded quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub qty: f64,
    pub trades: u64,
    pub open_time: u64,
    pub close_time: u64,
}

impl Candle {
    /// Last observed price in the bucket.
    pub fn price(&self) -> f64 {
        self.close
    }
}

/// Aggregates trade ticks into a single candle over a time interval.
#[derive(Debug, Clone)]
pub struct CandleBuilder {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    qty: f64,
    trades: u64,
    open_time: u64,
    close_time: u64,
}

impl CandleBuilder {
    /// Start a new candle. The bucket is aligned to the interval.
    pub fn new(price: f64, qty: f64, timestamp_ms: u64, interval_ms: u64) -> Self {
        assert!(interval_ms > 0, "interval_ms must be > 0");
        let open_time = bucket_start(timestamp_ms, interval_ms);
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
            qty,
            trades: 1,
            open_time,
            close_time: open_time.saturating_add(interval_ms),
        }
    }

    /// Fold the next trade (in arrival order) into the candle.
    pub fn update(&mut self, price: f64, qty: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.qty += qty;
        self.trades += 1;
    }

    /// Check if a timestamp belongs to this candle's time bucket.
    pub fn contains(&self, timestamp_ms: u64) -> bool {
        timestamp_ms >= self.open_time && timestamp_ms < self.close_time
    }

    pub fn open_time(&self) -> u64 {
        self.open_time
    }

    /// Finalize into an immutable Candle.
    pub fn finish(&self) -> Candle {
        Candle {
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            qty: self.qty,
            trades: self.trades,
            open_time: self.open_time,
            close_time: self.close_time,
        }
    }
}

/// Start of the half-open bucket `[t, t + interval)` holding `timestamp_ms`.
/// A zero interval leaves the timestamp unchanged.
pub fn bucket_start(timestamp_ms: u64, interval_ms: u64) -> u64 {
    timestamp_ms - timestamp_ms.checked_rem(interval_ms).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_builder_basics() {
        let mut cb = CandleBuilder::new(100.0, 1.0, 60_500, 60_000);
        assert_eq!(cb.open_time(), 60_000);
        assert!(cb.contains(60_500));
        assert!(cb.contains(119_999));
        assert!(!cb.contains(120_000));

        cb.update(105.0, 0.5);
        cb.update(95.0, 0.25);
        cb.update(102.0, 0.25);

        let candle = cb.finish();
        assert_eq!(candle.close_time, 120_000);
        assert!((candle.open - 100.0).abs() < f64::EPSILON);
        assert!((candle.high - 105.0).abs() < f64::EPSILON);
        assert!((candle.low - 95.0).abs() < f64::EPSILON);
        assert!((candle.price() - 102.0).abs() < f64::EPSILON);
        assert!((candle.qty - 2.0).abs() < f64::EPSILON);
        assert_eq!(candle.trades, 4);
    }

    #[test]
    fn bucket_start_aligns_down() {
        assert_eq!(bucket_start(1_999, 1_000), 1_000);
        assert_eq!(bucket_start(2_000, 1_000), 2_000);
        assert_eq!(bucket_start(299_999, 300_000), 0);
        assert_eq!(bucket_start(1_234, 0), 1_234);
    }

    #[test]
    #[should_panic(expected = "interval_ms must be > 0")]
    fn candle_builder_rejects_zero_interval() {
        let _ = CandleBuilder::new(100.0, 1.0, 60_500, 0);
    }
}
