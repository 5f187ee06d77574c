use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::analytics::{
    adf_test, align, rolling_corr_aligned, spread_from_aligned, zscore, AdfOutcome, AlertState,
    AlignedPoint, HedgeRatio, RollingPoint, SeriesPoint, SpreadSummary, ZScoreAlert,
};
use crate::config::Config;
use crate::model::candle::Candle;
use crate::model::tick::Tick;
use crate::resample::{resample_symbol, Timeframe};
use crate::store::tick_buffer::TickBuffer;

/// Parameters of one analytics refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub symbols: [String; 2],
    pub timeframe: Timeframe,
    pub window: usize,
    pub alert_threshold: f64,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            symbols: config.binance.pair()?,
            timeframe: config.analytics.timeframe()?,
            window: config.analytics.window,
            alert_threshold: config.analytics.alert_threshold,
        })
    }
}

/// Everything the presentation layer reads after one refresh.
#[derive(Debug, Clone)]
pub struct PairReport {
    pub symbols: [String; 2],
    pub timeframe: Timeframe,
    pub window: usize,
    pub series1: Vec<Candle>,
    pub series2: Vec<Candle>,
    pub aligned: Vec<AlignedPoint>,
    pub hedge_ratio: HedgeRatio,
    pub spread: Vec<SeriesPoint>,
    pub zscore: Vec<RollingPoint>,
    pub correlation: Vec<RollingPoint>,
    pub adf: AdfOutcome,
    pub summary: SpreadSummary,
    pub alert: AlertState,
    /// Ticks in the analysed snapshot. Under a retention cap this is less
    /// than [`TickBuffer::total_appended`].
    pub retained_ticks: usize,
    pub generated_at: DateTime<Utc>,
}

impl PairReport {
    /// Both legs have at least one bucket.
    pub fn has_data(&self) -> bool {
        !self.series1.is_empty() && !self.series2.is_empty()
    }
}

/// Snapshot -> resample -> pair analytics, recomputed from scratch each time.
#[derive(Debug, Clone)]
pub struct PairPipeline {
    settings: PipelineSettings,
    alert: ZScoreAlert,
}

impl PairPipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        let alert = ZScoreAlert::new(settings.alert_threshold);
        let symbols = [
            settings.symbols[0].to_ascii_lowercase(),
            settings.symbols[1].to_ascii_lowercase(),
        ];
        Self {
            settings: PipelineSettings { symbols, ..settings },
            alert,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Take one snapshot of `buffer` and run the full analytics pass on it.
    pub fn refresh(&self, buffer: &TickBuffer) -> PairReport {
        let snapshot = buffer.snapshot();
        self.analyze(&snapshot)
    }

    pub fn analyze(&self, snapshot: &[Tick]) -> PairReport {
        let PipelineSettings {
            symbols,
            timeframe,
            window,
            ..
        } = &self.settings;

        let series1 = resample_symbol(snapshot, &symbols[0], *timeframe);
        let series2 = resample_symbol(snapshot, &symbols[1], *timeframe);
        let aligned = align(&series1, &series2);
        let spread_result = spread_from_aligned(&aligned);
        let zscore = zscore(&spread_result.spread, *window);
        let correlation = rolling_corr_aligned(&aligned, *window);
        let spread_values: Vec<f64> = spread_result.spread.iter().map(|p| p.value).collect();
        let adf = adf_test(&spread_values);
        let summary = SpreadSummary::new(&spread_result.spread, &zscore, &correlation);
        let alert = self.alert.evaluate(summary.latest_zscore);

        tracing::debug!(
            ticks = snapshot.len(),
            buckets1 = series1.len(),
            buckets2 = series2.len(),
            aligned = aligned.len(),
            hedge_ratio = ?spread_result.hedge_ratio,
            "Analytics refreshed"
        );

        PairReport {
            symbols: symbols.clone(),
            timeframe: *timeframe,
            window: *window,
            series1,
            series2,
            aligned,
            hedge_ratio: spread_result.hedge_ratio,
            spread: spread_result.spread,
            zscore,
            correlation,
            adf,
            summary,
            alert,
            retained_ticks: snapshot.len(),
            generated_at: Utc::now(),
        }
    }
}
