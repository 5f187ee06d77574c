pub mod adf;
pub mod ols;
pub mod pair;
pub mod stats;
pub mod summary;

pub use adf::{adf_test, AdfOutcome, AdfResult, CriticalValues, ADF_MIN_OBSERVATIONS};
pub use pair::{
    align, compute_spread, hedge_ratio, rolling_corr, rolling_corr_aligned, spread_from_aligned,
    zscore, AlignedPoint, HedgeRatio, RollingPoint, SeriesPoint, SpreadResult,
};
pub use summary::{AlertState, SpreadSummary, ZScoreAlert};
