//! Augmented Dickey-Fuller unit-root test, constant-only regression.
//!
//! The lag order is chosen by AIC over `0..=maxlag` on a common sample, then
//! the chosen model is refit on its own (longer) sample. p-values use the
//! MacKinnon (1994) response surface; critical values use MacKinnon (2010).

use statrs::distribution::{ContinuousCDF, Normal};

use super::ols::{ols, OlsFit};

/// Fewer valid observations than this and the test is not attempted.
pub const ADF_MIN_OBSERVATIONS: usize = 10;

// MacKinnon (1994), one series, constant only.
const TAU_MAX_C: f64 = 2.74;
const TAU_MIN_C: f64 = -18.83;
const TAU_STAR_C: f64 = -1.61;
const TAU_C_SMALLP: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_C_LARGEP: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010), one series, constant only: 1%, 5%, 10%.
const TAU_C_2010: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub n_obs: usize,
    pub critical_values: CriticalValues,
}

impl AdfResult {
    pub fn is_stationary_at(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdfOutcome {
    Computed(AdfResult),
    InsufficientData { required: usize, available: usize },
    Failed(String),
}

impl AdfOutcome {
    pub fn statistic(&self) -> Option<f64> {
        match self {
            Self::Computed(r) => Some(r.statistic),
            _ => None,
        }
    }

    pub fn p_value(&self) -> Option<f64> {
        match self {
            Self::Computed(r) => Some(r.p_value),
            _ => None,
        }
    }

    /// Human-readable reason the test produced no statistic.
    pub fn error(&self) -> Option<String> {
        match self {
            Self::Computed(_) => None,
            Self::InsufficientData { required, available } => Some(format!(
                "Insufficient data points for ADF test (need at least {}, have {})",
                required, available
            )),
            Self::Failed(reason) => Some(format!("ADF test failed: {}", reason)),
        }
    }
}

/// Run the test on `values`, skipping NaN and infinite entries first.
pub fn adf_test(values: &[f64]) -> AdfOutcome {
    let x: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if x.len() < ADF_MIN_OBSERVATIONS {
        return AdfOutcome::InsufficientData {
            required: ADF_MIN_OBSERVATIONS,
            available: x.len(),
        };
    }
    match run(&x) {
        Ok(result) => AdfOutcome::Computed(result),
        Err(reason) => AdfOutcome::Failed(reason),
    }
}

fn run(x: &[f64]) -> Result<AdfResult, String> {
    let nobs = x.len();
    let ntrend = 1;
    let cap = (nobs / 2) as isize - ntrend - 1;
    if cap < 0 {
        return Err("sample size is too short to use selected regression component".to_string());
    }
    let maxlag = default_maxlag(nobs).min(cap as usize);
    let xdiff: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    let best_lag = select_lag_by_aic(x, &xdiff, maxlag)?;
    let fit = fit_lag(x, &xdiff, best_lag, best_lag)?;
    let statistic = fit
        .t_value(0)
        .ok_or_else(|| "lagged level coefficient has no finite t-value".to_string())?;

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic)?,
        used_lag: best_lag,
        n_obs: fit.nobs,
        critical_values: critical_values(fit.nobs),
    })
}

/// Schwert's rule of thumb: `ceil(12 * (n / 100)^(1/4))`.
fn default_maxlag(nobs: usize) -> usize {
    (12.0 * (nobs as f64 / 100.0).powf(0.25)).ceil() as usize
}

fn select_lag_by_aic(x: &[f64], xdiff: &[f64], maxlag: usize) -> Result<usize, String> {
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=maxlag {
        let aic = fit_lag(x, xdiff, lag, maxlag)?.aic();
        if best.map_or(true, |(best_aic, _)| aic < best_aic) {
            best = Some((aic, lag));
        }
    }
    best.map(|(_, lag)| lag)
        .ok_or_else(|| "no lag order could be evaluated".to_string())
}

/// Regress `dx_t` on `[x_{t-1}, dx_{t-1} .. dx_{t-lag}, 1]`, dropping the
/// first `trim` differences so models with different lags share a sample.
fn fit_lag(x: &[f64], xdiff: &[f64], lag: usize, trim: usize) -> Result<OlsFit, String> {
    if trim >= xdiff.len() {
        return Err(format!("lag {} leaves no observations", trim));
    }
    let y: Vec<f64> = xdiff[trim..].to_vec();
    let rows: Vec<Vec<f64>> = (trim..xdiff.len())
        .map(|j| {
            let mut row = Vec::with_capacity(lag + 2);
            row.push(x[j]);
            row.extend((1..=lag).map(|i| xdiff[j - i]));
            row.push(1.0);
            row
        })
        .collect();
    ols(&y, &rows)
}

/// Approximate p-value of an ADF t-statistic (constant, one series).
pub fn mackinnon_p_value(statistic: f64) -> Result<f64, String> {
    if statistic > TAU_MAX_C {
        return Ok(1.0);
    }
    if statistic < TAU_MIN_C {
        return Ok(0.0);
    }
    let z = if statistic <= TAU_STAR_C {
        polyval(&TAU_C_SMALLP, statistic)
    } else {
        polyval(&TAU_C_LARGEP, statistic)
    };
    let normal = Normal::new(0.0, 1.0).map_err(|e| e.to_string())?;
    Ok(normal.cdf(z))
}

/// Finite-sample 1%/5%/10% critical values for `nobs` regression observations.
pub fn critical_values(nobs: usize) -> CriticalValues {
    let inv_n = 1.0 / nobs.max(1) as f64;
    let crit = |c: &[f64; 4]| polyval(c, inv_n);
    CriticalValues {
        one_pct: crit(&TAU_C_2010[0]),
        five_pct: crit(&TAU_C_2010[1]),
        ten_pct: crit(&TAU_C_2010[2]),
    }
}

// Coefficients in ascending power order.
fn polyval(coef: &[f64], x: f64) -> f64 {
    coef.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
