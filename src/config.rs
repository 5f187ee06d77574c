use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::resample::Timeframe;
use crate::store::tick_buffer::Retention;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const CONFIG_PATH_ENV: &str = "PAIRS_QUANT_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub binance: BinanceConfig,
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
    pub ws_base_url: String,
    pub symbols: Vec<String>,
    #[serde(default = "default_read_timeout")]
    pub read_timeout: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    pub timeframe: String,
    pub window: usize,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    /// Cap on retained ticks; absent means keep the whole session.
    #[serde(default)]
    pub max_ticks: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("exports"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_read_timeout() -> String {
    "30s".to_string()
}

fn default_refresh_interval() -> String {
    "2s".to_string()
}

fn default_alert_threshold() -> f64 {
    2.0
}

/// Parse an interval string (e.g. "500ms", "1s", "1m", "1h", "1d") into milliseconds.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    let s = s.trim();
    let (num_str, unit_ms) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if s.len() < 2 || !s.is_ascii() {
        bail!("invalid interval '{}': expected format like '1m'", s);
    } else {
        let (num_str, suffix) = s.split_at(s.len() - 1);
        let unit_ms = match suffix {
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => bail!(
                "invalid interval '{}': unsupported suffix '{}', expected one of ms/s/m/h/d",
                s,
                suffix
            ),
        };
        (num_str, unit_ms)
    };

    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

impl BinanceConfig {
    /// The configured pair, lowercased and trimmed, in config order.
    pub fn pair(&self) -> Result<[String; 2]> {
        let symbols: Vec<String> = self
            .symbols
            .iter()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        match symbols.as_slice() {
            [a, b] if a != b => Ok([a.clone(), b.clone()]),
            [a, _] => bail!("binance.symbols must name two different symbols, got '{}' twice", a),
            _ => bail!(
                "binance.symbols must contain exactly two symbols, got {}",
                symbols.len()
            ),
        }
    }

    pub fn read_timeout(&self) -> Result<Duration> {
        parse_interval_ms(&self.read_timeout).map(Duration::from_millis)
    }
}

impl AnalyticsConfig {
    pub fn timeframe(&self) -> Result<Timeframe> {
        Ok(self.timeframe.parse::<Timeframe>()?)
    }

    pub fn refresh_interval(&self) -> Result<Duration> {
        parse_interval_ms(&self.refresh_interval).map(Duration::from_millis)
    }

    pub fn retention(&self) -> Retention {
        match self.max_ticks {
            Some(max) => Retention::MaxTicks(max),
            None => Retention::Unbounded,
        }
    }
}

impl Config {
    /// Load from `$PAIRS_QUANT_CONFIG`, falling back to `config/default.toml`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.binance.pair()?;
        self.binance
            .read_timeout()
            .context("binance.read_timeout is invalid")?;
        self.analytics
            .timeframe()
            .context("analytics.timeframe is invalid")?;
        self.analytics
            .refresh_interval()
            .context("analytics.refresh_interval is invalid")?;
        if self.analytics.window < 2 {
            bail!(
                "analytics.window must be at least 2, got {}",
                self.analytics.window
            );
        }
        if !self.analytics.alert_threshold.is_finite() || self.analytics.alert_threshold <= 0.0 {
            bail!(
                "analytics.alert_threshold must be positive, got {}",
                self.analytics.alert_threshold
            );
        }
        if self.analytics.max_ticks == Some(0) {
            bail!("analytics.max_ticks must be > 0 when set");
        }
        Ok(())
    }
}
