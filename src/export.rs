use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::AppError;
use crate::model::candle::Candle;
use crate::pipeline::PairReport;

pub const NOT_AVAILABLE: &str = "N/A";

/// One row of the resampled export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampledRow {
    pub timestamp_ms: u64,
    pub price1: f64,
    pub price2: f64,
    pub spread: Option<f64>,
    pub zscore: Option<f64>,
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResampledExport {
    pub symbols: [String; 2],
    pub rows: Vec<ResampledRow>,
}

/// Join the aligned buckets with the derived series, one row per bucket.
pub fn resampled_rows(report: &PairReport) -> Vec<ResampledRow> {
    let spread: HashMap<u64, f64> = report
        .spread
        .iter()
        .map(|p| (p.timestamp_ms, p.value))
        .collect();
    let zscore: HashMap<u64, Option<f64>> = report
        .zscore
        .iter()
        .map(|p| (p.timestamp_ms, p.value))
        .collect();
    let correlation: HashMap<u64, Option<f64>> = report
        .correlation
        .iter()
        .map(|p| (p.timestamp_ms, p.value))
        .collect();

    report
        .aligned
        .iter()
        .map(|p| ResampledRow {
            timestamp_ms: p.timestamp_ms,
            price1: p.price1,
            price2: p.price2,
            spread: spread.get(&p.timestamp_ms).copied(),
            zscore: zscore.get(&p.timestamp_ms).copied().flatten(),
            correlation: correlation.get(&p.timestamp_ms).copied().flatten(),
        })
        .collect()
}

/// `timestamp,{sym1}_price,{sym2}_price,spread,z_score,correlation`; undefined
/// cells are left empty.
pub fn write_resampled_csv<W: Write>(report: &PairReport, mut out: W) -> Result<(), AppError> {
    writeln!(
        out,
        "timestamp,{}_price,{}_price,spread,z_score,correlation",
        report.symbols[0], report.symbols[1]
    )?;
    for row in resampled_rows(report) {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            format_timestamp(row.timestamp_ms),
            row.price1,
            row.price2,
            optional_cell(row.spread, ""),
            optional_cell(row.zscore, ""),
            optional_cell(row.correlation, ""),
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Read back a file produced by [`write_resampled_csv`]. Rows that do not
/// parse are skipped.
pub fn parse_resampled_csv<R: BufRead>(input: R) -> Result<ResampledExport, AppError> {
    let mut lines = input.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(AppError::InvalidUpload("empty resampled CSV".to_string())),
    };
    let columns = split_row(&header);
    let symbols = match columns.as_slice() {
        [ts, p1, p2, spread, z, corr]
            if ts == "timestamp" && spread == "spread" && z == "z_score" && corr == "correlation" =>
        {
            match (p1.strip_suffix("_price"), p2.strip_suffix("_price")) {
                (Some(s1), Some(s2)) => [s1.to_string(), s2.to_string()],
                _ => {
                    return Err(AppError::InvalidUpload(format!(
                        "unexpected price columns in header '{}'",
                        header
                    )))
                }
            }
        }
        _ => {
            return Err(AppError::InvalidUpload(format!(
                "unexpected resampled CSV header '{}'",
                header
            )))
        }
    };

    let mut rows = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_resampled_row(&split_row(&line)) {
            Some(row) => rows.push(row),
            None => tracing::debug!(line = %line, "Skipping unparsable resampled row"),
        }
    }
    Ok(ResampledExport { symbols, rows })
}

fn parse_resampled_row(cells: &[String]) -> Option<ResampledRow> {
    let [ts, p1, p2, spread, z, corr] = cells else {
        return None;
    };
    Some(ResampledRow {
        timestamp_ms: parse_timestamp(ts)?,
        price1: parse_finite(p1)?,
        price2: parse_finite(p2)?,
        spread: parse_optional(spread)?,
        zscore: parse_optional(z)?,
        correlation: parse_optional(corr)?,
    })
}

/// `metric,value` rows for the scalar panel, `N/A` where undefined.
pub fn write_analytics_csv<W: Write>(report: &PairReport, mut out: W) -> Result<(), AppError> {
    let metrics: [(&str, Option<f64>); 7] = [
        ("Hedge Ratio (β)", report.hedge_ratio.value()),
        ("Latest Z-score", report.summary.latest_zscore),
        ("Latest Correlation", report.summary.latest_correlation),
        ("Spread Mean", report.summary.mean),
        ("Spread Std Dev", report.summary.std_dev),
        ("ADF Statistic", report.adf.statistic()),
        ("ADF p-value", report.adf.p_value()),
    ];
    writeln!(out, "metric,value")?;
    for (name, value) in metrics {
        writeln!(out, "{},{}", name, optional_cell(value, NOT_AVAILABLE))?;
    }
    out.flush()?;
    Ok(())
}

/// Import a historical OHLC file with at least `timestamp,open,high,low,close`
/// columns (any order, optional `volume`). Rows that fail to parse are dropped.
pub fn parse_ohlc_csv<R: BufRead>(input: R) -> Result<Vec<Candle>, AppError> {
    let mut lines = input.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(AppError::InvalidUpload("empty OHLC file".to_string())),
    };
    let columns: Vec<String> = split_row(&header)
        .into_iter()
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let position = |name: &str| columns.iter().position(|c| c == name);
    let (Some(timestamp), Some(open), Some(high), Some(low), Some(close)) = (
        position("timestamp"),
        position("open"),
        position("high"),
        position("low"),
        position("close"),
    ) else {
        return Err(AppError::InvalidUpload(
            "CSV must contain: timestamp, open, high, low, close".to_string(),
        ));
    };
    let layout = OhlcColumns {
        timestamp,
        open,
        high,
        low,
        close,
        volume: position("volume"),
    };

    let mut candles = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let cells = split_row(&line);
        if cells.len() != columns.len() {
            dropped += 1;
            continue;
        }
        match parse_ohlc_row(&cells, &layout) {
            Some(candle) => candles.push(candle),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, kept = candles.len(), "Dropped malformed OHLC rows");
    }
    Ok(candles)
}

struct OhlcColumns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

// Imported bars carry no bucket width, so close_time mirrors open_time.
fn parse_ohlc_row(cells: &[String], layout: &OhlcColumns) -> Option<Candle> {
    let cell = |i: usize| cells.get(i).map(String::as_str);
    let open_time = parse_timestamp(cell(layout.timestamp)?)?;
    let qty = match layout.volume {
        Some(i) => parse_finite(cell(i)?)?,
        None => 0.0,
    };
    Some(Candle {
        open: parse_finite(cell(layout.open)?)?,
        high: parse_finite(cell(layout.high)?)?,
        low: parse_finite(cell(layout.low)?)?,
        close: parse_finite(cell(layout.close)?)?,
        qty,
        trades: 0,
        open_time,
        close_time: open_time,
    })
}

/// `{prefix}_{YYYYmmdd_HHMMSS}.csv`
pub fn export_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.csv", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Write both exports for `report` into `dir`, returning their paths.
pub fn write_report_files(report: &PairReport, dir: &Path) -> Result<(PathBuf, PathBuf), AppError> {
    std::fs::create_dir_all(dir)?;
    let resampled_path = dir.join(export_file_name("resampled_data", report.generated_at));
    let analytics_path = dir.join(export_file_name("analytics", report.generated_at));
    write_resampled_csv(report, BufWriter::new(File::create(&resampled_path)?))?;
    write_analytics_csv(report, BufWriter::new(File::create(&analytics_path)?))?;
    Ok((resampled_path, analytics_path))
}

pub fn format_timestamp(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| timestamp_ms.to_string())
}

/// RFC 3339, `YYYY-mm-dd HH:MM:SS[.fff]` (UTC) or integer epoch milliseconds.
pub fn parse_timestamp(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Some(ms);
    }
    let millis = DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .map(|dt| dt.and_utc().timestamp_millis())
        })
        .ok()?;
    u64::try_from(millis).ok()
}

fn optional_cell(value: Option<f64>, missing: &str) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => missing.to_string(),
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// Outer None: malformed cell. Inner None: empty or N/A cell.
fn parse_optional(s: &str) -> Option<Option<f64>> {
    let s = s.trim();
    if s.is_empty() || s == NOT_AVAILABLE {
        return Some(None);
    }
    parse_finite(s).map(Some)
}

// Splits one CSV record, honouring double-quoted fields (`""` escapes a
// quote). Cells are trimmed.
fn split_row(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_formats() {
        assert_eq!(format_timestamp(1_700_000_000_123), "2023-11-14T22:13:20.123Z");
        assert_eq!(parse_timestamp("2023-11-14T22:13:20.123Z"), Some(1_700_000_000_123));
        assert_eq!(parse_timestamp("2023-11-14 22:13:20"), Some(1_700_000_000_000));
        assert_eq!(parse_timestamp("1700000000123"), Some(1_700_000_000_123));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn optional_cells() {
        assert_eq!(parse_optional(""), Some(None));
        assert_eq!(parse_optional("N/A"), Some(None));
        assert_eq!(parse_optional("1.5"), Some(Some(1.5)));
        assert_eq!(parse_optional("abc"), None);
        assert_eq!(optional_cell(Some(f64::NAN), NOT_AVAILABLE), "N/A");
    }

    #[test]
    fn split_row_handles_quotes() {
        assert_eq!(split_row("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(split_row(r#""1,250",x"#), vec!["1,250", "x"]);
        assert_eq!(split_row(r#""say ""hi""",2"#), vec![r#"say "hi""#, "2"]);
        assert_eq!(split_row(""), vec![""]);
    }

    #[test]
    fn file_name_format() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(export_file_name("analytics", now), "analytics_20231114_221320.csv");
    }
}
