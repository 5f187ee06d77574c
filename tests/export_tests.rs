use std::io::Cursor;

use pairs_quant::export::{
    parse_ohlc_csv, parse_resampled_csv, resampled_rows, write_analytics_csv,
    write_report_files, write_resampled_csv,
};
use pairs_quant::model::tick::Tick;
use pairs_quant::pipeline::{PairPipeline, PairReport, PipelineSettings};
use pairs_quant::resample::Timeframe;

const T0: u64 = 1_700_000_000_000;

fn report(seconds: u64, window: usize) -> PairReport {
    let mut ticks = Vec::new();
    for s in 0..seconds {
        let ts = T0 + s * 1_000;
        let p1 = 100.0 + (s as f64 * 0.4).sin() * 2.0 + s as f64 * 0.03;
        let p2 = 1.5 * p1 + (s as f64 * 1.3).cos();
        ticks.push(Tick::new("btcusdt", p1, 1.0, ts).unwrap());
        ticks.push(Tick::new("ethusdt", p2, 2.0, ts + 10).unwrap());
    }
    PairPipeline::new(PipelineSettings {
        symbols: ["btcusdt".to_string(), "ethusdt".to_string()],
        timeframe: Timeframe::OneSecond,
        window,
        alert_threshold: 2.0,
    })
    .analyze(&ticks)
}

fn close(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => (x - y).abs() <= 1e-12 * y.abs().max(1.0),
        _ => false,
    }
}

#[test]
/// Verifies that the resampled export re-parses into the same tuples.
fn resampled_csv_round_trip() {
    let report = report(40, 10);
    let mut buf = Vec::new();
    write_resampled_csv(&report, &mut buf).unwrap();

    let text = String::from_utf8(buf.clone()).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "timestamp,btcusdt_price,ethusdt_price,spread,z_score,correlation"
    );
    assert!(lines.next().unwrap().starts_with("2023-11-14T22:13:20.000Z,"));

    let parsed = parse_resampled_csv(Cursor::new(buf)).unwrap();
    assert_eq!(parsed.symbols, ["btcusdt".to_string(), "ethusdt".to_string()]);

    let expected = resampled_rows(&report);
    assert_eq!(parsed.rows.len(), 40);
    assert_eq!(parsed.rows.len(), expected.len());
    for (got, want) in parsed.rows.iter().zip(&expected) {
        assert_eq!(got.timestamp_ms, want.timestamp_ms);
        assert!(close(Some(got.price1), Some(want.price1)));
        assert!(close(Some(got.price2), Some(want.price2)));
        assert!(close(got.spread, want.spread));
        assert!(close(got.zscore, want.zscore));
        assert!(close(got.correlation, want.correlation));
    }
    assert!(parsed.rows[0].zscore.is_none());
    assert!(parsed.rows[39].zscore.is_some());
}

#[test]
fn resampled_csv_rejects_unknown_header() {
    let input = "time,a,b\n1,2,3\n";
    assert!(parse_resampled_csv(Cursor::new(input)).is_err());
    assert!(parse_resampled_csv(Cursor::new("")).is_err());
}

#[test]
/// Verifies undefined metrics are exported as the literal N/A token.
fn analytics_csv_uses_na_for_undefined() {
    let report = report(3, 30);
    let mut buf = Vec::new();
    write_analytics_csv(&report, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "metric,value");
    assert_eq!(lines.len(), 8);
    assert!(lines[1].starts_with("Hedge Ratio (β),"));
    assert!(!lines[1].ends_with("N/A"));
    assert_eq!(lines[2], "Latest Z-score,N/A");
    assert_eq!(lines[3], "Latest Correlation,N/A");
    assert_eq!(lines[6], "ADF Statistic,N/A");
    assert_eq!(lines[7], "ADF p-value,N/A");
}

#[test]
fn analytics_csv_with_full_data() {
    let report = report(60, 10);
    let mut buf = Vec::new();
    write_analytics_csv(&report, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let z_line = text.lines().find(|l| l.starts_with("Latest Z-score,")).unwrap();
    let z: f64 = z_line.split(',').nth(1).unwrap().parse().unwrap();
    assert!((z - report.summary.latest_zscore.unwrap()).abs() < 1e-12);
}

#[test]
/// Verifies OHLC import keeps good rows and silently drops malformed ones.
fn ohlc_upload_drops_bad_rows() {
    let input = "\
Timestamp,Open,High,Low,Close,Volume
2023-11-14 22:13:20,100,105,99,104,12.5
2023-11-14 22:14:20,104,abc,99,101,3
,1,2,3,4,5
1700000120000,101,103,100,102,7
";
    let candles = parse_ohlc_csv(Cursor::new(input)).unwrap();
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].open_time, T0);
    assert!((candles[0].close - 104.0).abs() < f64::EPSILON);
    assert!((candles[0].qty - 12.5).abs() < f64::EPSILON);
    assert_eq!(candles[1].open_time, T0 + 120_000);
}

#[test]
/// Verifies quoted cells stay whole, so a comma inside a quote never shifts
/// later columns into the wrong field.
fn ohlc_upload_respects_quoted_cells() {
    let input = r#"timestamp,open,high,low,close,volume
"2023-11-14 22:13:20",100,105,99,104,"1,250"
"2023-11-14 22:14:20",104,106,"101",105,8
2023-11-14 22:15:20,105,107,104,106,9,extra
"#;
    let candles = parse_ohlc_csv(Cursor::new(input)).unwrap();
    assert_eq!(candles.len(), 1);
    assert_eq!(candles[0].open_time, T0 + 60_000);
    assert!((candles[0].low - 101.0).abs() < f64::EPSILON);
    assert!((candles[0].qty - 8.0).abs() < f64::EPSILON);
}

#[test]
fn ohlc_upload_requires_columns() {
    let input = "timestamp,open,close\n1,2,3\n";
    assert!(parse_ohlc_csv(Cursor::new(input)).is_err());
}

#[test]
fn report_files_land_in_export_dir() {
    let dir = std::env::temp_dir().join(format!("pairs-quant-export-{}", std::process::id()));
    let report = report(15, 5);
    let (resampled, analytics) = write_report_files(&report, &dir).unwrap();
    assert!(resampled.exists());
    assert!(analytics.exists());
    assert!(resampled
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("resampled_data_"));
    let _ = std::fs::remove_dir_all(&dir);
}
