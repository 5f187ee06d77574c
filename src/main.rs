use std::sync::Arc;

use anyhow::{Context, Result};

use pairs_quant::analytics::{AdfOutcome, AlertState};
use pairs_quant::binance::ws::BinanceTradeFeed;
use pairs_quant::config::{Config, LoggingConfig};
use pairs_quant::event::FeedEvent;
use pairs_quant::export::write_report_files;
use pairs_quant::pipeline::{PairPipeline, PairReport, PipelineSettings};
use pairs_quant::session::StreamSession;
use pairs_quant::store::tick_buffer::TickBuffer;

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(&logging.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    match &logging.file {
        Some(path) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(log_file)
                .with_ansi(false)
                .json()
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
    }
    Ok(())
}

fn log_feed_event(event: FeedEvent) {
    match event {
        FeedEvent::Status(status) => tracing::info!(status = ?status, "Feed status"),
        FeedEvent::TickRejected { reason } => tracing::trace!(reason = %reason, "Tick rejected"),
        FeedEvent::LogMessage(msg) => tracing::info!("{}", msg),
        FeedEvent::Error(msg) => tracing::error!(error = %msg, "Feed error"),
    }
}

fn log_report(report: &PairReport, ticks_received: u64, alert_threshold: f64) {
    if !report.has_data() {
        tracing::info!(ticks_received, "Waiting for data on both symbols");
        return;
    }
    tracing::info!(
        ticks_received,
        buckets = report.aligned.len(),
        hedge_ratio = ?report.hedge_ratio.value(),
        latest_zscore = ?report.summary.latest_zscore,
        latest_correlation = ?report.summary.latest_correlation,
        spread_mean = ?report.summary.mean,
        spread_std = ?report.summary.std_dev,
        "Pair analytics"
    );
    match &report.adf {
        AdfOutcome::Computed(adf) => tracing::info!(
            statistic = adf.statistic,
            p_value = adf.p_value,
            used_lag = adf.used_lag,
            stationary = adf.is_stationary_at(0.05),
            "ADF test"
        ),
        other => tracing::debug!(reason = ?other.error(), "ADF test unavailable"),
    }
    if let AlertState::Triggered { zscore } = report.alert {
        tracing::warn!(
            zscore,
            threshold = alert_threshold,
            "Z-score alert triggered"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set PAIRS_QUANT_CONFIG or provide config/default.toml");
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging)?;

    let settings = PipelineSettings::from_config(&config)?;
    let refresh_interval = config.analytics.refresh_interval()?;
    let read_timeout = config.binance.read_timeout()?;

    tracing::info!(
        symbols = ?settings.symbols,
        timeframe = %settings.timeframe,
        window = settings.window,
        ws_url = %config.binance.ws_base_url,
        "Starting pairs-quant"
    );

    let buffer = Arc::new(TickBuffer::with_retention(config.analytics.retention()));
    let feed = BinanceTradeFeed::new(&config.binance.ws_base_url, read_timeout);
    let pipeline = PairPipeline::new(settings.clone());
    let mut session = StreamSession::start(feed, settings.symbols.to_vec(), buffer.clone());

    let mut refresh = tokio::time::interval(refresh_interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                for event in session.drain_events() {
                    log_feed_event(event);
                }
                let report = pipeline.refresh(&buffer);
                log_report(&report, buffer.total_appended(), settings.alert_threshold);
                if !session.is_running() {
                    tracing::warn!("Feed session ended, stopping");
                    break;
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Ctrl+C received");
                break;
            }
        }
    }

    match session.stop().await {
        Ok(summary) => tracing::info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            "Stream stopped"
        ),
        Err(e) => tracing::error!(error = %e, "Stream session failed"),
    }

    let report = pipeline.refresh(&buffer);
    if report.has_data() {
        match write_report_files(&report, &config.export.dir) {
            Ok((resampled, analytics)) => tracing::info!(
                resampled = %resampled.display(),
                analytics = %analytics.display(),
                "Exported session data"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to export session data"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
