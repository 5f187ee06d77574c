use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;
use url::Url;

use super::types::parse_trade_message;
use crate::error::AppError;
use crate::event::{FeedEvent, WsConnectionStatus};
use crate::store::tick_buffer::TickBuffer;

const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

/// Counters for one finished feed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub accepted: u64,
    pub rejected: u64,
}

/// Subscribes to the combined `<symbol>@trade` streams and pushes every valid
/// trade into a [`TickBuffer`].
///
/// One call to [`BinanceTradeFeed::run`] is one session: it ends on
/// cancellation, transport error, server close or read timeout. There is no
/// reconnection; the caller starts a new session if it wants one.
#[derive(Debug, Clone)]
pub struct BinanceTradeFeed {
    ws_base_url: String,
    read_timeout: Duration,
}

impl BinanceTradeFeed {
    pub fn new(ws_base_url: &str, read_timeout: Duration) -> Self {
        Self {
            ws_base_url: ws_base_url.trim_end_matches('/').to_string(),
            read_timeout,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// `{base}/stream?streams=a@trade/b@trade`, symbols lowercased and sorted.
    pub fn stream_url(&self, symbols: &[String]) -> Result<Url, AppError> {
        let mut streams: Vec<String> = symbols
            .iter()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        streams.sort();
        streams.dedup();
        if streams.is_empty() {
            return Err(AppError::Config("no symbols to subscribe".to_string()));
        }

        let mut url = Url::parse(&format!("{}/stream", self.ws_base_url)).map_err(|e| {
            AppError::Config(format!("invalid ws_base_url '{}': {}", self.ws_base_url, e))
        })?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(AppError::Config(format!(
                "ws_base_url must use ws:// or wss://, got '{}'",
                self.ws_base_url
            )));
        }
        let query = streams
            .iter()
            .map(|s| format!("{}@trade", s))
            .collect::<Vec<_>>()
            .join("/");
        url.set_query(Some(&format!("streams={}", query)));
        Ok(url)
    }

    /// Run one streaming session until it is cancelled or the transport fails.
    pub async fn run(
        &self,
        symbols: &[String],
        buffer: Arc<TickBuffer>,
        events: mpsc::Sender<FeedEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<FeedSummary, AppError> {
        let url = self.stream_url(symbols)?;
        let mut summary = FeedSummary::default();
        if *shutdown.borrow() {
            return Ok(summary);
        }

        notify(&events, FeedEvent::Status(WsConnectionStatus::Connecting));
        notify(&events, FeedEvent::LogMessage(format!("Connecting to {}", url)));
        tracing::info!(url = %url, "Connecting to trade stream");

        let connect = tokio::time::timeout(
            self.read_timeout,
            tokio_tungstenite::connect_async(url.as_str()),
        );
        let ws_stream = tokio::select! {
            res = connect => match res {
                Ok(Ok((stream, _resp))) => stream,
                Ok(Err(e)) => {
                    notify(&events, FeedEvent::Status(WsConnectionStatus::Disconnected));
                    return Err(AppError::WebSocket(format!("connect failed: {}", e)));
                }
                Err(_) => {
                    notify(&events, FeedEvent::Status(WsConnectionStatus::Disconnected));
                    return Err(AppError::WebSocket(format!(
                        "connect timed out after {} ms",
                        self.read_timeout.as_millis()
                    )));
                }
            },
            _ = shutdown.changed() => {
                notify(&events, FeedEvent::Status(WsConnectionStatus::Disconnected));
                return Ok(summary);
            }
        };

        notify(&events, FeedEvent::Status(WsConnectionStatus::Connected));
        tracing::info!(symbols = ?symbols, "Trade stream connected");

        let (mut write, mut read) = ws_stream.split();

        let result = loop {
            tokio::select! {
                msg = tokio::time::timeout(self.read_timeout, read.next()) => {
                    match msg {
                        Ok(Some(Ok(tungstenite::Message::Text(text)))) => {
                            match parse_trade_message(&text) {
                                Ok(tick) => {
                                    buffer.append(tick);
                                    summary.accepted += 1;
                                }
                                Err(e) => {
                                    summary.rejected += 1;
                                    tracing::debug!(error = %e, "Dropping malformed trade message");
                                    notify(&events, FeedEvent::TickRejected { reason: e.to_string() });
                                }
                            }
                        }
                        Ok(Some(Ok(tungstenite::Message::Close(frame)))) => {
                            break Err(AppError::WebSocket(format!(
                                "server closed the stream: {:?}",
                                frame
                            )));
                        }
                        Ok(Some(Ok(_))) => {
                            // Ping/pong and binary frames carry no trades.
                        }
                        Ok(Some(Err(e))) => {
                            break Err(AppError::WebSocket(format!("read error: {}", e)));
                        }
                        Ok(None) => {
                            break Err(AppError::WebSocket("stream ended".to_string()));
                        }
                        Err(_) => {
                            break Err(AppError::FeedStalled(self.read_timeout.as_millis() as u64));
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = tokio::time::timeout(
                            CLOSE_FRAME_TIMEOUT,
                            write.send(tungstenite::Message::Close(None)),
                        )
                        .await;
                        break Ok(summary);
                    }
                }
            }
        };

        notify(&events, FeedEvent::Status(WsConnectionStatus::Disconnected));
        match &result {
            Ok(s) => tracing::info!(
                accepted = s.accepted,
                rejected = s.rejected,
                "Trade stream stopped"
            ),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    accepted = summary.accepted,
                    rejected = summary.rejected,
                    "Trade stream terminated"
                );
                notify(&events, FeedEvent::Error(e.to_string()));
            }
        }
        result
    }
}

// Status delivery must never stall the receive loop.
fn notify(events: &mpsc::Sender<FeedEvent>, event: FeedEvent) {
    if events.try_send(event).is_err() {
        tracing::trace!("Feed event channel full or closed, dropping event");
    }
}
