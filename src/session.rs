use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::binance::ws::{BinanceTradeFeed, FeedSummary};
use crate::error::AppError;
use crate::event::FeedEvent;
use crate::store::tick_buffer::TickBuffer;

const FEED_EVENT_CAPACITY: usize = 256;

/// Handle to a feed running on the tokio runtime.
///
/// Dropping the handle without calling [`StreamSession::stop`] also cancels
/// the feed, because the shutdown sender goes away with it.
pub struct StreamSession {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<Result<FeedSummary, AppError>>,
    events_rx: mpsc::Receiver<FeedEvent>,
}

impl StreamSession {
    pub fn start(feed: BinanceTradeFeed, symbols: Vec<String>, buffer: Arc<TickBuffer>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::channel(FEED_EVENT_CAPACITY);
        let task = tokio::spawn(async move {
            feed.run(&symbols, buffer, events_tx, shutdown_rx).await
        });
        Self {
            shutdown_tx,
            task,
            events_rx,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Drain pending feed notifications without waiting.
    pub fn drain_events(&mut self) -> Vec<FeedEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            out.push(event);
        }
        out
    }

    /// Cancel the feed and wait for it to release the connection.
    pub async fn stop(self) -> Result<FeedSummary, AppError> {
        let _ = self.shutdown_tx.send(true);
        join(self.task).await
    }

    /// Wait for the session to end on its own (transport failure or close).
    pub async fn wait(self) -> Result<FeedSummary, AppError> {
        let Self {
            shutdown_tx, task, ..
        } = self;
        let result = join(task).await;
        drop(shutdown_tx);
        result
    }
}

async fn join(task: JoinHandle<Result<FeedSummary, AppError>>) -> Result<FeedSummary, AppError> {
    task.await
        .map_err(|e| AppError::WebSocket(format!("feed task failed: {}", e)))?
}
