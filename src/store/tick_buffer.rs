use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::model::tick::Tick;

/// How much history the buffer keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Grow for the whole session. Fine for bounded demo sessions.
    #[default]
    Unbounded,
    /// Keep at most this many ticks, evicting the oldest.
    MaxTicks(usize),
    /// Keep ticks whose timestamp is within this age of the newest tick.
    MaxAge(Duration),
}

#[derive(Debug, Default)]
struct Inner {
    ticks: VecDeque<Tick>,
    total_appended: u64,
}

/// Append-only tick log shared between the feed (writer) and the analytics
/// refresh (readers).
///
/// Readers never see the live storage: [`TickBuffer::snapshot`] copies the
/// contents under the lock, so an append racing with a snapshot is either
/// fully included or fully excluded.
#[derive(Debug, Default)]
pub struct TickBuffer {
    inner: Mutex<Inner>,
    retention: Retention,
}

impl TickBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Retention) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            retention,
        }
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn append(&self, tick: Tick) {
        let mut guard = self.lock();
        guard.total_appended = guard.total_appended.saturating_add(1);
        let newest_ms = tick.timestamp_ms;
        guard.ticks.push_back(tick);
        match self.retention {
            Retention::Unbounded => {}
            Retention::MaxTicks(max) => {
                while guard.ticks.len() > max {
                    guard.ticks.pop_front();
                }
            }
            Retention::MaxAge(age) => {
                let cutoff = newest_ms.saturating_sub(age.as_millis() as u64);
                while guard
                    .ticks
                    .front()
                    .is_some_and(|t| t.timestamp_ms < cutoff)
                {
                    guard.ticks.pop_front();
                }
            }
        }
    }

    /// Point-in-time copy of every retained tick, in append order.
    pub fn snapshot(&self) -> Vec<Tick> {
        let guard = self.lock();
        guard.ticks.iter().cloned().collect()
    }

    /// Point-in-time copy restricted to one (lowercase) symbol.
    pub fn snapshot_symbol(&self, symbol: &str) -> Vec<Tick> {
        let symbol = symbol.to_ascii_lowercase();
        let guard = self.lock();
        guard
            .ticks
            .iter()
            .filter(|t| t.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of ticks ever accepted, evicted ones included.
    pub fn total_appended(&self) -> u64 {
        self.lock().total_appended
    }

    // A panic while holding the lock cannot leave a Tick half-written, so a
    // poisoned mutex is still safe to read and must not stop the producer.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
