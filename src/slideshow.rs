use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideshowMode {
    AutoAdvancing,
    Paused,
}

/// Index into the first `min(item_count, window)` items, wrapping at the edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideshowCursor {
    index: usize,
    len: usize,
    window: usize,
    mode: SlideshowMode,
}

impl SlideshowCursor {
    pub fn new(item_count: usize, window: usize) -> Self {
        let window = window.max(1);
        Self {
            index: 0,
            len: item_count.min(window),
            window,
            mode: SlideshowMode::AutoAdvancing,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn mode(&self) -> SlideshowMode {
        self.mode
    }

    pub fn set_item_count(&mut self, item_count: usize) {
        self.len = item_count.min(self.window);
        if self.index >= self.len {
            self.index = 0;
        }
    }

    /// Timer-driven advance; ignored once paused.
    pub fn tick(&mut self) -> bool {
        if self.mode != SlideshowMode::AutoAdvancing || self.len == 0 {
            return false;
        }
        self.index = (self.index + 1) % self.len;
        true
    }

    pub fn next(&mut self) {
        self.mode = SlideshowMode::Paused;
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }

    pub fn previous(&mut self) {
        self.mode = SlideshowMode::Paused;
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }

    /// Out-of-range targets are rejected without changing state.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.mode = SlideshowMode::Paused;
        self.index = index;
        true
    }
}

/// A [`SlideshowCursor`] advanced by a recurring timer task.
///
/// The task is aborted when the controller is dropped, so it never outlives
/// the banner it drives. Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct SlideshowController {
    cursor: Arc<Mutex<SlideshowCursor>>,
    ticker: JoinHandle<()>,
}

impl SlideshowController {
    pub fn start(item_count: usize, window: usize, period: Duration) -> Self {
        let cursor = Arc::new(Mutex::new(SlideshowCursor::new(item_count, window)));
        let shared = cursor.clone();
        let ticker = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                let mut cursor = lock(&shared);
                if cursor.tick() {
                    debug!("Hero slideshow advanced to {}", cursor.index());
                }
            }
        });
        Self { cursor, ticker }
    }

    pub fn snapshot(&self) -> SlideshowCursor {
        lock(&self.cursor).clone()
    }

    pub fn set_item_count(&self, item_count: usize) {
        lock(&self.cursor).set_item_count(item_count);
    }

    pub fn next(&self) -> SlideshowCursor {
        let mut cursor = lock(&self.cursor);
        cursor.next();
        cursor.clone()
    }

    pub fn previous(&self) -> SlideshowCursor {
        let mut cursor = lock(&self.cursor);
        cursor.previous();
        cursor.clone()
    }

    pub fn jump_to(&self, index: usize) -> Option<SlideshowCursor> {
        let mut cursor = lock(&self.cursor);
        cursor.jump_to(index).then(|| cursor.clone())
    }
}

impl Drop for SlideshowController {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

fn lock(cursor: &Mutex<SlideshowCursor>) -> MutexGuard<'_, SlideshowCursor> {
    cursor.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
