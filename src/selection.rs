use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Background scroll suppression shared by every open panel.
///
/// Each open panel holds a [`ScrollGuard`]; the page is locked while at least
/// one guard is alive. Dropping the guard (closing, replacing, or tearing
/// down the session) releases it.
#[derive(Debug, Clone, Default)]
pub struct ScrollLock {
    holders: Arc<AtomicUsize>,
}

impl ScrollLock {
    pub fn acquire(&self) -> ScrollGuard {
        self.holders.fetch_add(1, Ordering::SeqCst);
        ScrollGuard {
            holders: self.holders.clone(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }
}

#[derive(Debug)]
pub struct ScrollGuard {
    holders: Arc<AtomicUsize>,
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct Held<T> {
    value: T,
    _scroll: ScrollGuard,
}

/// What is being previewed versus what is playing.
///
/// The two slots are cleared independently; starting playback always closes
/// the preview.
#[derive(Debug)]
pub struct Selection<D, P> {
    preview: Option<Held<D>>,
    playing: Option<Held<P>>,
    scroll: ScrollLock,
}

impl<D, P> Default for Selection<D, P> {
    fn default() -> Self {
        Self::new(ScrollLock::default())
    }
}

impl<D, P> Selection<D, P> {
    pub fn new(scroll: ScrollLock) -> Self {
        Self {
            preview: None,
            playing: None,
            scroll,
        }
    }

    pub fn open_detail(&mut self, detail: D) {
        self.preview = Some(Held {
            value: detail,
            _scroll: self.scroll.acquire(),
        });
    }

    pub fn play(&mut self, player: P) {
        self.playing = Some(Held {
            value: player,
            _scroll: self.scroll.acquire(),
        });
        self.preview = None;
    }

    pub fn close_detail(&mut self) -> Option<D> {
        self.preview.take().map(|h| h.value)
    }

    pub fn close_player(&mut self) -> Option<P> {
        self.playing.take().map(|h| h.value)
    }

    pub fn preview(&self) -> Option<&D> {
        self.preview.as_ref().map(|h| &h.value)
    }

    pub fn preview_mut(&mut self) -> Option<&mut D> {
        self.preview.as_mut().map(|h| &mut h.value)
    }

    pub fn playing(&self) -> Option<&P> {
        self.playing.as_ref().map(|h| &h.value)
    }

    pub fn playing_mut(&mut self) -> Option<&mut P> {
        self.playing.as_mut().map(|h| &mut h.value)
    }

    pub fn scroll_locked(&self) -> bool {
        self.scroll.is_locked()
    }
}
