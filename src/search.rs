use crate::models::Title;
use crate::tmdb::CatalogApi;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSnapshot {
    pub query: String,
    pub results: Vec<Title>,
}

struct Shared {
    latest: AtomicU64,
    state: Mutex<SearchSnapshot>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SearchSnapshot> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Debounced multi-search.
///
/// Every call to [`set_query`](Self::set_query) restarts the quiet period and
/// takes a fresh sequence token. A response is applied only if its token is
/// still the latest one when it arrives, so a slow answer to an older query
/// can never overwrite a newer one. Requests already on the wire are left to
/// finish; only the pending timer is cancelled.
pub struct SearchCoordinator {
    api: Arc<dyn CatalogApi>,
    quiet_period: Duration,
    shared: Arc<Shared>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchCoordinator {
    pub fn new(api: Arc<dyn CatalogApi>, quiet_period: Duration) -> Self {
        Self {
            api,
            quiet_period,
            shared: Arc::new(Shared {
                latest: AtomicU64::new(0),
                state: Mutex::new(SearchSnapshot::default()),
            }),
            pending: Mutex::new(None),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn set_query(&self, query: &str) {
        let seq = self.shared.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        {
            let mut state = self.shared.state();
            state.query = query.to_string();
            if query.trim().is_empty() {
                state.results.clear();
                return;
            }
        }

        let api = self.api.clone();
        let shared = self.shared.clone();
        let quiet = self.quiet_period;
        let query = query.to_string();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            // Past this point the request is committed; aborting the timer
            // handle must not cancel it.
            tokio::spawn(async move {
                info!("Searching catalog for '{}'", query);
                let results = api.search_multi(&query).await;
                let mut state = shared.state();
                if shared.latest.load(Ordering::SeqCst) != seq {
                    debug!("Discarding stale results for '{}'", query);
                    return;
                }
                state.results = results;
            });
        }));
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.shared.state().clone()
    }

    pub fn query(&self) -> String {
        self.shared.state().query.clone()
    }

    pub fn results(&self) -> Vec<Title> {
        self.shared.state().results.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.shared.state().query.trim().is_empty()
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(timer) = pending.take() {
            timer.abort();
        }
    }
}
