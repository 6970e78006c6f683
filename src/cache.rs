use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::time::Instant;

use crate::models::MoviePage;

/// Read-through cache for popular-movie pages, keyed by page number.
///
/// Expiry is checked lazily on lookup; there is no sweeper task. Entries are
/// immutable snapshots, so concurrent refreshes of the same page are
/// last-writer-wins.
#[derive(Clone)]
pub struct PopularCache {
    entries: Arc<DashMap<u32, CachedPage>>,
    ttl: Duration,
}

#[derive(Clone)]
struct CachedPage {
    page: MoviePage,
    cached_at: Instant,
}

impl PopularCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Arc::new(DashMap::new()), ttl }
    }

    pub fn get(&self, page: u32) -> Option<MoviePage> {
        let hit = self
            .entries
            .get(&page)
            .filter(|entry| self.is_fresh(entry.cached_at))
            .map(|entry| entry.page.clone());

        if hit.is_none() {
            self.entries.remove_if(&page, |_, entry| !self.is_fresh(entry.cached_at));
        }
        hit
    }

    pub fn put(&self, page: u32, value: MoviePage) {
        self.entries.insert(page, CachedPage { page: value, cached_at: Instant::now() });
    }

    fn is_fresh(&self, cached_at: Instant) -> bool {
        cached_at.elapsed() < self.ttl
    }
}
