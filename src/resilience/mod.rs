//! Retry, circuit breaking, caching and fallback around a [`CatalogClient`].
//!
//! Call order for every provider operation:
//!
//! 1. popular-page cache (popular only); a hit skips everything below
//! 2. retry loop with exponential backoff for transient failures
//! 3. per-operation circuit breaker, consulted before every attempt
//! 4. fallback: empty page for list calls, [`CatalogError::Unavailable`] for
//!    single-movie calls

pub mod circuit_breaker;
pub mod retry;

use std::{future::Future, sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::{
    cache::PopularCache,
    catalog::{CatalogClient, Operation},
    error::CatalogError,
    models::{Movie, MovieCredits, MoviePage},
};

pub use self::{
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState},
    retry::RetryPolicy,
};

#[derive(Clone, Debug)]
pub struct ResilienceSettings {
    pub retry: RetryPolicy,
    pub breaker: CircuitBreakerConfig,
    /// Upper bound for a single provider attempt.
    pub attempt_timeout: Duration,
    pub popular_ttl: Duration,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            breaker: CircuitBreakerConfig::default(),
            attempt_timeout: Duration::from_secs(5),
            popular_ttl: Duration::from_secs(30 * 60),
        }
    }
}

struct Breakers {
    search: CircuitBreaker,
    details: CircuitBreaker,
    popular: CircuitBreaker,
    credits: CircuitBreaker,
}

impl Breakers {
    fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            search: CircuitBreaker::new(Operation::Search.as_str(), config.clone()),
            details: CircuitBreaker::new(Operation::Details.as_str(), config.clone()),
            popular: CircuitBreaker::new(Operation::Popular.as_str(), config.clone()),
            credits: CircuitBreaker::new(Operation::Credits.as_str(), config.clone()),
        }
    }

    fn get(&self, op: Operation) -> &CircuitBreaker {
        match op {
            Operation::Search => &self.search,
            Operation::Details => &self.details,
            Operation::Popular => &self.popular,
            Operation::Credits => &self.credits,
        }
    }
}

pub struct ResilientCatalog {
    inner: Arc<dyn CatalogClient>,
    retry: RetryPolicy,
    attempt_timeout: Duration,
    breakers: Breakers,
    popular_cache: PopularCache,
}

impl ResilientCatalog {
    pub fn new(inner: Arc<dyn CatalogClient>, settings: ResilienceSettings) -> Self {
        Self {
            inner,
            breakers: Breakers::new(&settings.breaker),
            retry: settings.retry,
            attempt_timeout: settings.attempt_timeout,
            popular_cache: PopularCache::new(settings.popular_ttl),
        }
    }

    pub fn circuit_state(&self, op: Operation) -> CircuitState {
        self.breakers.get(op).state()
    }

    /// Never fails; degrades to an empty page.
    pub async fn search_movies(&self, query: &str, page: u32) -> MoviePage {
        match self.guarded(Operation::Search, || self.inner.search_movies(query, page)).await {
            Ok(found) => found,
            Err(err) => {
                warn!(%query, page, error = %err, "search fallback: returning empty page");
                MoviePage::empty(page)
            },
        }
    }

    /// Never fails; served from cache when fresh, otherwise degrades to an empty page.
    pub async fn popular_movies(&self, page: u32) -> MoviePage {
        if let Some(hit) = self.popular_cache.get(page) {
            debug!(page, "popular movies cache hit");
            return hit;
        }

        match self.guarded(Operation::Popular, || self.inner.popular_movies(page)).await {
            Ok(fresh) => {
                self.popular_cache.put(page, fresh.clone());
                fresh
            },
            Err(err) => {
                warn!(page, error = %err, "popular fallback: returning empty page");
                MoviePage::empty(page)
            },
        }
    }

    pub async fn movie_details(&self, movie_id: i64) -> Result<Movie, CatalogError> {
        self.guarded(Operation::Details, || self.inner.movie_details(movie_id)).await
    }

    pub async fn movie_credits(&self, movie_id: i64) -> Result<MovieCredits, CatalogError> {
        self.guarded(Operation::Credits, || self.inner.movie_credits(movie_id)).await
    }

    /// Runs `call` through the operation's breaker with bounded retries.
    ///
    /// Returns the provider value, a definitive `MovieNotFound`, or
    /// `Unavailable` once the circuit rejects an attempt or retries run out.
    async fn guarded<T, F, Fut>(&self, op: Operation, mut call: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let breaker = self.breakers.get(op);
        let mut attempt = 0;

        loop {
            attempt += 1;

            if !breaker.try_acquire() {
                debug!(operation = %op, attempt, "circuit open, short-circuiting");
                return Err(CatalogError::Unavailable);
            }

            let outcome = match tokio::time::timeout(self.attempt_timeout, call()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(CatalogError::Provider(format!(
                    "{op} timed out after {}ms",
                    self.attempt_timeout.as_millis()
                ))),
            };

            let err = match outcome {
                Ok(value) => {
                    breaker.record_success();
                    return Ok(value);
                },
                Err(err) if !err.is_transient() => {
                    // The provider answered; that is not a health problem.
                    breaker.record_success();
                    return Err(err);
                },
                Err(err) => err,
            };

            breaker.record_failure();

            if breaker.state() == CircuitState::Open {
                warn!(operation = %op, attempts = attempt, error = %err, "circuit opened, giving up");
                return Err(CatalogError::Unavailable);
            }

            if !self.retry.should_retry(attempt) {
                warn!(operation = %op, attempts = attempt, error = %err, "provider retries exhausted");
                return Err(CatalogError::Unavailable);
            }

            let backoff = self.retry.backoff_after(attempt);
            debug!(operation = %op, attempt, ?backoff, error = %err, "retrying provider call");
            tokio::time::sleep(backoff).await;
        }
    }
}
