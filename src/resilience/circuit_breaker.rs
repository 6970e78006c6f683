use std::{collections::VecDeque, time::Duration};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Number of most recent outcomes the failure ratio is computed over.
    pub window_size: usize,
    /// Outcomes needed in the window before the ratio is evaluated.
    pub minimum_calls: usize,
    /// Failure ratio (0.0..=1.0) at or above which the circuit opens.
    pub failure_rate_threshold: f64,
    /// Cool-down before a half-open probe is let through.
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            minimum_calls: 5,
            failure_rate_threshold: 0.5,
            open_duration: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    Closed,
    Open { since: Instant },
    HalfOpen { probe_started: Instant },
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    /// `true` marks a failure.
    window: VecDeque<bool>,
}

/// Count-based rolling-window circuit breaker.
///
/// Callers ask for a permit with [`CircuitBreaker::try_acquire`] before each
/// attempt and report the outcome with `record_success`/`record_failure`.
/// The lock is only held inside these synchronous calls, never across I/O.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        let window = VecDeque::with_capacity(config.window_size);
        Self { name, config, inner: Mutex::new(Inner { phase: Phase::Closed, window }) }
    }

    pub fn state(&self) -> CircuitState {
        match self.inner.lock().phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Whether an attempt may reach the provider right now.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.phase {
            Phase::Closed => true,
            Phase::Open { since } => {
                if since.elapsed() < self.config.open_duration {
                    return false;
                }
                tracing::info!(breaker = self.name, "circuit breaker OPEN -> HALF_OPEN");
                inner.phase = Phase::HalfOpen { probe_started: Instant::now() };
                true
            },
            Phase::HalfOpen { probe_started } => {
                // A probe whose caller was cancelled never reports back.
                if probe_started.elapsed() < self.config.open_duration {
                    return false;
                }
                inner.phase = Phase::HalfOpen { probe_started: Instant::now() };
                true
            },
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.phase {
            Phase::Closed => self.push(&mut inner, false),
            Phase::HalfOpen { .. } => {
                tracing::info!(breaker = self.name, "circuit breaker HALF_OPEN -> CLOSED");
                inner.phase = Phase::Closed;
                inner.window.clear();
            },
            // Late result from a call admitted before the circuit opened.
            Phase::Open { .. } => {},
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.phase {
            Phase::Closed => {
                self.push(&mut inner, true);
                let minimum = self.config.minimum_calls.clamp(1, self.config.window_size.max(1));
                if inner.window.len() < minimum {
                    return;
                }
                let failures = inner.window.iter().filter(|failed| **failed).count();
                let rate = failures as f64 / inner.window.len() as f64;
                if rate >= self.config.failure_rate_threshold {
                    tracing::warn!(
                        breaker = self.name,
                        failures,
                        calls = inner.window.len(),
                        "circuit breaker CLOSED -> OPEN"
                    );
                    inner.phase = Phase::Open { since: Instant::now() };
                    inner.window.clear();
                }
            },
            Phase::HalfOpen { .. } => {
                tracing::warn!(breaker = self.name, "circuit breaker HALF_OPEN -> OPEN");
                inner.phase = Phase::Open { since: Instant::now() };
            },
            Phase::Open { .. } => {},
        }
    }

    fn push(&self, inner: &mut Inner, failed: bool) {
        if inner.window.len() >= self.config.window_size.max(1) {
            inner.window.pop_front();
        }
        inner.window.push_back(failed);
    }
}
