use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;

use crate::resilience::{CircuitBreakerConfig, ResilienceSettings, RetryPolicy};

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub tmdb_access_token: String,
    pub tmdb_base_url: String,
    pub tmdb_language: String,
    pub tmdb_rps: u32,
    pub database_url: String,
    pub jwt_secret: String,
    pub resilience: ResilienceSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse().context("PORT")?;

        let tmdb_access_token = std::env::var("TMDB_ACCESS_TOKEN").unwrap_or_default();
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());
        let tmdb_language = std::env::var("TMDB_LANGUAGE").unwrap_or_else(|_| "pt-BR".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://movie-service.db?mode=rwc".to_string());

        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let retry = RetryPolicy {
            max_attempts: env_or("RETRY_MAX_ATTEMPTS", 3),
            initial_backoff: Duration::from_millis(env_or("RETRY_INITIAL_BACKOFF_MS", 500)),
            ..RetryPolicy::default()
        };

        let breaker = CircuitBreakerConfig {
            window_size: env_or("BREAKER_WINDOW_SIZE", 10),
            minimum_calls: env_or("BREAKER_MINIMUM_CALLS", 5),
            failure_rate_threshold: env_or("BREAKER_FAILURE_RATE", 0.5_f64).clamp(0.0, 1.0),
            open_duration: Duration::from_secs(env_or("BREAKER_OPEN_SECS", 30)),
        };

        let resilience = ResilienceSettings {
            retry,
            breaker,
            attempt_timeout: Duration::from_millis(env_or("TMDB_TIMEOUT_MS", 5000)),
            popular_ttl: Duration::from_secs(env_or::<u64>("POPULAR_CACHE_TTL_MINUTES", 30) * 60),
        };

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            tmdb_access_token,
            tmdb_base_url,
            tmdb_language,
            tmdb_rps: env_or("TMDB_RPS", 20),
            database_url,
            jwt_secret,
            resilience,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}
