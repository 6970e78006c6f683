mod auth;
mod cache;
mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod resilience;
mod routes;
mod service;
mod store;
#[cfg(test)]
mod testing;
mod tmdb;

use std::{sync::Arc, time::Duration};

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::JwtVerifier, config::Config, resilience::ResilientCatalog, service::MovieService,
    store::LibraryStore, tmdb::TmdbClient,
};

#[derive(Clone)]
pub struct AppState {
    pub movies: MovieService,
    pub auth: JwtVerifier,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movie_service=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent("movie-service/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let db = db::connect_and_migrate(config.database_url.as_str()).await?;

    let tmdb = TmdbClient::new(
        http,
        config.tmdb_access_token.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_language.clone(),
        config.tmdb_rps,
    );
    let catalog = Arc::new(ResilientCatalog::new(Arc::new(tmdb), config.resilience.clone()));

    let state = Arc::new(AppState {
        movies: MovieService::new(catalog, LibraryStore::new(db)),
        auth: JwtVerifier::new(&config.jwt_secret),
    });

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
