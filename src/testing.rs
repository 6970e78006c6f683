//! Test doubles and fixtures shared by the unit tests.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_orm::ConnectOptions;

use crate::{
    catalog::{CatalogClient, Operation},
    db,
    error::CatalogError,
    models::{Movie, MovieCredits, MoviePage},
    store::LibraryStore,
};

pub fn movie(id: i64, title: &str) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        overview: Some(format!("About {title}")),
        poster_path: Some(format!("/{id}.jpg")),
        backdrop_path: None,
        release_date: Some("1999-03-31".to_string()),
        vote_average: 8.2,
        vote_count: 100,
        popularity: 10.0,
        favorite: false,
        watch_later: false,
    }
}

pub async fn memory_store() -> LibraryStore {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    LibraryStore::new(db::connect_and_migrate(options).await.unwrap())
}

/// In-memory [`CatalogClient`] that counts calls and can be scripted to fail.
#[derive(Default)]
pub struct StubCatalog {
    movies: Mutex<HashMap<i64, Movie>>,
    failure: Mutex<Option<CatalogError>>,
    fail_next: Mutex<Option<(u32, CatalogError)>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<HashMap<Operation, usize>>,
}

impl StubCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_movie(&self, movie: Movie) {
        self.movies.lock().insert(movie.id, movie);
    }

    /// Every call fails with `err` until [`StubCatalog::recover`].
    pub fn fail_with(&self, err: CatalogError) {
        *self.failure.lock() = Some(err);
    }

    pub fn fail_next(&self, times: u32, err: CatalogError) {
        *self.fail_next.lock() = Some((times, err));
    }

    pub fn recover(&self) {
        *self.failure.lock() = None;
        *self.fail_next.lock() = None;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        Operation::ALL.into_iter().map(|op| self.calls(op)).sum()
    }

    async fn enter(&self, op: Operation) -> Result<(), CatalogError> {
        *self.calls.lock().entry(op).or_default() += 1;

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }

        let mut next = self.fail_next.lock();
        if let Some((times, err)) = next.as_mut() {
            if *times > 0 {
                *times -= 1;
                return Err(err.clone());
            }
        }
        Ok(())
    }

    fn find(&self, movie_id: i64) -> Result<Movie, CatalogError> {
        self.movies.lock().get(&movie_id).cloned().ok_or(CatalogError::MovieNotFound(movie_id))
    }
}

#[async_trait]
impl CatalogClient for StubCatalog {
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        self.enter(Operation::Search).await?;
        Ok(MoviePage { movies: vec![movie(1, query)], page, total_pages: 1, total_results: 1 })
    }

    async fn movie_details(&self, movie_id: i64) -> Result<Movie, CatalogError> {
        self.enter(Operation::Details).await?;
        self.find(movie_id)
    }

    async fn popular_movies(&self, page: u32) -> Result<MoviePage, CatalogError> {
        self.enter(Operation::Popular).await?;
        let top = movie(i64::from(page), &format!("Popular {page}"));
        Ok(MoviePage { movies: vec![top], page, total_pages: 1, total_results: 1 })
    }

    async fn movie_credits(&self, movie_id: i64) -> Result<MovieCredits, CatalogError> {
        self.enter(Operation::Credits).await?;
        self.find(movie_id)?;
        Ok(MovieCredits { movie_id, cast: Vec::new(), crew: Vec::new() })
    }
}
