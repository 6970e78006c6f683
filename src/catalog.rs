use std::fmt;

use async_trait::async_trait;

use crate::{
    error::CatalogError,
    models::{Movie, MovieCredits, MoviePage},
};

/// Read-only access to an external movie metadata provider.
///
/// Implementations do no retrying or caching of their own; that is layered on
/// by [`crate::resilience::ResilientCatalog`].
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError>;

    /// Fails with [`CatalogError::MovieNotFound`] when the provider has no such movie.
    async fn movie_details(&self, movie_id: i64) -> Result<Movie, CatalogError>;

    async fn popular_movies(&self, page: u32) -> Result<MoviePage, CatalogError>;

    async fn movie_credits(&self, movie_id: i64) -> Result<MovieCredits, CatalogError>;
}

/// Logical provider operation. Each one gets its own circuit breaker.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    Search,
    Details,
    Popular,
    Credits,
}

impl Operation {
    pub const ALL: [Operation; 4] =
        [Operation::Search, Operation::Details, Operation::Popular, Operation::Credits];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::Details => "details",
            Operation::Popular => "popular",
            Operation::Credits => "credits",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
