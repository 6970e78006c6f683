use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::entities::{favorite, watch_later};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f64,
    pub vote_count: u32,
    pub popularity: f64,
    /// Caller-relative, only set by the details lookup.
    pub favorite: bool,
    pub watch_later: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
}

impl MoviePage {
    /// Degraded page returned when the provider cannot be reached.
    pub fn empty(page: u32) -> Self {
        Self { movies: Vec::new(), page, total_pages: 0, total_results: 0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieCredits {
    pub movie_id: i64,
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub job: Option<String>,
    pub department: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: i32,
    pub movie_id: i64,
    pub user_id: String,
    pub title: String,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
    pub created_at: Timestamp,
}

impl From<favorite::Model> for Favorite {
    fn from(row: favorite::Model) -> Self {
        Self {
            id: row.id,
            movie_id: row.movie_id,
            user_id: row.user_id,
            title: row.title,
            poster_path: row.poster_path,
            overview: row.overview,
            vote_average: row.vote_average,
            created_at: from_millis(row.created_at),
        }
    }
}

/// Snapshot written when a movie is favorited.
#[derive(Clone, Debug)]
pub struct NewFavorite {
    pub movie_id: i64,
    pub user_id: String,
    pub title: String,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
}

impl NewFavorite {
    pub fn from_movie(movie: &Movie, user_id: &str) -> Self {
        Self {
            movie_id: movie.id,
            user_id: user_id.to_string(),
            title: movie.title.clone(),
            poster_path: movie.poster_path.clone(),
            overview: movie.overview.clone(),
            vote_average: Some(movie.vote_average),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchLater {
    pub id: i32,
    pub movie_id: i64,
    pub user_id: String,
    pub title: String,
    pub poster_path: Option<String>,
    pub created_at: Timestamp,
}

impl From<watch_later::Model> for WatchLater {
    fn from(row: watch_later::Model) -> Self {
        Self {
            id: row.id,
            movie_id: row.movie_id,
            user_id: row.user_id,
            title: row.title,
            poster_path: row.poster_path,
            created_at: from_millis(row.created_at),
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewWatchLater {
    pub movie_id: i64,
    pub user_id: String,
    pub title: String,
    pub poster_path: Option<String>,
}

impl NewWatchLater {
    pub fn from_movie(movie: &Movie, user_id: &str) -> Self {
        Self {
            movie_id: movie.id,
            user_id: user_id.to_string(),
            title: movie.title.clone(),
            poster_path: movie.poster_path.clone(),
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Zero-based page of a local list.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size: size.clamp(1, MAX_PAGE_SIZE) }
    }

    pub fn clamped(self) -> Self {
        Self::new(self.page, self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

fn from_millis(ms: i64) -> Timestamp {
    Timestamp::from_millisecond(ms).unwrap_or(Timestamp::UNIX_EPOCH)
}
