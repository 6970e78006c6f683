use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{StatusCode, header::ACCEPT};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    catalog::CatalogClient,
    error::CatalogError,
    models::{CastMember, CrewMember, Movie, MovieCredits, MoviePage},
};

pub struct TmdbClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    language: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        access_token: String,
        base_url: String,
        language: String,
        rps: u32,
    ) -> Self {
        if access_token.trim().is_empty() {
            tracing::warn!("no TMDB_ACCESS_TOKEN provided, provider calls will be rejected");
        }

        let rps = NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Self { client, access_token, base_url, language, limiter }
    }

    /// GET `path` with the fixed locale. A 404 becomes `MovieNotFound` only
    /// when `movie_id` is given; every other non-2xx is a provider error.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        movie_id: Option<i64>,
    ) -> Result<T, CatalogError> {
        self.limiter.until_ready().await;

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        tracing::debug!(%url, "tmdb request");

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
            .query(&[("language", self.language.as_str())])
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if let (StatusCode::NOT_FOUND, Some(id)) = (status, movie_id) {
            return Err(CatalogError::MovieNotFound(id));
        }
        if !status.is_success() {
            return Err(CatalogError::Provider(format!("{path} returned {status}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| CatalogError::Provider(format!("malformed payload from {path}: {e}")))
    }
}

#[async_trait]
impl CatalogClient for TmdbClient {
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage, CatalogError> {
        let resp: SearchResponse = self
            .get_json(
                "/search/movie",
                &[("query", query.to_string()), ("page", page.to_string())],
                None,
            )
            .await?;
        Ok(resp.into())
    }

    async fn movie_details(&self, movie_id: i64) -> Result<Movie, CatalogError> {
        let resp: MovieResult =
            self.get_json(&format!("/movie/{movie_id}"), &[], Some(movie_id)).await?;
        Ok(resp.into())
    }

    async fn popular_movies(&self, page: u32) -> Result<MoviePage, CatalogError> {
        let resp: SearchResponse =
            self.get_json("/movie/popular", &[("page", page.to_string())], None).await?;
        Ok(resp.into())
    }

    async fn movie_credits(&self, movie_id: i64) -> Result<MovieCredits, CatalogError> {
        let resp: CreditsResponse =
            self.get_json(&format!("/movie/{movie_id}/credits"), &[], Some(movie_id)).await?;
        Ok(resp.into())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    results: Vec<MovieResult>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u64,
}

impl From<SearchResponse> for MoviePage {
    fn from(resp: SearchResponse) -> Self {
        MoviePage {
            movies: resp.results.into_iter().map(Movie::from).collect(),
            page: resp.page,
            total_pages: resp.total_pages,
            total_results: resp.total_results,
        }
    }
}

/// Shared by search results and the details endpoint; extra detail fields are ignored.
#[derive(Debug, Deserialize)]
struct MovieResult {
    id: i64,
    title: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    vote_count: Option<u32>,
    popularity: Option<f64>,
}

impl From<MovieResult> for Movie {
    fn from(m: MovieResult) -> Self {
        Movie {
            id: m.id,
            title: m.title.unwrap_or_default(),
            overview: non_empty(m.overview),
            poster_path: non_empty(m.poster_path),
            backdrop_path: non_empty(m.backdrop_path),
            release_date: non_empty(m.release_date),
            vote_average: m.vote_average.unwrap_or_default(),
            vote_count: m.vote_count.unwrap_or_default(),
            popularity: m.popularity.unwrap_or_default(),
            favorite: false,
            watch_later: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreditsResponse {
    id: i64,
    #[serde(default)]
    cast: Vec<CastEntry>,
    #[serde(default)]
    crew: Vec<CrewEntry>,
}

#[derive(Debug, Deserialize)]
struct CastEntry {
    id: i64,
    name: Option<String>,
    character: Option<String>,
    profile_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrewEntry {
    id: i64,
    name: Option<String>,
    job: Option<String>,
    department: Option<String>,
    known_for_department: Option<String>,
    profile_path: Option<String>,
}

impl From<CreditsResponse> for MovieCredits {
    fn from(resp: CreditsResponse) -> Self {
        let cast = resp
            .cast
            .into_iter()
            .map(|c| CastMember {
                id: c.id,
                name: c.name.unwrap_or_default(),
                character: non_empty(c.character),
                profile_path: non_empty(c.profile_path),
            })
            .collect();

        let crew = resp
            .crew
            .into_iter()
            .map(|c| CrewMember {
                id: c.id,
                name: c.name.unwrap_or_default(),
                job: non_empty(c.job),
                department: non_empty(c.department).or_else(|| non_empty(c.known_for_department)),
                profile_path: non_empty(c.profile_path),
            })
            .collect();

        MovieCredits { movie_id: resp.id, cast, crew }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.and_then(|s| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    })
}
