use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    AppState,
    auth::CurrentUser,
    error::{AppError, AppResult},
    models::{Favorite, Movie, MovieCredits, MoviePage, Page, PageRequest, WatchLater},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/movies/search", get(search))
        .route("/api/movies/popular", get(popular))
        .route("/api/movies/favorites", get(favorites))
        .route("/api/movies/watch-later", get(watch_later))
        .route("/api/movies/{id}", get(details))
        .route("/api/movies/{id}/credits", get(credits))
        .route("/api/movies/{id}/favorite", post(add_favorite).delete(remove_favorite))
        .route("/api/movies/{id}/watch-later", post(add_watch_later).delete(remove_watch_later))
        .with_state(state)
}

/// `Path` with malformed segments reported as a problem body.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
struct ApiPath<T>(T);

/// `Query` with malformed parameters reported as a problem body.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
struct ApiQuery<T>(T);

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "circuits": state.movies.circuit_states(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    query: String,
    #[serde(default = "first_page")]
    page: u32,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "first_page")]
    page: u32,
}

fn first_page() -> u32 {
    1
}

fn check_page(page: u32) -> AppResult<u32> {
    if page == 0 {
        return Err(AppError::BadRequest("page must be 1 or greater".into()));
    }
    Ok(page)
}

async fn search(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(q): ApiQuery<SearchQuery>,
) -> AppResult<Json<MoviePage>> {
    let query = q.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("query is required".into()));
    }
    let page = check_page(q.page)?;
    Ok(Json(state.movies.search_movies(query, page, &user_id).await))
}

async fn popular(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(q): ApiQuery<PopularQuery>,
) -> AppResult<Json<MoviePage>> {
    let page = check_page(q.page)?;
    Ok(Json(state.movies.popular_movies(page, &user_id).await))
}

async fn details(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Movie>> {
    Ok(Json(state.movies.movie_details(id, &user_id).await?))
}

async fn credits(
    State(state): State<Arc<AppState>>,
    CurrentUser(_): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<MovieCredits>> {
    Ok(Json(state.movies.movie_credits(id).await?))
}

async fn add_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<(StatusCode, Json<Favorite>)> {
    let saved = state.movies.add_favorite(id, &user_id).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.movies.remove_favorite(id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn favorites(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> AppResult<Json<Page<Favorite>>> {
    Ok(Json(state.movies.list_favorites(&user_id, page).await?))
}

async fn add_watch_later(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<(StatusCode, Json<WatchLater>)> {
    let saved = state.movies.add_watch_later(id, &user_id).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn remove_watch_later(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    state.movies.remove_watch_later(id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn watch_later(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> AppResult<Json<Page<WatchLater>>> {
    Ok(Json(state.movies.list_watch_later(&user_id, page).await?))
}
