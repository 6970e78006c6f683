use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use thiserror::Error;

/// Failures talking to the movie provider.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CatalogError {
    /// Transient or unexpected provider failure: non-2xx, bad payload, timeout.
    #[error("provider request failed: {0}")]
    Provider(String),
    /// The provider answered that the movie does not exist.
    #[error("movie not found with id {0}")]
    MovieNotFound(i64),
    /// Circuit open or retries exhausted.
    #[error("movie provider is unavailable")]
    Unavailable,
}

impl CatalogError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, CatalogError::MovieNotFound(_))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        Self::Provider(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,
    #[error("list limit reached")]
    LimitReached,
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("movie {0} is already in favorites")]
    AlreadyFavorited(i64),
    #[error("favorites limit of {0} reached")]
    MaxFavoritesExceeded(u64),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        Self::Store(StoreError::Database(err))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Catalog(CatalogError::MovieNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Catalog(CatalogError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Catalog(CatalogError::Provider(_)) => StatusCode::BAD_GATEWAY,
            AppError::AlreadyFavorited(_) => StatusCode::CONFLICT,
            AppError::MaxFavoritesExceeded(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = serde_json::json!({
            "type": "about:blank",
            "title": status.canonical_reason().unwrap_or("Error"),
            "status": status.as_u16(),
            "detail": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
