use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, info};

use crate::{
    catalog::Operation,
    error::{AppError, AppResult, StoreError},
    models::{
        Favorite, Movie, MovieCredits, MoviePage, NewFavorite, NewWatchLater, Page, PageRequest,
        WatchLater,
    },
    resilience::{CircuitState, ResilientCatalog},
    store::LibraryStore,
};

pub const MAX_FAVORITES: u64 = 20;

/// The movie use cases: provider lookups merged with the caller's local lists.
///
/// `user_id` always comes from the access boundary and is trusted as-is.
#[derive(Clone)]
pub struct MovieService {
    catalog: Arc<ResilientCatalog>,
    store: LibraryStore,
}

impl MovieService {
    pub fn new(catalog: Arc<ResilientCatalog>, store: LibraryStore) -> Self {
        Self { catalog, store }
    }

    pub fn circuit_states(&self) -> BTreeMap<&'static str, CircuitState> {
        Operation::ALL.into_iter().map(|op| (op.as_str(), self.catalog.circuit_state(op))).collect()
    }

    /// Provider results as-is; list items are not enriched with local flags.
    pub async fn search_movies(&self, query: &str, page: u32, user_id: &str) -> MoviePage {
        debug!(%query, page, %user_id, "searching movies");
        self.catalog.search_movies(query, page).await
    }

    pub async fn movie_details(&self, movie_id: i64, user_id: &str) -> AppResult<Movie> {
        let mut movie = self.catalog.movie_details(movie_id).await?;

        let (favorite, watch_later) = futures::try_join!(
            self.store.exists_favorite(movie_id, user_id),
            self.store.exists_watch_later(movie_id, user_id),
        )?;
        movie.favorite = favorite;
        movie.watch_later = watch_later;
        Ok(movie)
    }

    pub async fn popular_movies(&self, page: u32, user_id: &str) -> MoviePage {
        debug!(page, %user_id, "listing popular movies");
        self.catalog.popular_movies(page).await
    }

    pub async fn movie_credits(&self, movie_id: i64) -> AppResult<MovieCredits> {
        Ok(self.catalog.movie_credits(movie_id).await?)
    }

    /// Both business checks run before the provider is contacted.
    ///
    /// An add that loses a race to a concurrent one for the same pair is
    /// `AlreadyFavorited`; one that loses the last free slot is `MaxFavoritesExceeded`.
    pub async fn add_favorite(&self, movie_id: i64, user_id: &str) -> AppResult<Favorite> {
        info!(movie_id, %user_id, "adding favorite");

        if self.store.exists_favorite(movie_id, user_id).await? {
            return Err(AppError::AlreadyFavorited(movie_id));
        }
        if self.store.count_favorites(user_id).await? >= MAX_FAVORITES {
            return Err(AppError::MaxFavoritesExceeded(MAX_FAVORITES));
        }

        let movie = self.catalog.movie_details(movie_id).await?;

        // both checks are repeated by the insert for adds racing past the ones above
        let snapshot = NewFavorite::from_movie(&movie, user_id);
        match self.store.save_favorite(snapshot, MAX_FAVORITES).await {
            Ok(saved) => Ok(saved),
            Err(StoreError::Duplicate) => Err(AppError::AlreadyFavorited(movie_id)),
            Err(StoreError::LimitReached) => Err(AppError::MaxFavoritesExceeded(MAX_FAVORITES)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn remove_favorite(&self, movie_id: i64, user_id: &str) -> AppResult<()> {
        info!(movie_id, %user_id, "removing favorite");
        self.store.delete_favorite(movie_id, user_id).await?;
        Ok(())
    }

    pub async fn list_favorites(&self, user_id: &str, page: PageRequest) -> AppResult<Page<Favorite>> {
        Ok(self.store.list_favorites(user_id, page).await?)
    }

    /// Idempotent: an existing entry is returned without calling the provider.
    pub async fn add_watch_later(&self, movie_id: i64, user_id: &str) -> AppResult<WatchLater> {
        info!(movie_id, %user_id, "adding to watch later");

        if let Some(existing) = self.store.find_watch_later(movie_id, user_id).await? {
            debug!(movie_id, %user_id, "already in watch later");
            return Ok(existing);
        }

        let movie = self.catalog.movie_details(movie_id).await?;

        match self.store.save_watch_later(NewWatchLater::from_movie(&movie, user_id)).await {
            Ok(saved) => Ok(saved),
            Err(StoreError::Duplicate) => self
                .store
                .find_watch_later(movie_id, user_id)
                .await?
                .ok_or(AppError::Store(StoreError::Duplicate)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn remove_watch_later(&self, movie_id: i64, user_id: &str) -> AppResult<()> {
        info!(movie_id, %user_id, "removing from watch later");
        self.store.delete_watch_later(movie_id, user_id).await?;
        Ok(())
    }

    pub async fn list_watch_later(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> AppResult<Page<WatchLater>> {
        Ok(self.store.list_watch_later(user_id, page).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        error::CatalogError,
        resilience::{ResilienceSettings, RetryPolicy},
        testing::{StubCatalog, memory_store, movie},
    };

    async fn service() -> (MovieService, Arc<StubCatalog>) {
        let stub = Arc::new(StubCatalog::new());
        let settings = ResilienceSettings {
            retry: RetryPolicy {
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(5),
                ..RetryPolicy::default()
            },
            attempt_timeout: Duration::from_secs(1),
            ..ResilienceSettings::default()
        };
        let catalog = Arc::new(ResilientCatalog::new(stub.clone(), settings));
        (MovieService::new(catalog, memory_store().await), stub)
    }

    #[tokio::test]
    async fn favoriting_stores_a_snapshot() {
        let (service, stub) = service().await;
        stub.add_movie(movie(42, "Matrix"));

        let fav = service.add_favorite(42, "u1").await.unwrap();

        assert_eq!((fav.movie_id, fav.user_id.as_str(), fav.title.as_str()), (42, "u1", "Matrix"));
        assert_eq!(fav.poster_path.as_deref(), Some("/42.jpg"));
        assert_eq!(fav.vote_average, Some(8.2));
        assert_eq!(service.store.count_favorites("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn twenty_first_favorite_is_rejected_without_calling_the_provider() {
        let (service, stub) = service().await;
        for id in 1..=20 {
            stub.add_movie(movie(id, &format!("Movie {id}")));
            service.add_favorite(id, "u1").await.unwrap();
        }
        stub.add_movie(movie(99, "One Too Many"));
        let calls = stub.total_calls();

        let err = service.add_favorite(99, "u1").await.unwrap_err();

        assert!(matches!(err, AppError::MaxFavoritesExceeded(20)), "{err:?}");
        assert_eq!(service.store.count_favorites("u1").await.unwrap(), 20);
        assert_eq!(stub.total_calls(), calls);

        // the cap is per user
        service.add_favorite(99, "u2").await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_favorite_is_rejected() {
        let (service, stub) = service().await;
        stub.add_movie(movie(42, "Matrix"));
        service.add_favorite(42, "u1").await.unwrap();
        let calls = stub.calls(Operation::Details);

        let err = service.add_favorite(42, "u1").await.unwrap_err();

        assert!(matches!(err, AppError::AlreadyFavorited(42)), "{err:?}");
        assert_eq!(service.store.count_favorites("u1").await.unwrap(), 1);
        assert_eq!(stub.calls(Operation::Details), calls);
    }

    #[tokio::test]
    async fn favoriting_an_unknown_movie_propagates_not_found() {
        let (service, _stub) = service().await;

        let err = service.add_favorite(404, "u1").await.unwrap_err();

        assert!(matches!(err, AppError::Catalog(CatalogError::MovieNotFound(404))), "{err:?}");
        assert_eq!(service.store.count_favorites("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn favoriting_while_provider_is_down_is_unavailable() {
        let (service, stub) = service().await;
        stub.fail_with(CatalogError::Provider("down".into()));

        let err = service.add_favorite(42, "u1").await.unwrap_err();

        assert!(matches!(err, AppError::Catalog(CatalogError::Unavailable)), "{err:?}");
        assert_eq!(service.store.count_favorites("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn removing_an_absent_favorite_is_a_no_op() {
        let (service, stub) = service().await;
        stub.add_movie(movie(1, "One"));
        service.add_favorite(1, "u1").await.unwrap();

        service.remove_favorite(2, "u1").await.unwrap();
        assert_eq!(service.store.count_favorites("u1").await.unwrap(), 1);

        service.remove_favorite(1, "u1").await.unwrap();
        service.remove_favorite(1, "u1").await.unwrap();
        assert_eq!(service.store.count_favorites("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn watch_later_is_idempotent() {
        let (service, stub) = service().await;
        stub.add_movie(movie(7, "Seven"));

        let first = service.add_watch_later(7, "u1").await.unwrap();
        let second = service.add_watch_later(7, "u1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(stub.calls(Operation::Details), 1);
        let page = service.list_watch_later("u1", PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 1);

        service.remove_watch_later(7, "u1").await.unwrap();
        service.remove_watch_later(7, "u1").await.unwrap();
        assert!(!service.store.exists_watch_later(7, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn details_are_enriched_with_the_callers_flags() {
        let (service, stub) = service().await;
        stub.add_movie(movie(42, "Matrix"));

        let plain = service.movie_details(42, "u1").await.unwrap();
        assert!(!plain.favorite && !plain.watch_later);

        service.add_favorite(42, "u1").await.unwrap();
        service.add_watch_later(42, "u1").await.unwrap();

        let mine = service.movie_details(42, "u1").await.unwrap();
        assert!(mine.favorite && mine.watch_later);

        let theirs = service.movie_details(42, "u2").await.unwrap();
        assert!(!theirs.favorite && !theirs.watch_later);
    }

    #[tokio::test]
    async fn details_of_an_unknown_movie_are_not_found() {
        let (service, _stub) = service().await;
        let err = service.movie_details(5, "u1").await.unwrap_err();
        assert!(matches!(err, AppError::Catalog(CatalogError::MovieNotFound(5))), "{err:?}");
    }

    #[tokio::test]
    async fn lists_are_passed_through_unenriched() {
        let (service, stub) = service().await;
        stub.add_movie(movie(1, "Matrix"));
        service.add_favorite(1, "u1").await.unwrap();

        let found = service.search_movies("Matrix", 1, "u1").await;
        assert_eq!(found.movies.len(), 1);
        assert!(!found.movies[0].favorite);

        let popular = service.popular_movies(1, "u1").await;
        assert!(!popular.movies[0].favorite);
        service.popular_movies(1, "u1").await;
        assert_eq!(stub.calls(Operation::Popular), 1);
    }

    #[tokio::test]
    async fn favorites_are_listed_newest_first() {
        let (service, stub) = service().await;
        for id in 1..=3 {
            stub.add_movie(movie(id, &format!("Movie {id}")));
            service.add_favorite(id, "u1").await.unwrap();
        }

        let page = service.list_favorites("u1", PageRequest::new(0, 2)).await.unwrap();
        assert_eq!(page.content.iter().map(|f| f.movie_id).collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn credits_pass_through() {
        let (service, stub) = service().await;
        stub.add_movie(movie(42, "Matrix"));

        assert_eq!(service.movie_credits(42).await.unwrap().movie_id, 42);
        let err = service.movie_credits(43).await.unwrap_err();
        assert!(matches!(err, AppError::Catalog(CatalogError::MovieNotFound(43))), "{err:?}");
    }

    #[tokio::test]
    async fn concurrent_adds_cannot_exceed_the_cap() {
        let (service, stub) = service().await;
        for id in 1..=19 {
            stub.add_movie(movie(id, &format!("Movie {id}")));
            service.add_favorite(id, "u1").await.unwrap();
        }
        stub.add_movie(movie(20, "Twenty"));
        stub.add_movie(movie(21, "Twenty-one"));
        stub.set_delay(Duration::from_millis(50));

        let (a, b) = tokio::join!(service.add_favorite(20, "u1"), service.add_favorite(21, "u1"));

        let refused = [&a, &b]
            .into_iter()
            .filter(|r| matches!(r, Err(AppError::MaxFavoritesExceeded(20))))
            .count();
        assert_eq!(refused, 1, "{a:?} {b:?}");
        assert!(a.is_ok() || b.is_ok());
        assert_eq!(service.store.count_favorites("u1").await.unwrap(), 20);
    }

    #[tokio::test]
    async fn racing_favorites_of_one_pair_keep_a_single_row() {
        let (service, stub) = service().await;
        stub.add_movie(movie(7, "Seven"));
        stub.set_delay(Duration::from_millis(50));

        let (a, b) = tokio::join!(service.add_favorite(7, "u1"), service.add_favorite(7, "u1"));

        let (won, lost) = if a.is_ok() { (a, b) } else { (b, a) };
        assert_eq!(won.unwrap().movie_id, 7);
        assert!(matches!(lost, Err(AppError::AlreadyFavorited(7))), "{lost:?}");
        assert_eq!(service.store.count_favorites("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn racing_watch_later_adds_return_the_same_row() {
        let (service, stub) = service().await;
        stub.add_movie(movie(7, "Seven"));
        stub.set_delay(Duration::from_millis(50));

        let (a, b) =
            tokio::join!(service.add_watch_later(7, "u1"), service.add_watch_later(7, "u1"));

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id, b.id);
        assert_eq!(stub.calls(Operation::Details), 2);
        let page = service.list_watch_later("u1", PageRequest::default()).await.unwrap();
        assert_eq!(page.total_elements, 1);
    }
}
