use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, Statement,
};

use crate::{
    entities::{favorite, watch_later},
    error::StoreError,
    models::{Favorite, NewFavorite, NewWatchLater, Page, PageRequest, WatchLater},
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Per-user favorites and watch-later lists.
///
/// Writes are single statements. Duplicate pairs are rejected by the
/// unique `(movie_id, user_id)` indexes and surface as [`StoreError::Duplicate`].
/// The favorites cap is checked by the insert itself, see [`LibraryStore::save_favorite`].
#[derive(Clone)]
pub struct LibraryStore {
    db: DatabaseConnection,
}

impl LibraryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts only while the user holds fewer than `limit` favorites.
    ///
    /// Count and insert run as one statement, so concurrent adds cannot push a
    /// user past the limit. A refused insert is [`StoreError::LimitReached`].
    pub async fn save_favorite(&self, snapshot: NewFavorite, limit: u64) -> StoreResult<Favorite> {
        let stmt = Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"INSERT INTO favorites
                   (movie_id, user_id, title, poster_path, overview, vote_average, created_at)
               SELECT ?, ?, ?, ?, ?, ?, ?
               WHERE (SELECT COUNT(*) FROM favorites WHERE user_id = ?) < ?"#,
            [
                snapshot.movie_id.into(),
                snapshot.user_id.clone().into(),
                snapshot.title.into(),
                snapshot.poster_path.into(),
                snapshot.overview.into(),
                snapshot.vote_average.into(),
                now_millis().into(),
                snapshot.user_id.clone().into(),
                i64::try_from(limit).unwrap_or(i64::MAX).into(),
            ],
        );

        let res = self.db.execute(stmt).await.map_err(classify)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::LimitReached);
        }

        self.find_favorite(snapshot.movie_id, &snapshot.user_id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("favorite vanished after insert".into()).into())
    }

    pub async fn find_favorite(&self, movie_id: i64, user_id: &str) -> StoreResult<Option<Favorite>> {
        let row = favorite::Entity::find()
            .filter(favorite::Column::MovieId.eq(movie_id))
            .filter(favorite::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(row.map(Favorite::from))
    }

    /// Newest first.
    pub async fn list_favorites(&self, user_id: &str, req: PageRequest) -> StoreResult<Page<Favorite>> {
        let req = req.clamped();
        let paginator = favorite::Entity::find()
            .filter(favorite::Column::UserId.eq(user_id))
            .order_by_desc(favorite::Column::CreatedAt)
            .order_by_desc(favorite::Column::Id)
            .paginate(&self.db, req.size);

        let totals = paginator.num_items_and_pages().await?;
        // past the last page there is nothing to fetch; offset math would overflow
        let rows = if req.page < totals.number_of_pages {
            paginator.fetch_page(req.page).await?
        } else {
            Vec::new()
        };

        Ok(Page {
            content: rows.into_iter().map(Favorite::from).collect(),
            page: req.page,
            size: req.size,
            total_elements: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    /// No-op when the pair is absent.
    pub async fn delete_favorite(&self, movie_id: i64, user_id: &str) -> StoreResult<()> {
        let res = favorite::Entity::delete_many()
            .filter(favorite::Column::MovieId.eq(movie_id))
            .filter(favorite::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        tracing::debug!(movie_id, %user_id, rows = res.rows_affected, "deleted favorite");
        Ok(())
    }

    pub async fn count_favorites(&self, user_id: &str) -> StoreResult<u64> {
        let count = favorite::Entity::find()
            .filter(favorite::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn exists_favorite(&self, movie_id: i64, user_id: &str) -> StoreResult<bool> {
        let count = favorite::Entity::find()
            .filter(favorite::Column::MovieId.eq(movie_id))
            .filter(favorite::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn save_watch_later(&self, snapshot: NewWatchLater) -> StoreResult<WatchLater> {
        let model = watch_later::ActiveModel {
            movie_id: Set(snapshot.movie_id),
            user_id: Set(snapshot.user_id),
            title: Set(snapshot.title),
            poster_path: Set(snapshot.poster_path),
            created_at: Set(now_millis()),
            ..Default::default()
        };

        let row = model.insert(&self.db).await.map_err(classify)?;
        Ok(row.into())
    }

    pub async fn find_watch_later(
        &self,
        movie_id: i64,
        user_id: &str,
    ) -> StoreResult<Option<WatchLater>> {
        let row = watch_later::Entity::find()
            .filter(watch_later::Column::MovieId.eq(movie_id))
            .filter(watch_later::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(row.map(WatchLater::from))
    }

    pub async fn list_watch_later(
        &self,
        user_id: &str,
        req: PageRequest,
    ) -> StoreResult<Page<WatchLater>> {
        let req = req.clamped();
        let paginator = watch_later::Entity::find()
            .filter(watch_later::Column::UserId.eq(user_id))
            .order_by_desc(watch_later::Column::CreatedAt)
            .order_by_desc(watch_later::Column::Id)
            .paginate(&self.db, req.size);

        let totals = paginator.num_items_and_pages().await?;
        // past the last page there is nothing to fetch; offset math would overflow
        let rows = if req.page < totals.number_of_pages {
            paginator.fetch_page(req.page).await?
        } else {
            Vec::new()
        };

        Ok(Page {
            content: rows.into_iter().map(WatchLater::from).collect(),
            page: req.page,
            size: req.size,
            total_elements: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    pub async fn delete_watch_later(&self, movie_id: i64, user_id: &str) -> StoreResult<()> {
        let res = watch_later::Entity::delete_many()
            .filter(watch_later::Column::MovieId.eq(movie_id))
            .filter(watch_later::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        tracing::debug!(movie_id, %user_id, rows = res.rows_affected, "deleted watch-later entry");
        Ok(())
    }

    pub async fn exists_watch_later(&self, movie_id: i64, user_id: &str) -> StoreResult<bool> {
        let count = watch_later::Entity::find()
            .filter(watch_later::Column::MovieId.eq(movie_id))
            .filter(watch_later::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}

fn classify(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::Duplicate,
        _ => StoreError::Database(err),
    }
}

fn now_millis() -> i64 {
    jiff::Timestamp::now().as_millisecond()
}
