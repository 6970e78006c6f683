use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WatchLater::Table)
                    .if_not_exists()
                    .col(pk_auto(WatchLater::Id))
                    .col(big_integer(WatchLater::MovieId))
                    .col(string(WatchLater::UserId))
                    .col(string_len(WatchLater::Title, 500))
                    .col(string_len_null(WatchLater::PosterPath, 500))
                    .col(big_integer(WatchLater::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_watch_later_movie_user_unique")
                    .table(WatchLater::Table)
                    .col(WatchLater::MovieId)
                    .col(WatchLater::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_watch_later_user_created_at")
                    .table(WatchLater::Table)
                    .col(WatchLater::UserId)
                    .col(WatchLater::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(WatchLater::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum WatchLater {
    Table,
    Id,
    MovieId,
    UserId,
    Title,
    PosterPath,
    CreatedAt,
}
