use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Favorites::Table)
                    .if_not_exists()
                    .col(pk_auto(Favorites::Id))
                    .col(big_integer(Favorites::MovieId))
                    .col(string(Favorites::UserId))
                    .col(string_len(Favorites::Title, 500))
                    .col(string_len_null(Favorites::PosterPath, 500))
                    .col(text_null(Favorites::Overview))
                    .col(double_null(Favorites::VoteAverage))
                    .col(big_integer(Favorites::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Backstop for concurrent adds of the same pair.
        manager
            .create_index(
                Index::create()
                    .name("idx_favorites_movie_user_unique")
                    .table(Favorites::Table)
                    .col(Favorites::MovieId)
                    .col(Favorites::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_favorites_user_created_at")
                    .table(Favorites::Table)
                    .col(Favorites::UserId)
                    .col(Favorites::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Favorites::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Favorites {
    Table,
    Id,
    MovieId,
    UserId,
    Title,
    PosterPath,
    Overview,
    VoteAverage,
    CreatedAt,
}
