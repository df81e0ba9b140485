use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Games::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Games::Id).string().not_null().primary_key())
                    // Grid, turn order, seats and goal are JSON documents
                    .col(ColumnDef::new(Games::Grid).text().not_null())
                    .col(ColumnDef::new(Games::Turn).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Games::Phase)
                            .string()
                            .not_null()
                            .default("waiting"),
                    )
                    .col(ColumnDef::new(Games::CurrentPlayer).string().not_null())
                    .col(ColumnDef::new(Games::TurnOrder).text().not_null())
                    .col(ColumnDef::new(Games::Seats).text().not_null())
                    .col(ColumnDef::new(Games::Goal).text().not_null())
                    .col(ColumnDef::new(Games::Winner).string().null())
                    .col(
                        ColumnDef::new(Games::Revision)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Games::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Players::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Players::GameId).string().not_null())
                    .col(ColumnDef::new(Players::Color).string().not_null())
                    .col(
                        ColumnDef::new(Players::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Players::LastSeen)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_players_game_id")
                            .from(Players::Table, Players::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Players are always listed per game
        manager
            .create_index(
                Index::create()
                    .name("idx_players_game_id")
                    .table(Players::Table)
                    .col(Players::GameId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Players::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Games::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Games {
    Table,
    Id,
    Grid,
    Turn,
    Phase,
    CurrentPlayer,
    TurnOrder,
    Seats,
    Goal,
    Winner,
    Revision,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Players {
    Table,
    Id,
    GameId,
    Color,
    JoinedAt,
    LastSeen,
}
