//! `PostgreSQL` implementation of the `GameReadStore` trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use games_catalog::application::read_store::{
    GameReadStore, GameRecord, InsertOutcome, UpdateOutcome,
};
use games_catalog::domain::attributes::NaturalKey;
use games_catalog::domain::genre::Genre;
use games_core::error::DomainError;

const SELECT_COLUMNS: &str =
    "SELECT game_id, title, price, launch_year, developer, genre, version FROM games_read_model";

/// PostgreSQL-backed read store.
#[derive(Debug, Clone)]
pub struct PgGameReadStore {
    pool: PgPool,
}

impl PgGameReadStore {
    /// Creates a new `PgGameReadStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("read store: {err}"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn record_from_row(row: &PgRow) -> Result<GameRecord, DomainError> {
    let genre: String = row.try_get("genre").map_err(infrastructure)?;
    Ok(GameRecord {
        game_id: row.try_get("game_id").map_err(infrastructure)?,
        title: row.try_get("title").map_err(infrastructure)?,
        price: row.try_get("price").map_err(infrastructure)?,
        launch_year: row.try_get("launch_year").map_err(infrastructure)?,
        developer: row.try_get("developer").map_err(infrastructure)?,
        genre: genre
            .parse::<Genre>()
            .map_err(|e| DomainError::Infrastructure(format!("read store: {e}")))?,
        version: row.try_get("version").map_err(infrastructure)?,
    })
}

/// Serializes writers of one game until the transaction ends.
async fn lock_game(
    tx: &mut Transaction<'_, Postgres>,
    game_id: Uuid,
) -> Result<(), DomainError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(game_id)
        .execute(&mut **tx)
        .await
        .map_err(infrastructure)?;
    Ok(())
}

async fn is_tombstoned(
    tx: &mut Transaction<'_, Postgres>,
    game_id: Uuid,
) -> Result<bool, DomainError> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM games_read_model_tombstones WHERE game_id = $1)",
    )
    .bind(game_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(infrastructure)
}

async fn row_exists(
    tx: &mut Transaction<'_, Postgres>,
    game_id: Uuid,
) -> Result<bool, DomainError> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM games_read_model WHERE game_id = $1)")
        .bind(game_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(infrastructure)
}

#[async_trait]
impl GameReadStore for PgGameReadStore {
    async fn find_by_id(&self, game_id: Uuid) -> Result<Option<GameRecord>, DomainError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE game_id = $1"))
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_by_natural_key(
        &self,
        key: &NaturalKey,
    ) -> Result<Option<GameRecord>, DomainError> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE title = $1 AND developer = $2 AND launch_year = $3"
        ))
        .bind(&key.title)
        .bind(&key.developer)
        .bind(key.launch_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<GameRecord>, DomainError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY title ASC, game_id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        rows.iter().map(record_from_row).collect()
    }

    async fn insert_if_absent(&self, record: &GameRecord) -> Result<InsertOutcome, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        lock_game(&mut tx, record.game_id).await?;
        if is_tombstoned(&mut tx, record.game_id).await? {
            return Ok(InsertOutcome::Tombstoned);
        }

        let inserted = sqlx::query(
            "INSERT INTO games_read_model \
                (game_id, title, price, launch_year, developer, genre, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT DO NOTHING",
        )
        .bind(record.game_id)
        .bind(&record.title)
        .bind(record.price)
        .bind(record.launch_year)
        .bind(&record.developer)
        .bind(record.genre.as_str())
        .bind(record.version)
        .execute(&mut *tx)
        .await
        .map_err(infrastructure)?;

        let outcome = if inserted.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else if row_exists(&mut tx, record.game_id).await? {
            InsertOutcome::AlreadyPresent
        } else {
            InsertOutcome::NaturalKeyTaken
        };
        tx.commit().await.map_err(infrastructure)?;
        debug!(game_id = %record.game_id, ?outcome, "insert_if_absent");
        Ok(outcome)
    }

    async fn update(&self, record: &GameRecord) -> Result<UpdateOutcome, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        lock_game(&mut tx, record.game_id).await?;
        if is_tombstoned(&mut tx, record.game_id).await? {
            return Ok(UpdateOutcome::Stale);
        }

        let updated = sqlx::query(
            "UPDATE games_read_model \
             SET title = $2, price = $3, launch_year = $4, developer = $5, genre = $6, \
                 version = $7, updated_at = NOW() \
             WHERE game_id = $1 AND version < $7",
        )
        .bind(record.game_id)
        .bind(&record.title)
        .bind(record.price)
        .bind(record.launch_year)
        .bind(&record.developer)
        .bind(record.genre.as_str())
        .bind(record.version)
        .execute(&mut *tx)
        .await;

        let outcome = match updated {
            Ok(result) if result.rows_affected() == 1 => UpdateOutcome::Applied,
            Ok(_) => {
                if row_exists(&mut tx, record.game_id).await? {
                    UpdateOutcome::Stale
                } else {
                    UpdateOutcome::Missing
                }
            }
            Err(e) if is_unique_violation(&e) => return Ok(UpdateOutcome::NaturalKeyConflict),
            Err(e) => return Err(infrastructure(e)),
        };
        tx.commit().await.map_err(infrastructure)?;
        debug!(game_id = %record.game_id, ?outcome, "update");
        Ok(outcome)
    }

    async fn remove(&self, game_id: Uuid, version: i64) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        lock_game(&mut tx, game_id).await?;
        sqlx::query(
            "INSERT INTO games_read_model_tombstones (game_id, version) VALUES ($1, $2) \
             ON CONFLICT (game_id) DO UPDATE \
             SET version = GREATEST(games_read_model_tombstones.version, EXCLUDED.version)",
        )
        .bind(game_id)
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(infrastructure)?;

        let deleted = sqlx::query("DELETE FROM games_read_model WHERE game_id = $1")
            .bind(game_id)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;
        tx.commit().await.map_err(infrastructure)?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn replace(&self, record: &GameRecord) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        lock_game(&mut tx, record.game_id).await?;
        sqlx::query("DELETE FROM games_read_model_tombstones WHERE game_id = $1")
            .bind(record.game_id)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;

        let written = sqlx::query(
            "INSERT INTO games_read_model \
                (game_id, title, price, launch_year, developer, genre, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (game_id) DO UPDATE \
             SET title = EXCLUDED.title, price = EXCLUDED.price, \
                 launch_year = EXCLUDED.launch_year, developer = EXCLUDED.developer, \
                 genre = EXCLUDED.genre, version = EXCLUDED.version, updated_at = NOW()",
        )
        .bind(record.game_id)
        .bind(&record.title)
        .bind(record.price)
        .bind(record.launch_year)
        .bind(&record.developer)
        .bind(record.genre.as_str())
        .bind(record.version)
        .execute(&mut *tx)
        .await;

        match written {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(DomainError::DuplicateAggregate(format!(
                    "{} is held by another game",
                    record.natural_key()
                )));
            }
            Err(e) => return Err(infrastructure(e)),
        }
        tx.commit().await.map_err(infrastructure)
    }
    async fn purge(&self, game_id: Uuid) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        lock_game(&mut tx, game_id).await?;
        let deleted = sqlx::query("DELETE FROM games_read_model WHERE game_id = $1")
            .bind(game_id)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;
        tx.commit().await.map_err(infrastructure)?;
        Ok(deleted.rows_affected() > 0)
    }
}
