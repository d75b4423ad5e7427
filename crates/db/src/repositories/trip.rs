use sqlx::{sqlite::SqliteRow, Row};

use tripchat_core::domain::trip::{Trip, TripId};
use tripchat_core::domain::user::UserId;

use super::codec::{encode_date, encode_timestamp, parse_date, parse_timestamp};
use super::{RepositoryError, TripRepository};
use crate::DbPool;

const TRIP_COLUMNS: &str =
    "trip_id, user_id, trip_name, trip_destination, trip_start_date, trip_end_date, created_at";

pub struct SqlTripRepository {
    pool: DbPool,
}

impl SqlTripRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TripRepository for SqlTripRepository {
    async fn find_by_id(&self, id: &TripId) -> Result<Option<Trip>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE trip_id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(trip_from_row).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Trip>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips
             WHERE user_id = ?
             ORDER BY trip_start_date ASC, created_at ASC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(trip_from_row).collect()
    }

    async fn create(&self, trip: Trip) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO trips (
                trip_id,
                user_id,
                trip_name,
                trip_destination,
                trip_start_date,
                trip_end_date,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(trip.id.as_str())
        .bind(trip.user_id.as_str())
        .bind(&trip.name)
        .bind(&trip.destination)
        .bind(encode_date(&trip.start_date))
        .bind(encode_date(&trip.end_date))
        .bind(encode_timestamp(&trip.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, trip: &Trip) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE trips SET
                trip_name = ?,
                trip_destination = ?,
                trip_start_date = ?,
                trip_end_date = ?
             WHERE trip_id = ?",
        )
        .bind(&trip.name)
        .bind(&trip.destination)
        .bind(encode_date(&trip.start_date))
        .bind(encode_date(&trip.end_date))
        .bind(trip.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("trip", &trip.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &TripId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let events = sqlx::query("DELETE FROM events WHERE trip_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("UPDATE conversations SET trip_id = NULL WHERE trip_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        let result =
            sqlx::query("DELETE FROM trips WHERE trip_id = ?").bind(id.as_str()).execute(&mut *tx).await?;

        tx.commit().await?;
        let existed = result.rows_affected() > 0;
        if existed {
            tracing::debug!(
                event_name = "store.trip.cascade_deleted",
                trip_id = %id,
                events,
                "trip removed with its events"
            );
        }
        Ok(existed)
    }
}

pub(crate) fn trip_from_row(row: SqliteRow) -> Result<Trip, RepositoryError> {
    Ok(Trip {
        id: TripId(row.try_get("trip_id")?),
        user_id: UserId(row.try_get("user_id")?),
        name: row.try_get("trip_name")?,
        destination: row.try_get("trip_destination")?,
        start_date: parse_date("trip_start_date", row.try_get("trip_start_date")?)?,
        end_date: parse_date("trip_end_date", row.try_get("trip_end_date")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
