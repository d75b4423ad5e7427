use sqlx::{sqlite::SqliteRow, Row};

use tripchat_core::domain::event::{Event, EventId, EventType};
use tripchat_core::domain::trip::TripId;
use tripchat_core::domain::user::UserId;

use super::codec::{
    encode_date, encode_time, encode_timestamp, parse_date, parse_optional_decimal, parse_time,
    parse_timestamp,
};
use super::{EventRepository, RepositoryError};
use crate::DbPool;

const EVENT_COLUMNS: &str = "event_id, trip_id, user_id, event_name, event_type,
    event_start_date, event_end_date, event_start_time, event_end_time,
    event_description, event_location, event_cost, event_currency, created_at";

pub struct SqlEventRepository {
    pool: DbPool,
}

impl SqlEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EventRepository for SqlEventRepository {
    async fn find_by_id(&self, id: &EventId) -> Result<Option<Event>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(event_from_row).transpose()
    }

    async fn list_for_trip(&self, trip_id: &TripId) -> Result<Vec<Event>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE trip_id = ?
             ORDER BY event_start_date ASC, event_start_time ASC, created_at ASC"
        ))
        .bind(trip_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Event>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE user_id = ?
             ORDER BY event_start_date ASC, event_start_time ASC, created_at ASC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }

    async fn create(&self, event: Event) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO events (
                event_id,
                trip_id,
                user_id,
                event_name,
                event_type,
                event_start_date,
                event_end_date,
                event_start_time,
                event_end_time,
                event_description,
                event_location,
                event_cost,
                event_currency,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.as_str())
        .bind(event.trip_id.as_str())
        .bind(event.user_id.as_str())
        .bind(&event.name)
        .bind(event.event_type.as_str())
        .bind(encode_date(&event.start_date))
        .bind(encode_date(&event.end_date))
        .bind(encode_time(&event.start_time))
        .bind(encode_time(&event.end_time))
        .bind(event.description.as_deref())
        .bind(event.location.as_deref())
        .bind(event.cost.map(|cost| cost.to_string()))
        .bind(event.currency.as_deref())
        .bind(encode_timestamp(&event.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, event: &Event) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE events SET
                event_name = ?,
                event_type = ?,
                event_start_date = ?,
                event_end_date = ?,
                event_start_time = ?,
                event_end_time = ?,
                event_description = ?,
                event_location = ?,
                event_cost = ?,
                event_currency = ?
             WHERE event_id = ?",
        )
        .bind(&event.name)
        .bind(event.event_type.as_str())
        .bind(encode_date(&event.start_date))
        .bind(encode_date(&event.end_date))
        .bind(encode_time(&event.start_time))
        .bind(encode_time(&event.end_time))
        .bind(event.description.as_deref())
        .bind(event.location.as_deref())
        .bind(event.cost.map(|cost| cost.to_string()))
        .bind(event.currency.as_deref())
        .bind(event.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("event", &event.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &EventId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM events WHERE event_id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn event_from_row(row: SqliteRow) -> Result<Event, RepositoryError> {
    let type_raw = row.try_get::<String, _>("event_type")?;
    let event_type = EventType::parse(&type_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown event type `{type_raw}`")))?;

    Ok(Event {
        id: EventId(row.try_get("event_id")?),
        trip_id: TripId(row.try_get("trip_id")?),
        user_id: UserId(row.try_get("user_id")?),
        name: row.try_get("event_name")?,
        event_type,
        start_date: parse_date("event_start_date", row.try_get("event_start_date")?)?,
        end_date: parse_date("event_end_date", row.try_get("event_end_date")?)?,
        start_time: parse_time("event_start_time", row.try_get("event_start_time")?)?,
        end_time: parse_time("event_end_time", row.try_get("event_end_time")?)?,
        description: row.try_get("event_description")?,
        location: row.try_get("event_location")?,
        cost: parse_optional_decimal("event_cost", row.try_get("event_cost")?)?,
        currency: row.try_get("event_currency")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
