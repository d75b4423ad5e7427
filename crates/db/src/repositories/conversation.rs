use sqlx::{sqlite::SqliteRow, Row};

use tripchat_core::domain::conversation::{Conversation, ConversationId};
use tripchat_core::domain::trip::TripId;
use tripchat_core::domain::user::UserId;

use super::codec::{encode_timestamp, parse_timestamp};
use super::{ConversationRepository, RepositoryError};
use crate::DbPool;

const CONVERSATION_COLUMNS: &str =
    "conversation_id, user_id, trip_id, conversation_title, created_at";

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE conversation_id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(conversation_from_row).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE user_id = ?
             ORDER BY created_at DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(conversation_from_row).collect()
    }

    async fn create(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO conversations (
                conversation_id,
                user_id,
                trip_id,
                conversation_title,
                created_at
             ) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(conversation.id.as_str())
        .bind(conversation.user_id.as_str())
        .bind(conversation.trip_id.as_ref().map(TripId::as_str))
        .bind(conversation.title.as_deref())
        .bind(encode_timestamp(&conversation.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn link_trip(
        &self,
        id: &ConversationId,
        trip_id: &TripId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET trip_id = ? WHERE conversation_id = ?")
            .bind(trip_id.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("conversation", id));
        }
        Ok(())
    }

    async fn set_title(&self, id: &ConversationId, title: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE conversations SET conversation_title = ? WHERE conversation_id = ?")
                .bind(title)
                .bind(id.as_str())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("conversation", id));
        }
        Ok(())
    }

    async fn delete_cascade(&self, id: &ConversationId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let linked_trip: Option<Option<String>> =
            sqlx::query_scalar("SELECT trip_id FROM conversations WHERE conversation_id = ?")
                .bind(id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(linked_trip) = linked_trip else {
            tx.rollback().await?;
            return Ok(false);
        };

        let messages = sqlx::query("DELETE FROM chat_messages WHERE conversation_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM conversations WHERE conversation_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        let mut events = 0;
        if let Some(trip_id) = &linked_trip {
            events = sqlx::query("DELETE FROM events WHERE trip_id = ?")
                .bind(trip_id.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();
            sqlx::query("UPDATE conversations SET trip_id = NULL WHERE trip_id = ?")
                .bind(trip_id.as_str())
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM trips WHERE trip_id = ?")
                .bind(trip_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            event_name = "store.conversation.cascade_deleted",
            conversation_id = %id,
            trip_id = linked_trip.as_deref().unwrap_or(""),
            messages,
            events,
            "conversation removed with its messages and trip"
        );
        Ok(true)
    }
}

fn conversation_from_row(row: SqliteRow) -> Result<Conversation, RepositoryError> {
    Ok(Conversation {
        id: ConversationId(row.try_get("conversation_id")?),
        user_id: UserId(row.try_get("user_id")?),
        trip_id: row.try_get::<Option<String>, _>("trip_id")?.map(TripId),
        title: row.try_get("conversation_title")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
