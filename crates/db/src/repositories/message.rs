use sqlx::{sqlite::SqliteRow, Row};

use tripchat_core::domain::conversation::{ConversationId, Message, MessageId, SenderRole};

use super::codec::{encode_timestamp, parse_timestamp};
use super::{MessageRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMessageRepository {
    pool: DbPool,
}

impl SqlMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for SqlMessageRepository {
    async fn append(&self, message: Message) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_messages (message_id, conversation_id, sender, message, sent_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message.id.as_str())
        .bind(message.conversation_id.as_str())
        .bind(message.sender.as_str())
        .bind(&message.content)
        .bind(encode_timestamp(&message.sent_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT message_id, conversation_id, sender, message, sent_at
             FROM (
                SELECT rowid AS seq, message_id, conversation_id, sender, message, sent_at
                FROM chat_messages
                WHERE conversation_id = ?
                ORDER BY sent_at DESC, seq DESC
                LIMIT ?
             )
             ORDER BY sent_at ASC, seq ASC",
        )
        .bind(conversation_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }

    async fn list_all(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT message_id, conversation_id, sender, message, sent_at
             FROM chat_messages
             WHERE conversation_id = ?
             ORDER BY sent_at ASC, rowid ASC",
        )
        .bind(conversation_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(message_from_row).collect()
    }
}

fn message_from_row(row: SqliteRow) -> Result<Message, RepositoryError> {
    let sender_raw = row.try_get::<String, _>("sender")?;
    let sender = SenderRole::parse(&sender_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown sender role `{sender_raw}`")))?;

    Ok(Message {
        id: MessageId(row.try_get("message_id")?),
        conversation_id: ConversationId(row.try_get("conversation_id")?),
        sender,
        content: row.try_get("message")?,
        sent_at: parse_timestamp("sent_at", row.try_get("sent_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use tripchat_core::domain::conversation::{Conversation, Message, SenderRole};

    use super::SqlMessageRepository;
    use crate::repositories::{ConversationRepository, MessageRepository, SqlConversationRepository};
    use crate::test_support::{insert_user, setup_pool};

    #[tokio::test]
    async fn list_recent_keeps_newest_window_oldest_first() {
        let pool = setup_pool().await;
        let user = insert_user(&pool, "ines").await;
        let conversation = Conversation::new(user.id.clone(), Utc::now());
        SqlConversationRepository::new(pool.clone())
            .create(conversation.clone())
            .await
            .expect("conversation");
        let repo = SqlMessageRepository::new(pool.clone());

        let start = Utc::now();
        for index in 0..12 {
            let sender = if index % 2 == 0 { SenderRole::User } else { SenderRole::Assistant };
            let sent_at = start + Duration::seconds(index);
            repo.append(Message::new(conversation.id.clone(), sender, format!("m{index}"), sent_at))
                .await
                .expect("append");
        }

        let recent = repo.list_recent(&conversation.id, 10).await.expect("recent");
        let bodies: Vec<&str> = recent.iter().map(|message| message.content.as_str()).collect();
        assert_eq!(bodies, vec!["m2", "m3", "m4", "m5", "m6", "m7", "m8", "m9", "m10", "m11"]);

        assert_eq!(repo.list_all(&conversation.id).await.expect("all").len(), 12);
        pool.close().await;
    }

    #[tokio::test]
    async fn same_timestamp_messages_keep_insertion_order() {
        let pool = setup_pool().await;
        let user = insert_user(&pool, "yusuf").await;
        let conversation = Conversation::new(user.id.clone(), Utc::now());
        SqlConversationRepository::new(pool.clone())
            .create(conversation.clone())
            .await
            .expect("conversation");
        let repo = SqlMessageRepository::new(pool.clone());

        let now = Utc::now();
        repo.append(Message::new(conversation.id.clone(), SenderRole::User, "question", now))
            .await
            .expect("user message");
        repo.append(Message::new(conversation.id.clone(), SenderRole::Assistant, "answer", now))
            .await
            .expect("assistant message");

        let all = repo.list_all(&conversation.id).await.expect("all");
        assert_eq!(all[0].sender, SenderRole::User);
        assert_eq!(all[1].sender, SenderRole::Assistant);
        pool.close().await;
    }
}
