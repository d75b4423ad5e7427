use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id;
use super::trip::TripId;
use super::user::UserId;

record_id!(ConversationId);
record_id!(MessageId);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "conversation_id")]
    pub id: ConversationId,
    pub user_id: UserId,
    pub trip_id: Option<TripId>,
    #[serde(rename = "conversation_title")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self { id: ConversationId::generate(), user_id, trip_id: None, title: None, created_at: now }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Assistant,
}

impl SenderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "message_id")]
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: SenderRole,
    #[serde(rename = "message")]
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// One prior turn as it is replayed to the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: SenderRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        conversation_id: ConversationId,
        sender: SenderRole,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            sender,
            content: content.into(),
            sent_at: now,
        }
    }

    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry { role: self.sender, content: self.content.clone(), timestamp: self.sent_at }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{ConversationId, Message, SenderRole};

    #[test]
    fn history_entry_uses_lowercase_role() {
        let message =
            Message::new(ConversationId::from("c-1"), SenderRole::Assistant, "Done!", Utc::now());
        let value = serde_json::to_value(message.to_history()).expect("serialize history");

        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"], "Done!");
    }

    #[test]
    fn sender_role_round_trips_through_str() {
        assert_eq!(SenderRole::parse(SenderRole::User.as_str()), Some(SenderRole::User));
        assert_eq!(SenderRole::parse("system"), None);
    }
}
