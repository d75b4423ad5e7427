use chrono::{DateTime, Utc};

use tripchat_core::domain::conversation::{Conversation, ConversationId};
use tripchat_core::domain::user::UserId;
use tripchat_db::{RepositoryError, Store};

/// How the conversation for a turn was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The requested conversation exists and belongs to the user.
    Reused(Conversation),
    /// A fresh conversation. `replaced` holds the reference the client sent
    /// when it was stale or belonged to someone else.
    Created { conversation: Conversation, replaced: Option<ConversationId> },
}

impl Resolution {
    pub fn conversation(&self) -> &Conversation {
        match self {
            Self::Reused(conversation) | Self::Created { conversation, .. } => conversation,
        }
    }

    pub fn into_conversation(self) -> Conversation {
        match self {
            Self::Reused(conversation) | Self::Created { conversation, .. } => conversation,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

#[derive(Clone)]
pub struct ConversationResolver {
    store: Store,
}

impl ConversationResolver {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Reuses `requested` when it is the user's own conversation, otherwise
    /// starts a new one. A bad reference never fails the turn.
    pub async fn resolve(
        &self,
        user_id: &UserId,
        requested: Option<&ConversationId>,
        now: DateTime<Utc>,
    ) -> Result<Resolution, RepositoryError> {
        let Some(requested) = requested else {
            return self.create(user_id, None, now).await;
        };

        match self.store.conversations.find_by_id(requested).await? {
            Some(conversation) if &conversation.user_id == user_id => {
                Ok(Resolution::Reused(conversation))
            }
            Some(_) => {
                tracing::warn!(
                    event_name = "chat.conversation.foreign",
                    user_id = %user_id,
                    conversation_id = %requested,
                    "conversation belongs to another user; starting a new one"
                );
                self.create(user_id, Some(requested.clone()), now).await
            }
            None => {
                tracing::info!(
                    event_name = "chat.conversation.stale",
                    user_id = %user_id,
                    conversation_id = %requested,
                    "conversation not found; starting a new one"
                );
                self.create(user_id, Some(requested.clone()), now).await
            }
        }
    }

    async fn create(
        &self,
        user_id: &UserId,
        replaced: Option<ConversationId>,
        now: DateTime<Utc>,
    ) -> Result<Resolution, RepositoryError> {
        let conversation = Conversation::new(user_id.clone(), now);
        self.store.conversations.create(conversation.clone()).await?;
        Ok(Resolution::Created { conversation, replaced })
    }
}
