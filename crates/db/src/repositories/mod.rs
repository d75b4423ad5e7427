use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tripchat_core::domain::conversation::{Conversation, ConversationId, Message};
use tripchat_core::domain::event::{Event, EventId};
use tripchat_core::domain::trip::{Trip, TripId};
use tripchat_core::domain::user::{NewUser, PreferencesPatch, User, UserId};
use tripchat_core::errors::ApplicationError;

mod codec;
pub mod conversation;
pub mod event;
pub mod memory;
pub mod message;
pub mod trip;
pub mod user;

pub use conversation::SqlConversationRepository;
pub use event::SqlEventRepository;
pub use memory::InMemoryStore;
pub use message::SqlMessageRepository;
pub use trip::SqlTripRepository;
pub use user::SqlUserRepository;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Store(other.to_string()),
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<User>, RepositoryError>;
    async fn create(&self, user: User) -> Result<(), RepositoryError>;
    /// Partial merge; `None` fields keep their stored value.
    async fn update_preferences(
        &self,
        id: &UserId,
        patch: &PreferencesPatch,
    ) -> Result<User, RepositoryError>;

    /// Login path: reuse the user bound to this external identity, or
    /// register a new one.
    async fn find_or_create(
        &self,
        new_user: NewUser,
        now: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        if let Some(external_id) = new_user.external_id.as_deref() {
            if let Some(existing) = self.find_by_external_id(external_id).await? {
                return Ok(existing);
            }
        }
        let user = User::new(new_user, now);
        self.create(user.clone()).await?;
        Ok(user)
    }
}

#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn find_by_id(&self, id: &TripId) -> Result<Option<Trip>, RepositoryError>;
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Trip>, RepositoryError>;
    async fn create(&self, trip: Trip) -> Result<(), RepositoryError>;
    async fn update(&self, trip: &Trip) -> Result<(), RepositoryError>;
    /// Removes the trip, its events and any conversation links in one
    /// transaction. Returns whether the trip existed.
    async fn delete(&self, id: &TripId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_by_id(&self, id: &EventId) -> Result<Option<Event>, RepositoryError>;
    /// Ordered by start date and time.
    async fn list_for_trip(&self, trip_id: &TripId) -> Result<Vec<Event>, RepositoryError>;
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Event>, RepositoryError>;
    async fn create(&self, event: Event) -> Result<(), RepositoryError>;
    async fn update(&self, event: &Event) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &EventId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Conversation>, RepositoryError>;
    async fn create(&self, conversation: Conversation) -> Result<(), RepositoryError>;
    async fn link_trip(&self, id: &ConversationId, trip_id: &TripId)
        -> Result<(), RepositoryError>;
    async fn set_title(&self, id: &ConversationId, title: &str) -> Result<(), RepositoryError>;
    /// Removes messages, the conversation, and the linked trip with its
    /// events in one transaction. Returns whether the conversation existed.
    async fn delete_cascade(&self, id: &ConversationId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append(&self, message: Message) -> Result<(), RepositoryError>;
    /// The newest `limit` messages, returned oldest first.
    async fn list_recent(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;
    async fn list_all(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError>;
}

/// Every repository the services need, behind trait objects so SQLite and
/// the in-memory store are interchangeable.
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub trips: Arc<dyn TripRepository>,
    pub events: Arc<dyn EventRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Store {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            users: Arc::new(SqlUserRepository::new(pool.clone())),
            trips: Arc::new(SqlTripRepository::new(pool.clone())),
            events: Arc::new(SqlEventRepository::new(pool.clone())),
            conversations: Arc::new(SqlConversationRepository::new(pool.clone())),
            messages: Arc::new(SqlMessageRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::default());
        Self {
            users: store.clone(),
            trips: store.clone(),
            events: store.clone(),
            conversations: store.clone(),
            messages: store,
        }
    }
}
