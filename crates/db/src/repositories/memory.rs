use std::collections::HashMap;

use tokio::sync::RwLock;

use tripchat_core::domain::conversation::{Conversation, ConversationId, Message};
use tripchat_core::domain::event::{Event, EventId};
use tripchat_core::domain::trip::{Trip, TripId};
use tripchat_core::domain::user::{PreferencesPatch, User, UserId};

use super::{
    ConversationRepository, EventRepository, MessageRepository, RepositoryError, TripRepository,
    UserRepository,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    trips: HashMap<String, Trip>,
    events: HashMap<String, Event>,
    conversations: HashMap<String, Conversation>,
    /// Insertion order doubles as the tie-breaker for equal timestamps.
    messages: Vec<Message>,
}

/// All five record kinds behind one lock, so cascades are atomic here too.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

fn sort_events(events: &mut [Event]) {
    events.sort_by(|left, right| {
        (left.start_date, left.start_time, left.created_at).cmp(&(
            right.start_date,
            right.start_time,
            right.created_at,
        ))
    });
}

#[async_trait::async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(id.as_str()).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn create(&self, user: User) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.users.insert(user.id.0.clone(), user);
        Ok(())
    }

    async fn update_preferences(
        &self,
        id: &UserId,
        patch: &PreferencesPatch,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        let user =
            state.users.get_mut(id.as_str()).ok_or_else(|| RepositoryError::not_found("user", id))?;
        user.apply(patch);
        Ok(user.clone())
    }
}

#[async_trait::async_trait]
impl TripRepository for InMemoryStore {
    async fn find_by_id(&self, id: &TripId) -> Result<Option<Trip>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.trips.get(id.as_str()).cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Trip>, RepositoryError> {
        let state = self.state.read().await;
        let mut trips: Vec<Trip> =
            state.trips.values().filter(|trip| &trip.user_id == user_id).cloned().collect();
        trips.sort_by(|left, right| {
            (left.start_date, left.created_at).cmp(&(right.start_date, right.created_at))
        });
        Ok(trips)
    }

    async fn create(&self, trip: Trip) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.trips.insert(trip.id.0.clone(), trip);
        Ok(())
    }

    async fn update(&self, trip: &Trip) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let stored = state
            .trips
            .get_mut(trip.id.as_str())
            .ok_or_else(|| RepositoryError::not_found("trip", &trip.id))?;
        *stored = trip.clone();
        Ok(())
    }

    async fn delete(&self, id: &TripId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        state.events.retain(|_, event| &event.trip_id != id);
        for conversation in state.conversations.values_mut() {
            if conversation.trip_id.as_ref() == Some(id) {
                conversation.trip_id = None;
            }
        }
        Ok(state.trips.remove(id.as_str()).is_some())
    }
}

#[async_trait::async_trait]
impl EventRepository for InMemoryStore {
    async fn find_by_id(&self, id: &EventId) -> Result<Option<Event>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.events.get(id.as_str()).cloned())
    }

    async fn list_for_trip(&self, trip_id: &TripId) -> Result<Vec<Event>, RepositoryError> {
        let state = self.state.read().await;
        let mut events: Vec<Event> =
            state.events.values().filter(|event| &event.trip_id == trip_id).cloned().collect();
        sort_events(&mut events);
        Ok(events)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Event>, RepositoryError> {
        let state = self.state.read().await;
        let mut events: Vec<Event> =
            state.events.values().filter(|event| &event.user_id == user_id).cloned().collect();
        sort_events(&mut events);
        Ok(events)
    }

    async fn create(&self, event: Event) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.events.insert(event.id.0.clone(), event);
        Ok(())
    }

    async fn update(&self, event: &Event) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let stored = state
            .events
            .get_mut(event.id.as_str())
            .ok_or_else(|| RepositoryError::not_found("event", &event.id))?;
        *stored = event.clone();
        Ok(())
    }

    async fn delete(&self, id: &EventId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.events.remove(id.as_str()).is_some())
    }
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryStore {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.conversations.get(id.as_str()).cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Conversation>, RepositoryError> {
        let state = self.state.read().await;
        let mut conversations: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|conversation| &conversation.user_id == user_id)
            .cloned()
            .collect();
        conversations.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(conversations)
    }

    async fn create(&self, conversation: Conversation) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.conversations.insert(conversation.id.0.clone(), conversation);
        Ok(())
    }

    async fn link_trip(
        &self,
        id: &ConversationId,
        trip_id: &TripId,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .get_mut(id.as_str())
            .ok_or_else(|| RepositoryError::not_found("conversation", id))?;
        conversation.trip_id = Some(trip_id.clone());
        Ok(())
    }

    async fn set_title(&self, id: &ConversationId, title: &str) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let conversation = state
            .conversations
            .get_mut(id.as_str())
            .ok_or_else(|| RepositoryError::not_found("conversation", id))?;
        conversation.title = Some(title.to_string());
        Ok(())
    }

    async fn delete_cascade(&self, id: &ConversationId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(conversation) = state.conversations.remove(id.as_str()) else {
            return Ok(false);
        };
        state.messages.retain(|message| &message.conversation_id != id);

        if let Some(trip_id) = conversation.trip_id {
            state.events.retain(|_, event| event.trip_id != trip_id);
            for other in state.conversations.values_mut() {
                if other.trip_id.as_ref() == Some(&trip_id) {
                    other.trip_id = None;
                }
            }
            state.trips.remove(trip_id.as_str());
        }
        Ok(true)
    }
}

#[async_trait::async_trait]
impl MessageRepository for InMemoryStore {
    async fn append(&self, message: Message) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.messages.push(message);
        Ok(())
    }

    async fn list_recent(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut messages = self.list_all(conversation_id).await?;
        let keep = usize::try_from(limit).unwrap_or(usize::MAX);
        let skip = messages.len().saturating_sub(keep);
        Ok(messages.split_off(skip))
    }

    async fn list_all(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.read().await;
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|message| &message.conversation_id == conversation_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        messages.sort_by(|left, right| left.sent_at.cmp(&right.sent_at));
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Utc};

    use tripchat_core::domain::conversation::{Conversation, Message, SenderRole};
    use tripchat_core::domain::event::{Event, EventType, NewEvent};
    use tripchat_core::domain::trip::{NewTrip, Trip};
    use tripchat_core::domain::user::{NewUser, User};

    use crate::repositories::Store;

    fn december(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 12, day).expect("date")
    }

    fn oslo_trip(user: &User, name: &str) -> Trip {
        Trip::new(
            user.id.clone(),
            NewTrip {
                name: name.to_string(),
                destination: "Oslo".to_string(),
                start_date: december(1),
                end_date: december(4),
            },
            Utc::now(),
        )
    }

    fn booking(trip: &Trip, name: &str, day: u32) -> Event {
        Event::new(
            trip.id.clone(),
            trip.user_id.clone(),
            NewEvent {
                name: name.to_string(),
                event_type: EventType::Museum,
                start_date: december(day),
                end_date: december(day),
                start_time: NaiveTime::from_hms_opt(11, 0, 0).expect("time"),
                end_time: NaiveTime::from_hms_opt(13, 0, 0).expect("time"),
                description: None,
                location: None,
                cost: None,
                currency: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn in_memory_store_shares_state_across_repositories() {
        let store = Store::in_memory();
        let user = User::new(
            NewUser { external_id: None, name: "Mia".to_string(), email: None },
            Utc::now(),
        );
        store.users.create(user.clone()).await.expect("user");

        let linked = oslo_trip(&user, "Oslo");
        let unrelated = oslo_trip(&user, "Oslo later");
        store.trips.create(linked.clone()).await.expect("trip");
        store.trips.create(unrelated.clone()).await.expect("trip");
        for event in [booking(&linked, "Munch", 2), booking(&linked, "Fram Museum", 3)] {
            store.events.create(event).await.expect("event");
        }
        let survivor = booking(&unrelated, "Viking Ship Museum", 2);
        store.events.create(survivor.clone()).await.expect("event");

        let conversation = Conversation::new(user.id.clone(), Utc::now());
        store.conversations.create(conversation.clone()).await.expect("conversation");
        store.conversations.link_trip(&conversation.id, &linked.id).await.expect("link");
        store
            .messages
            .append(Message::new(conversation.id.clone(), SenderRole::User, "hello", Utc::now()))
            .await
            .expect("message");

        assert!(store.conversations.delete_cascade(&conversation.id).await.expect("cascade"));
        assert!(store.trips.find_by_id(&linked.id).await.expect("trip lookup").is_none());
        assert!(store.events.list_for_trip(&linked.id).await.expect("events").is_empty());
        assert!(store.messages.list_all(&conversation.id).await.expect("messages").is_empty());
        assert_eq!(store.events.list_for_trip(&unrelated.id).await.expect("events"), vec![survivor]);
    }

    #[tokio::test]
    async fn in_memory_list_recent_returns_tail_in_order() {
        let store = Store::in_memory();
        let conversation = Conversation::new("u-1".into(), Utc::now());
        let now = Utc::now();
        for body in ["a", "b", "c"] {
            store
                .messages
                .append(Message::new(conversation.id.clone(), SenderRole::User, body, now))
                .await
                .expect("append");
        }

        let recent = store.messages.list_recent(&conversation.id, 2).await.expect("recent");
        let bodies: Vec<&str> = recent.iter().map(|message| message.content.as_str()).collect();
        assert_eq!(bodies, vec!["b", "c"]);
    }
}
