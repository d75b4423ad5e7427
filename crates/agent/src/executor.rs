//! Applies the model's actions to the store, one at a time, in the order
//! they were returned. A failing action only fails its own outcome.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use tripchat_core::actions::{Action, ActionError, RawAction};
use tripchat_core::domain::conversation::ConversationId;
use tripchat_core::domain::event::{Event, EventId, EventPatch, NewEvent};
use tripchat_core::domain::trip::{NewTrip, Trip, TripId, TripPatch};
use tripchat_core::domain::user::{PreferencesPatch, UserId};
use tripchat_core::errors::DomainError;
use tripchat_db::{RepositoryError, Store};

use crate::guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};

/// Result of one action, returned to the client as `executedActions[]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    #[serde(rename = "type")]
    pub kind: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Why a single action was not applied.
#[derive(Debug, Error)]
pub enum ActionRejection {
    #[error(transparent)]
    Invalid(#[from] ActionError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{user_message}")]
    Denied { reason_code: &'static str, user_message: String },
    #[error(transparent)]
    Store(RepositoryError),
}

impl From<RepositoryError> for ActionRejection {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Store(other),
        }
    }
}

impl ActionRejection {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Invalid(ActionError::UnknownType(_)) => "unknown_action",
            Self::Invalid(_) | Self::Domain(_) => "invalid_action",
            Self::NotFound { .. } => "not_found",
            Self::Denied { reason_code, .. } => *reason_code,
            Self::Store(_) => "store_failure",
        }
    }
}

/// Mutable state threaded through one reply's action list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    /// Target for actions that omit `trip_id`. Replaced by `TRIP_CREATE`.
    pub current_trip: Option<TripId>,
    pub correlation_id: String,
}

#[derive(Debug, Default)]
struct Applied {
    entity_id: Option<String>,
    conflicts: Vec<EventId>,
    detail: Option<String>,
}

impl Applied {
    fn entity(id: impl ToString) -> Self {
        Self { entity_id: Some(id.to_string()), ..Self::default() }
    }

    fn noop(detail: &str) -> Self {
        Self { detail: Some(detail.to_string()), ..Self::default() }
    }
}

#[derive(Clone)]
pub struct ActionExecutor {
    store: Store,
    guardrails: GuardrailPolicy,
}

impl ActionExecutor {
    pub fn new(store: Store, guardrails: GuardrailPolicy) -> Self {
        Self { store, guardrails }
    }

    pub async fn execute(
        &self,
        context: &mut ExecutionContext,
        actions: &[RawAction],
        now: DateTime<Utc>,
    ) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(actions.len());
        for raw in actions {
            let result = match Action::from_raw(raw) {
                Ok(action) => self.apply(context, action, now).await,
                Err(error) => Err(ActionRejection::from(error)),
            };
            outcomes.push(self.record(context, raw, result));
        }
        outcomes
    }

    fn record(
        &self,
        context: &ExecutionContext,
        raw: &RawAction,
        result: Result<Applied, ActionRejection>,
    ) -> ActionOutcome {
        match result {
            Ok(applied) => {
                tracing::info!(
                    event_name = "chat.action.applied",
                    correlation_id = %context.correlation_id,
                    user_id = %context.user_id,
                    action_type = %raw.kind,
                    entity_id = applied.entity_id.as_deref().unwrap_or(""),
                    conflicts = applied.conflicts.len(),
                    "action applied"
                );
                ActionOutcome {
                    kind: raw.kind.clone(),
                    success: true,
                    error: None,
                    entity_id: applied.entity_id,
                    conflicts: applied.conflicts,
                    detail: applied.detail,
                }
            }
            Err(rejection) => {
                if let ActionRejection::Store(error) = &rejection {
                    tracing::error!(
                        event_name = "chat.action.store_failed",
                        correlation_id = %context.correlation_id,
                        action_type = %raw.kind,
                        error = %error,
                        "store rejected action"
                    );
                } else {
                    tracing::warn!(
                        event_name = "chat.action.rejected",
                        correlation_id = %context.correlation_id,
                        user_id = %context.user_id,
                        action_type = %raw.kind,
                        reason_code = rejection.reason_code(),
                        error = %rejection,
                        "action rejected"
                    );
                }
                ActionOutcome {
                    kind: raw.kind.clone(),
                    success: false,
                    error: Some(rejection.to_string()),
                    entity_id: None,
                    conflicts: Vec::new(),
                    detail: Some(rejection.reason_code().to_string()),
                }
            }
        }
    }

    async fn apply(
        &self,
        context: &mut ExecutionContext,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<Applied, ActionRejection> {
        match action {
            Action::TripCreate(new_trip) => self.create_trip(context, new_trip, now).await,
            Action::TripUpdate { trip_id, patch } => {
                let trip_id = trip_id
                    .or_else(|| context.current_trip.clone())
                    .ok_or_else(|| DomainError::missing("trip_id"))?;
                self.update_trip(context, &trip_id, &patch).await
            }
            Action::TripDelete { trip_id } => self.delete_trip(context, &trip_id).await,
            Action::EventAdd { trip_id, event } => {
                let trip_id = trip_id
                    .or_else(|| context.current_trip.clone())
                    .ok_or_else(|| DomainError::missing("trip_id"))?;
                self.add_event(context, &trip_id, event, now).await
            }
            Action::EventUpdate { trip_id, event_id, patch } => {
                self.update_event(context, trip_id.as_ref(), &event_id, &patch).await
            }
            Action::EventDelete { trip_id, event_id } => {
                let event = self.owned_event(context, trip_id.as_ref(), &event_id).await?;
                self.store.events.delete(&event.id).await?;
                Ok(Applied::entity(event.id))
            }
            Action::PrefUpdate(patch) => self.update_preferences(context, &patch).await,
            Action::ConversationUpdate { conversation_id, title } => {
                let title = title.ok_or_else(|| DomainError::missing("conversation_title"))?;
                let conversation_id =
                    conversation_id.unwrap_or_else(|| context.conversation_id.clone());
                let conversation = self
                    .store
                    .conversations
                    .find_by_id(&conversation_id)
                    .await?
                    .ok_or_else(|| RepositoryError::not_found("conversation", &conversation_id))?;
                self.check_owner("conversation", &conversation.user_id, context)?;
                self.store.conversations.set_title(&conversation.id, &title).await?;
                Ok(Applied::entity(conversation.id))
            }
        }
    }

    async fn create_trip(
        &self,
        context: &mut ExecutionContext,
        new_trip: NewTrip,
        now: DateTime<Utc>,
    ) -> Result<Applied, ActionRejection> {
        let trip = Trip::new(context.user_id.clone(), new_trip, now);
        self.store.trips.create(trip.clone()).await?;
        self.store.conversations.link_trip(&context.conversation_id, &trip.id).await?;
        context.current_trip = Some(trip.id.clone());
        Ok(Applied::entity(trip.id))
    }

    async fn update_trip(
        &self,
        context: &ExecutionContext,
        trip_id: &TripId,
        patch: &TripPatch,
    ) -> Result<Applied, ActionRejection> {
        let mut trip = self.owned_trip(context, trip_id).await?;
        if patch.is_empty() {
            return Ok(Applied {
                entity_id: Some(trip.id.to_string()),
                ..Applied::noop("no fields to update")
            });
        }
        trip.apply(patch)?;
        if patch.start_date.is_some() || patch.end_date.is_some() {
            let events = self.store.events.list_for_trip(&trip.id).await?;
            self.guard(&GuardrailIntent::ResizeTrip { trip: &trip, events: &events })?;
        }
        self.store.trips.update(&trip).await?;
        Ok(Applied::entity(trip.id))
    }

    async fn delete_trip(
        &self,
        context: &mut ExecutionContext,
        trip_id: &TripId,
    ) -> Result<Applied, ActionRejection> {
        let trip = self.owned_trip(context, trip_id).await?;
        self.store.trips.delete(&trip.id).await?;
        if context.current_trip.as_ref() == Some(&trip.id) {
            context.current_trip = None;
        }
        Ok(Applied::entity(trip.id))
    }

    async fn add_event(
        &self,
        context: &ExecutionContext,
        trip_id: &TripId,
        new_event: NewEvent,
        now: DateTime<Utc>,
    ) -> Result<Applied, ActionRejection> {
        let trip = self.owned_trip(context, trip_id).await?;
        let existing = self.store.events.list_for_trip(&trip.id).await?;
        let conflicts = match self.guard(&GuardrailIntent::AddEvent {
            trip: &trip,
            proposed: &new_event,
            existing: &existing,
        })? {
            Some(GuardrailDecision::Discard { duplicate_of, .. }) => {
                return Ok(Applied {
                    entity_id: Some(duplicate_of.to_string()),
                    ..Applied::noop("duplicate of an existing event; not stored")
                });
            }
            Some(GuardrailDecision::AllowWithConflicts { conflicts }) => conflicts,
            _ => Vec::new(),
        };

        let event = Event::new(trip.id, context.user_id.clone(), new_event, now);
        self.store.events.create(event.clone()).await?;
        Ok(Applied { conflicts, ..Applied::entity(event.id) })
    }

    async fn update_event(
        &self,
        context: &ExecutionContext,
        trip_id: Option<&TripId>,
        event_id: &EventId,
        patch: &EventPatch,
    ) -> Result<Applied, ActionRejection> {
        let event = self.owned_event(context, trip_id, event_id).await?;
        if patch.is_empty() {
            return Ok(Applied {
                entity_id: Some(event.id.to_string()),
                ..Applied::noop("no fields to update")
            });
        }
        let updated = event.merged(patch)?;
        let trip = self.owned_trip(context, &event.trip_id).await?;
        let existing = self.store.events.list_for_trip(&trip.id).await?;
        let conflicts = match self.guard(&GuardrailIntent::MoveEvent {
            trip: &trip,
            updated: &updated,
            existing: &existing,
        })? {
            Some(GuardrailDecision::AllowWithConflicts { conflicts }) => conflicts,
            _ => Vec::new(),
        };

        self.store.events.update(&updated).await?;
        Ok(Applied { conflicts, ..Applied::entity(updated.id) })
    }

    async fn update_preferences(
        &self,
        context: &ExecutionContext,
        patch: &PreferencesPatch,
    ) -> Result<Applied, ActionRejection> {
        if patch.is_empty() {
            return Ok(Applied::noop("no fields to update"));
        }
        let user = self.store.users.update_preferences(&context.user_id, patch).await?;
        Ok(Applied::entity(user.id))
    }

    async fn owned_trip(
        &self,
        context: &ExecutionContext,
        trip_id: &TripId,
    ) -> Result<Trip, ActionRejection> {
        let trip = self
            .store
            .trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("trip", trip_id))?;
        self.check_owner("trip", &trip.user_id, context)?;
        Ok(trip)
    }

    /// Loads the event and, when the action named a trip, checks that the
    /// event actually sits on it.
    async fn owned_event(
        &self,
        context: &ExecutionContext,
        trip_id: Option<&TripId>,
        event_id: &EventId,
    ) -> Result<Event, ActionRejection> {
        let event = self
            .store
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("event", event_id))?;
        self.check_owner("event", &event.user_id, context)?;
        if let Some(trip_id) = trip_id {
            if trip_id != &event.trip_id {
                return Err(DomainError::invalid(
                    "trip_id",
                    format!("event `{}` does not belong to trip `{trip_id}`", event.id),
                )
                .into());
            }
        }
        Ok(event)
    }

    fn check_owner(
        &self,
        entity: &'static str,
        owner: &UserId,
        context: &ExecutionContext,
    ) -> Result<(), ActionRejection> {
        self.guard(&GuardrailIntent::TouchRecord { entity, owner, actor: &context.user_id })
            .map(|_| ())
    }

    /// `Deny` becomes a rejection; every other decision is handed back.
    fn guard(
        &self,
        intent: &GuardrailIntent<'_>,
    ) -> Result<Option<GuardrailDecision>, ActionRejection> {
        match self.guardrails.evaluate(intent) {
            GuardrailDecision::Deny { reason_code, user_message } => {
                Err(ActionRejection::Denied { reason_code, user_message })
            }
            GuardrailDecision::Allow => Ok(None),
            other => Ok(Some(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use serde_json::json;

    use tripchat_core::actions::RawAction;
    use tripchat_core::domain::conversation::Conversation;
    use tripchat_core::domain::event::EventId;
    use tripchat_core::domain::trip::{NewTrip, Trip};
    use tripchat_core::domain::user::{NewUser, User};
    use tripchat_db::Store;

    use super::{ActionExecutor, ExecutionContext};
    use crate::guardrails::GuardrailPolicy;

    struct Fixture {
        store: Store,
        executor: ActionExecutor,
        context: ExecutionContext,
    }

    async fn fixture() -> Fixture {
        let store = Store::in_memory();
        let user = User::new(
            NewUser { external_id: None, name: "Ada".to_string(), email: None },
            Utc::now(),
        );
        store.users.create(user.clone()).await.expect("user");
        let conversation = Conversation::new(user.id.clone(), Utc::now());
        store.conversations.create(conversation.clone()).await.expect("conversation");
        Fixture {
            executor: ActionExecutor::new(store.clone(), GuardrailPolicy::default()),
            store,
            context: ExecutionContext {
                user_id: user.id,
                conversation_id: conversation.id,
                current_trip: None,
                correlation_id: "test".to_string(),
            },
        }
    }

    fn action(value: serde_json::Value) -> RawAction {
        RawAction::from_value(&value)
    }

    fn trip_create() -> RawAction {
        action(json!({
            "type": "TRIP_CREATE",
            "params": {
                "trip_name": "Paris getaway",
                "trip_destination": "Paris",
                "trip_start_date": "2026-09-01",
                "trip_end_date": "2026-09-05"
            }
        }))
    }

    fn event_add(name: &str, event_type: &str, day: &str, from: &str, to: &str) -> RawAction {
        action(json!({
            "type": "EVENT_ADD",
            "params": {
                "event_name": name,
                "event_type": event_type,
                "event_start_date": day,
                "event_end_date": day,
                "event_start_time": from,
                "event_end_time": to,
                "event_cost": "$45"
            }
        }))
    }

    #[tokio::test]
    async fn trip_create_feeds_later_event_add_and_links_conversation() {
        let mut fx = fixture().await;
        let actions = vec![
            trip_create(),
            event_add("Louvre", "museum", "2026-09-02", "10:00", "13:00"),
        ];

        let outcomes = fx.executor.execute(&mut fx.context, &actions, Utc::now()).await;

        assert!(outcomes.iter().all(|outcome| outcome.success), "{outcomes:?}");
        let trip_id = fx.context.current_trip.clone().expect("current trip set");
        let events = fx.store.events.list_for_trip(&trip_id).await.expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Louvre");
        assert_eq!(events[0].cost.map(|cost| cost.to_string()), Some("45".to_string()));
        let conversation = fx
            .store
            .conversations
            .find_by_id(&fx.context.conversation_id)
            .await
            .expect("lookup")
            .expect("conversation");
        assert_eq!(conversation.trip_id, Some(trip_id));
    }

    #[tokio::test]
    async fn identical_adds_in_one_reply_store_one_event() {
        let mut fx = fixture().await;
        let actions = vec![
            trip_create(),
            event_add("Seine cruise", "boat trip", "2026-09-03", "18:00", "19:30"),
            event_add("Seine cruise", "boat trip", "2026-09-03", "18:00", "19:30"),
        ];

        let outcomes = fx.executor.execute(&mut fx.context, &actions, Utc::now()).await;

        assert!(outcomes[2].success);
        assert_eq!(outcomes[2].entity_id, outcomes[1].entity_id);
        let trip_id = fx.context.current_trip.clone().expect("trip");
        assert_eq!(fx.store.events.list_for_trip(&trip_id).await.expect("events").len(), 1);
    }

    #[tokio::test]
    async fn overlapping_different_events_are_stored_and_reported() {
        let mut fx = fixture().await;
        let actions = vec![
            trip_create(),
            event_add("Louvre", "museum", "2026-09-02", "10:00", "13:00"),
            event_add("Le Procope", "restaurant", "2026-09-02", "12:00", "14:00"),
        ];

        let outcomes = fx.executor.execute(&mut fx.context, &actions, Utc::now()).await;

        assert!(outcomes[2].success);
        assert_eq!(outcomes[2].conflicts.len(), 1);
        assert_eq!(Some(outcomes[2].conflicts[0].to_string()), outcomes[1].entity_id);
        let trip_id = fx.context.current_trip.clone().expect("trip");
        assert_eq!(fx.store.events.list_for_trip(&trip_id).await.expect("events").len(), 2);
    }

    #[tokio::test]
    async fn activities_during_a_hotel_stay_report_no_conflicts() {
        let mut fx = fixture().await;
        let hotel = action(json!({
            "type": "EVENT_ADD",
            "params": {
                "event_name": "Hotel Lutetia",
                "event_type": "accommodation",
                "event_start_date": "2026-09-01",
                "event_end_date": "2026-09-05",
                "event_start_time": "15:00",
                "event_end_time": "11:00"
            }
        }));
        let actions = vec![
            trip_create(),
            hotel,
            event_add("Louvre", "museum", "2026-09-02", "10:00", "13:00"),
            event_add("Le Procope", "restaurant", "2026-09-03", "20:00", "22:00"),
        ];

        let outcomes = fx.executor.execute(&mut fx.context, &actions, Utc::now()).await;

        assert!(outcomes.iter().all(|outcome| outcome.success), "{outcomes:?}");
        assert!(outcomes.iter().all(|outcome| outcome.conflicts.is_empty()), "{outcomes:?}");
        let trip_id = fx.context.current_trip.clone().expect("trip");
        assert_eq!(fx.store.events.list_for_trip(&trip_id).await.expect("events").len(), 3);
    }

    #[tokio::test]
    async fn bad_action_does_not_block_siblings() {
        let mut fx = fixture().await;
        let actions = vec![
            action(json!({ "type": "BOOK_HOTEL", "params": {} })),
            trip_create(),
            event_add("Outside", "park", "2026-10-01", "10:00", "11:00"),
            event_add("Opera", "concert", "2026-09-02", "20:00", "22:00"),
            action(json!({ "type": "EVENT_ADD", "params": { "event_name": "No dates" } })),
            event_add("Versailles", "attraction", "2026-09-04", "09:00", "17:00"),
        ];

        let outcomes = fx.executor.execute(&mut fx.context, &actions, Utc::now()).await;
        let success: Vec<bool> = outcomes.iter().map(|outcome| outcome.success).collect();

        assert_eq!(success, vec![false, true, false, false, false, true]);
        assert_eq!(outcomes[0].detail.as_deref(), Some("unknown_action"));
        assert_eq!(outcomes[2].detail.as_deref(), Some("event_outside_trip"));
        let trip_id = fx.context.current_trip.clone().expect("trip");
        let events = fx.store.events.list_for_trip(&trip_id).await.expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "Versailles");
    }

    #[tokio::test]
    async fn event_add_without_any_trip_fails_validation() {
        let mut fx = fixture().await;
        let outcomes = fx
            .executor
            .execute(
                &mut fx.context,
                &[event_add("Lunch", "restaurant", "2026-09-02", "12:00", "13:00")],
                Utc::now(),
            )
            .await;

        assert!(!outcomes[0].success);
        assert!(outcomes[0].error.as_deref().unwrap_or_default().contains("trip_id"));
    }

    #[tokio::test]
    async fn trip_delete_cascades_and_clears_current_trip() {
        let mut fx = fixture().await;
        fx.executor
            .execute(
                &mut fx.context,
                &[trip_create(), event_add("Louvre", "museum", "2026-09-02", "10:00", "13:00")],
                Utc::now(),
            )
            .await;
        let trip_id = fx.context.current_trip.clone().expect("trip");

        let outcomes = fx
            .executor
            .execute(
                &mut fx.context,
                &[action(json!({ "type": "TRIP_DELETE", "params": { "trip_id": trip_id.as_str() } }))],
                Utc::now(),
            )
            .await;

        assert!(outcomes[0].success);
        assert!(fx.context.current_trip.is_none());
        assert!(fx.store.events.list_for_trip(&trip_id).await.expect("events").is_empty());
    }

    #[tokio::test]
    async fn other_users_trip_cannot_be_touched() {
        let mut fx = fixture().await;
        let foreign = Trip::new(
            "someone-else".into(),
            NewTrip {
                name: "Theirs".to_string(),
                destination: "Berlin".to_string(),
                start_date: NaiveDate::from_ymd_opt(2026, 9, 1).expect("date"),
                end_date: NaiveDate::from_ymd_opt(2026, 9, 3).expect("date"),
            },
            Utc::now(),
        );
        fx.store.trips.create(foreign.clone()).await.expect("trip");

        let outcomes = fx
            .executor
            .execute(
                &mut fx.context,
                &[
                    action(json!({ "type": "TRIP_DELETE", "params": { "trip_id": foreign.id.as_str() } })),
                    action(json!({
                        "type": "TRIP_UPDATE",
                        "params": { "trip_id": foreign.id.as_str(), "trip_name": "Mine now" }
                    })),
                ],
                Utc::now(),
            )
            .await;

        assert!(outcomes.iter().all(|outcome| !outcome.success));
        assert_eq!(outcomes[0].detail.as_deref(), Some("foreign_record"));
        let stored = fx.store.trips.find_by_id(&foreign.id).await.expect("lookup").expect("kept");
        assert_eq!(stored.name, "Theirs");
    }

    #[tokio::test]
    async fn event_update_and_delete_respect_trip_reference() {
        let mut fx = fixture().await;
        let outcomes = fx
            .executor
            .execute(
                &mut fx.context,
                &[trip_create(), event_add("Louvre", "museum", "2026-09-02", "10:00", "13:00")],
                Utc::now(),
            )
            .await;
        let event_id = outcomes[1].entity_id.clone().expect("event id");

        let outcomes = fx
            .executor
            .execute(
                &mut fx.context,
                &[
                    action(json!({
                        "type": "EVENT_UPDATE",
                        "params": { "event_id": event_id, "event_end_time": "14:30" }
                    })),
                    action(json!({
                        "type": "EVENT_DELETE",
                        "params": { "trip_id": "another-trip", "event_id": event_id }
                    })),
                ],
                Utc::now(),
            )
            .await;

        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        let stored = fx
            .store
            .events
            .find_by_id(&EventId::from(event_id.as_str()))
            .await
            .expect("lookup")
            .expect("still stored");
        assert_eq!(stored.end_time.format("%H:%M").to_string(), "14:30");
    }

    #[tokio::test]
    async fn preference_and_title_updates_apply() {
        let mut fx = fixture().await;
        let outcomes = fx
            .executor
            .execute(
                &mut fx.context,
                &[
                    action(json!({ "type": "PREF_UPDATE", "params": { "user_currency": "EUR" } })),
                    action(json!({
                        "type": "CONVERSATION_UPDATE",
                        "params": { "conversation_title": "Paris in September" }
                    })),
                ],
                Utc::now(),
            )
            .await;

        assert!(outcomes.iter().all(|outcome| outcome.success));
        let user = fx.store.users.find_by_id(&fx.context.user_id).await.expect("lookup").expect("user");
        assert_eq!(user.currency, "EUR");
        let conversation = fx
            .store
            .conversations
            .find_by_id(&fx.context.conversation_id)
            .await
            .expect("lookup")
            .expect("conversation");
        assert_eq!(conversation.title.as_deref(), Some("Paris in September"));
    }

    #[tokio::test]
    async fn outcome_serializes_with_client_field_names() {
        let mut fx = fixture().await;
        let outcomes = fx.executor.execute(&mut fx.context, &[trip_create()], Utc::now()).await;

        let value = serde_json::to_value(&outcomes[0]).expect("serialize");
        assert_eq!(value["type"], "TRIP_CREATE");
        assert_eq!(value["success"], true);
        assert!(value["entityId"].is_string());
        assert!(value.get("error").is_none());
        assert!(value.get("conflicts").is_none());
    }
}
