use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use tripchat_core::actions::ActionKind;
use tripchat_core::domain::conversation::{Conversation, HistoryEntry};
use tripchat_core::domain::event::{EventId, EventType};
use tripchat_core::domain::trip::{TripId, TripWithEvents};
use tripchat_core::domain::user::{User, UserId, UserPreferences};
use tripchat_core::schedule::conflicting_pairs;
use tripchat_db::{RepositoryError, Store};

/// Messages of earlier turns the model gets to see.
pub const HISTORY_LIMIT: u32 = 10;

const MISSING_TITLE_HINT: &str =
    "No title provided. Update the title using the \"CONVERSATION_UPDATE\" action.";
const MISSING_TRIP_HINT: &str =
    "No active trip. Create a new trip using the \"TRIP_CREATE\" action.";

const INSTRUCTIONS: &str = r#"# Travel Planning Assistant

## Role
You are a travel planning assistant. Hold a natural conversation, give concrete
recommendations, and keep the user's trips and events up to date through actions.

## Response Structure
Every response must be one valid JSON object and nothing else:

{
  "message": "Your conversational reply to the user",
  "actions": [
    { "type": "ACTION_NAME", "params": { "field": "value" } }
  ]
}

Use an empty "actions" array when nothing needs to change.

## Gathering Information
1. Ask only for what is needed next: destination and dates for a trip, type and timing for an event.
2. Ask at most two follow-up questions per reply.
3. Never ask for something the user already told you; use the history and context below.
4. When unsure, make a reasonable assumption and say so.
5. If the user does not know what to answer, suggest ideas. The user stays in control.
6. If the user sounds frustrated with questions, stop asking and recommend.

## Taking Action
1. Give real recommendations with real names, never placeholders.
2. Include at least one concrete suggestion whenever the user asks for ideas.
3. Confirm every change you make in a short sentence.
4. When editing or removing, target exactly the trip or event the user meant, by its id.
5. Check existing trips and events before creating new ones.

## Available Actions
{catalog}

## Event Types
{event_types}

## Scheduling Rules
1. Only book events inside the trip's start and end dates.
2. Make sure the user can actually get from one event to the next.
3. Never double book. If two events occur at the same time and are the same booking, remove
   one of them. If they are different events, ask the user which one to keep.
4. Dates are YYYY-MM-DD and times are HH:MM (24 hour clock).

## Errors
If you cannot perform something, say that it is outside what you can do and offer an
alternative. Keep the conversation moving."#;

/// Everything gathered for one turn before the prompt is rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnContext {
    pub user: User,
    pub conversation: Conversation,
    pub trip: Option<TripWithEvents>,
    pub history: Vec<HistoryEntry>,
    /// Overlapping event pairs already stored on the active trip.
    pub conflicts: Vec<(EventId, EventId)>,
}

impl TurnContext {
    pub fn active_trip_id(&self) -> Option<&TripId> {
        self.trip.as_ref().map(|trip| &trip.trip.id)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserContext<'a> {
    user_id: &'a UserId,
    preferences: UserPreferences,
}

#[derive(Clone)]
pub struct ContextAssembler {
    store: Store,
}

impl ContextAssembler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Loads history and the active trip. A trip id that is unknown or owned
    /// by someone else yields no active trip.
    pub async fn gather(
        &self,
        user: &User,
        conversation: &Conversation,
        trip_id: Option<&TripId>,
    ) -> Result<TurnContext, RepositoryError> {
        let history = self
            .store
            .messages
            .list_recent(&conversation.id, HISTORY_LIMIT)
            .await?
            .iter()
            .map(|message| message.to_history())
            .collect();

        let mut trip = None;
        if let Some(trip_id) = trip_id {
            match self.store.trips.find_by_id(trip_id).await? {
                Some(found) if found.user_id == user.id => {
                    let events = self.store.events.list_for_trip(&found.id).await?;
                    trip = Some(TripWithEvents { trip: found, events });
                }
                _ => tracing::warn!(
                    event_name = "chat.context.trip_unavailable",
                    user_id = %user.id,
                    trip_id = %trip_id,
                    "active trip not found for user"
                ),
            }
        }

        let conflicts = trip
            .as_ref()
            .map(|trip| {
                conflicting_pairs(&trip.events)
                    .into_iter()
                    .map(|(left, right)| (left.id.clone(), right.id.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(TurnContext {
            user: user.clone(),
            conversation: conversation.clone(),
            trip,
            history,
            conflicts,
        })
    }

    pub fn render(&self, context: &TurnContext, message: &str, today: NaiveDate) -> String {
        let mut prompt = instructions();
        let title = context.conversation.title.as_deref().unwrap_or(MISSING_TITLE_HINT);
        let trip_id = context.active_trip_id().map(TripId::as_str).unwrap_or(MISSING_TRIP_HINT);
        let trip_context = context
            .trip
            .as_ref()
            .map(|trip| serde_json::to_string(trip).unwrap_or_default())
            .unwrap_or_default();
        let user_context = serde_json::to_string(&UserContext {
            user_id: &context.user.id,
            preferences: context.user.preferences(),
        })
        .unwrap_or_default();
        let history = serde_json::to_string_pretty(&context.history).unwrap_or_default();

        prompt.push_str("\n\nINPUTS:\n");
        let _ = writeln!(prompt, "- userId: {}", context.user.id);
        let _ = writeln!(prompt, "- activeConversationId: {}", context.conversation.id);
        let _ = writeln!(prompt, "- conversation_title: {title}");
        let _ = writeln!(prompt, "- message: {message}");
        let _ = writeln!(prompt, "- tripId: {trip_id}");
        let _ = writeln!(prompt, "- tripContext: {trip_context}");
        let _ = writeln!(prompt, "- userContext: {user_context}");
        if !context.conflicts.is_empty() {
            let pairs: Vec<String> =
                context.conflicts.iter().map(|(left, right)| format!("{left} <> {right}")).collect();
            let _ = writeln!(
                prompt,
                "- scheduleConflicts: {} (overlapping event ids; ask the user how to resolve them)",
                pairs.join(", ")
            );
        }
        let _ = writeln!(prompt, "- currentDate: {}", today.format("%Y-%m-%d"));
        let _ = write!(prompt, "- messageHistory: {history}");
        prompt
    }

    pub async fn assemble(
        &self,
        user: &User,
        conversation: &Conversation,
        trip_id: Option<&TripId>,
        message: &str,
        today: NaiveDate,
    ) -> Result<(TurnContext, String), RepositoryError> {
        let context = self.gather(user, conversation, trip_id).await?;
        let prompt = self.render(&context, message, today);
        tracing::debug!(
            event_name = "chat.prompt.rendered",
            conversation_id = %conversation.id,
            prompt_chars = prompt.len(),
            prompt = %prompt,
            "prompt assembled"
        );
        Ok((context, prompt))
    }
}

fn instructions() -> String {
    let event_types: Vec<String> =
        EventType::ALL.iter().map(|kind| format!("- {}", kind.as_str())).collect();
    INSTRUCTIONS
        .replace("{catalog}", &action_catalog())
        .replace("{event_types}", &event_types.join("\n"))
}

fn action_catalog() -> String {
    ActionKind::ALL
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let (required, optional) = action_fields(*kind);
            let mut entry = format!("{}. '{}'\n   - Required: {required}", index + 1, kind.as_str());
            if let Some(optional) = optional {
                let _ = write!(entry, "\n   - Optional: {optional}");
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn action_fields(kind: ActionKind) -> (&'static str, Option<&'static str>) {
    match kind {
        ActionKind::TripCreate => {
            ("trip_name, trip_destination, trip_start_date, trip_end_date", None)
        }
        ActionKind::TripUpdate => (
            "trip_id (defaults to the active trip)",
            Some("trip_name, trip_destination, trip_start_date, trip_end_date"),
        ),
        ActionKind::TripDelete => ("trip_id", None),
        ActionKind::EventAdd => (
            "event_name, event_type, event_start_date, event_end_date, event_start_time, \
             event_end_time, trip_id (defaults to the active trip or one created earlier in the \
             same reply)",
            Some("event_description, event_location, event_cost (number), event_currency"),
        ),
        ActionKind::EventUpdate => ("event_id", Some("trip_id and any other event field")),
        ActionKind::EventDelete => ("event_id", Some("trip_id")),
        ActionKind::PrefUpdate => {
            ("none", Some("user_name, user_currency, user_language, user_personalization"))
        }
        ActionKind::ConversationUpdate => {
            ("conversation_title", Some("conversation_id (defaults to the active conversation)"))
        }
    }
}
