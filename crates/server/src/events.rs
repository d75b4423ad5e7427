use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use tripchat_core::domain::event::{Event, EventId, EventPatch, NewEvent};
use tripchat_core::domain::trip::{Trip, TripId};
use tripchat_core::domain::user::UserId;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreateEventRequest {
    #[serde(rename = "eventData")]
    pub event_data: NewEvent,
    /// Defaults to the trip owner.
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

pub async fn list_for_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.store.events.list_for_trip(&TripId(trip_id)).await?))
}

pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(state.store.events.list_for_user(&UserId(user_id)).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let Json(CreateEventRequest { event_data, user_id }) = payload?;
    let trip = load_trip(&state, TripId(trip_id)).await?;

    event_data.validate()?;
    trip.ensure_contains(event_data.start_date, event_data.end_date)?;

    let user_id = user_id
        .filter(|id| !id.trim().is_empty())
        .map(UserId)
        .unwrap_or_else(|| trip.user_id.clone());
    let event = Event::new(trip.id, user_id, event_data, Utc::now());
    state.store.events.create(event.clone()).await?;
    tracing::info!(
        event_name = "http.event.created",
        event_id = %event.id,
        trip_id = %event.trip_id,
        event_type = event.event_type.as_str(),
        "event created"
    );
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((trip_id, event_id)): Path<(String, String)>,
    payload: Result<Json<EventPatch>, JsonRejection>,
) -> Result<Json<Event>, ApiError> {
    let Json(patch) = payload?;
    let trip = load_trip(&state, TripId(trip_id)).await?;
    let event = load_event(&state, &trip, EventId(event_id)).await?;

    let merged = event.merged(&patch)?;
    trip.ensure_contains(merged.start_date, merged.end_date)?;
    state.store.events.update(&merged).await?;
    Ok(Json(merged))
}

/// A missing event is not an error; an event filed under another trip is
/// left alone.
pub async fn delete(
    State(state): State<AppState>,
    Path((trip_id, event_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let trip_id = TripId(trip_id);
    let event_id = EventId(event_id);
    let belongs = state
        .store
        .events
        .find_by_id(&event_id)
        .await?
        .is_some_and(|event| event.trip_id == trip_id);
    if belongs {
        state.store.events.delete(&event_id).await?;
        tracing::info!(
            event_name = "http.event.deleted",
            event_id = %event_id,
            trip_id = %trip_id,
            "event deleted"
        );
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn load_trip(state: &AppState, trip_id: TripId) -> Result<Trip, ApiError> {
    state.store.trips.find_by_id(&trip_id).await?.ok_or_else(|| ApiError::not_found("trip", &trip_id))
}

async fn load_event(state: &AppState, trip: &Trip, event_id: EventId) -> Result<Event, ApiError> {
    state
        .store
        .events
        .find_by_id(&event_id)
        .await?
        .filter(|event| event.trip_id == trip.id)
        .ok_or_else(|| ApiError::not_found("event", &event_id))
}
