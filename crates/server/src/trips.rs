use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use tripchat_core::domain::trip::{NewTrip, Trip, TripId, TripPatch, TripWithEvents};
use tripchat_core::domain::user::UserId;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreateTripRequest {
    #[serde(rename = "tripData")]
    pub trip_data: NewTrip,
}

/// `GET /trips/{id}` answers two questions: the id names a trip, or it
/// names a user whose trips are listed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TripLookup {
    Trip(Trip),
    UserTrips(Vec<TripWithEvents>),
}

pub async fn find_or_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TripLookup>, ApiError> {
    if let Some(trip) = state.store.trips.find_by_id(&TripId(id.clone())).await? {
        return Ok(Json(TripLookup::Trip(trip)));
    }

    let trips = state.store.trips.list_for_user(&UserId(id)).await?;
    let mut listed = Vec::with_capacity(trips.len());
    for trip in trips {
        let events = state.store.events.list_for_trip(&trip.id).await?;
        listed.push(TripWithEvents { trip, events });
    }
    Ok(Json(TripLookup::UserTrips(listed)))
}

pub async fn create(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<CreateTripRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Trip>), ApiError> {
    let Json(CreateTripRequest { trip_data }) = payload?;
    trip_data.validate()?;

    let user_id = UserId(user_id);
    if state.store.users.find_by_id(&user_id).await?.is_none() {
        return Err(ApiError::not_found("user", &user_id));
    }

    let trip = Trip::new(user_id, trip_data, Utc::now());
    state.store.trips.create(trip.clone()).await?;
    tracing::info!(
        event_name = "http.trip.created",
        trip_id = %trip.id,
        user_id = %trip.user_id,
        "trip created"
    );
    Ok((StatusCode::CREATED, Json(trip)))
}

/// Partial update. Dates may not move so far that a booked event falls
/// outside the trip.
pub async fn update(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    payload: Result<Json<TripPatch>, JsonRejection>,
) -> Result<Json<Trip>, ApiError> {
    let Json(patch) = payload?;
    let trip_id = TripId(trip_id);
    let mut trip = state
        .store
        .trips
        .find_by_id(&trip_id)
        .await?
        .ok_or_else(|| ApiError::not_found("trip", &trip_id))?;

    trip.apply(&patch)?;
    for event in state.store.events.list_for_trip(&trip.id).await? {
        trip.ensure_contains(event.start_date, event.end_date)?;
    }

    state.store.trips.update(&trip).await?;
    Ok(Json(trip))
}

/// Removes the trip with its events; a missing trip is not an error.
pub async fn delete(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let trip_id = TripId(trip_id);
    let existed = state.store.trips.delete(&trip_id).await?;
    tracing::info!(event_name = "http.trip.deleted", trip_id = %trip_id, existed, "trip deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::Json;
    use chrono::Utc;
    use serde_json::json;

    use tripchat_core::domain::event::{Event, EventType};
    use tripchat_core::domain::trip::TripPatch;

    use super::{delete, find_or_list, update, TripLookup};
    use crate::app::test_support::{
        app, date, empty_request, insert_trip, insert_user, json_request, new_event, send, state,
    };

    #[tokio::test]
    async fn create_returns_created_trip() {
        let state = state();
        let user = insert_user(&state, "ana").await;

        let (status, body) = send(
            app(state),
            json_request(
                "POST",
                &format!("/api/trips/{}", user.id),
                &json!({"tripData": {
                    "trip_name": "Porto", "trip_destination": "Porto",
                    "trip_start_date": "2026-07-01", "trip_end_date": "2026-07-03"
                }}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["trip_name"], "Porto");
        assert_eq!(body["user_id"], user.id.as_str());
    }

    #[tokio::test]
    async fn create_rejects_inverted_dates_and_unknown_users() {
        let state = state();
        let user = insert_user(&state, "ana").await;
        let inverted = json!({"tripData": {
            "trip_name": "Porto", "trip_destination": "Porto",
            "trip_start_date": "2026-07-05", "trip_end_date": "2026-07-03"
        }});

        let (status, _) = send(
            app(state.clone()),
            json_request("POST", &format!("/api/trips/{}", user.id), &inverted),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            app(state),
            json_request("POST", "/api/trips/nobody", &json!({"tripData": {
                "trip_name": "Porto", "trip_destination": "Porto",
                "trip_start_date": "2026-07-01", "trip_end_date": "2026-07-03"
            }})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user `nobody` was not found");
    }

    #[tokio::test]
    async fn lookup_returns_trip_by_id_or_user_trips_with_events() {
        let state = state();
        let user = insert_user(&state, "ana").await;
        let trip = insert_trip(&state, &user).await;
        let event = Event::new(
            trip.id.clone(),
            user.id.clone(),
            new_event("Tram 28", EventType::Attraction, 5, (10, 11)),
            Utc::now(),
        );
        state.store.events.create(event).await.expect("event");

        let by_trip = find_or_list(State(state.clone()), Path(trip.id.to_string()))
            .await
            .expect("lookup")
            .0;
        assert!(matches!(by_trip, TripLookup::Trip(found) if found.id == trip.id));

        let (status, body) =
            send(app(state), empty_request("GET", &format!("/api/trips/{}", user.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["trip_id"], trip.id.as_str());
        assert_eq!(body[0]["events"][0]["event_name"], "Tram 28");
    }

    #[tokio::test]
    async fn update_cannot_shrink_trip_past_its_events() {
        let state = state();
        let user = insert_user(&state, "ana").await;
        let trip = insert_trip(&state, &user).await;
        let event = Event::new(
            trip.id.clone(),
            user.id.clone(),
            new_event("Fado night", EventType::LiveEvent, 7, (21, 23)),
            Utc::now(),
        );
        state.store.events.create(event).await.expect("event");

        let shrink = TripPatch { end_date: Some(date(2026, 6, 6)), ..TripPatch::default() };
        let error = update(State(state.clone()), Path(trip.id.to_string()), Ok(Json(shrink)))
            .await
            .expect_err("events would fall outside");
        assert_eq!(error.status, StatusCode::BAD_REQUEST);

        let rename = TripPatch { name: Some("Lisbon again".to_string()), ..TripPatch::default() };
        let renamed = update(State(state.clone()), Path(trip.id.to_string()), Ok(Json(rename)))
            .await
            .expect("rename")
            .0;
        assert_eq!(renamed.name, "Lisbon again");
        assert_eq!(renamed.end_date, trip.end_date);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let state = state();
        let user = insert_user(&state, "ana").await;
        let trip = insert_trip(&state, &user).await;

        for _ in 0..2 {
            let status = delete(State(state.clone()), Path(trip.id.to_string())).await.expect("delete");
            assert_eq!(status, StatusCode::NO_CONTENT);
        }
        assert!(state.store.trips.find_by_id(&trip.id).await.expect("lookup").is_none());
    }
}
