use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::event::Event;
use super::record_id;
use super::user::UserId;
use crate::errors::DomainError;

record_id!(TripId);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(rename = "trip_id")]
    pub id: TripId,
    pub user_id: UserId,
    #[serde(rename = "trip_name")]
    pub name: String,
    #[serde(rename = "trip_destination")]
    pub destination: String,
    #[serde(rename = "trip_start_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "trip_end_date")]
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripWithEvents {
    #[serde(flatten)]
    pub trip: Trip,
    pub events: Vec<Event>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NewTrip {
    #[serde(rename = "trip_name")]
    pub name: String,
    #[serde(rename = "trip_destination")]
    pub destination: String,
    #[serde(rename = "trip_start_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "trip_end_date")]
    pub end_date: NaiveDate,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TripPatch {
    #[serde(rename = "trip_name")]
    pub name: Option<String>,
    #[serde(rename = "trip_destination")]
    pub destination: Option<String>,
    #[serde(rename = "trip_start_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "trip_end_date")]
    pub end_date: Option<NaiveDate>,
}

impl NewTrip {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::missing("trip_name"));
        }
        if self.destination.trim().is_empty() {
            return Err(DomainError::missing("trip_destination"));
        }
        ensure_ordered(self.start_date, self.end_date)
    }
}

impl TripPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.destination.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

impl Trip {
    pub fn new(user_id: UserId, new_trip: NewTrip, now: DateTime<Utc>) -> Self {
        Self {
            id: TripId::generate(),
            user_id,
            name: new_trip.name,
            destination: new_trip.destination,
            start_date: new_trip.start_date,
            end_date: new_trip.end_date,
            created_at: now,
        }
    }

    /// Whether the inclusive date range `start..=end` lies inside the trip.
    pub fn contains(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= start && end <= self.end_date
    }

    pub fn ensure_contains(&self, start: NaiveDate, end: NaiveDate) -> Result<(), DomainError> {
        if self.contains(start, end) {
            return Ok(());
        }
        Err(DomainError::OutsideTrip {
            start,
            end,
            trip_start: self.start_date,
            trip_end: self.end_date,
        })
    }

    /// Merges the patch, refusing a result whose start falls after its end.
    pub fn apply(&mut self, patch: &TripPatch) -> Result<(), DomainError> {
        let start_date = patch.start_date.unwrap_or(self.start_date);
        let end_date = patch.end_date.unwrap_or(self.end_date);
        ensure_ordered(start_date, end_date)?;

        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(destination) = &patch.destination {
            self.destination = destination.clone();
        }
        self.start_date = start_date;
        self.end_date = end_date;
        Ok(())
    }
}

fn ensure_ordered(start: NaiveDate, end: NaiveDate) -> Result<(), DomainError> {
    if start > end {
        return Err(DomainError::InvertedDateRange { start, end });
    }
    Ok(())
}
