use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::record_id;
use super::trip::TripId;
use super::user::UserId;
use crate::errors::DomainError;

record_id!(EventId);

/// Closed set of activity kinds an event may have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "flight")]
    Flight,
    #[serde(rename = "train trip")]
    TrainTrip,
    #[serde(rename = "bus trip")]
    BusTrip,
    #[serde(rename = "boat trip")]
    BoatTrip,
    #[serde(rename = "accommodation")]
    Accommodation,
    #[serde(rename = "live event")]
    LiveEvent,
    #[serde(rename = "restaurant")]
    Restaurant,
    #[serde(rename = "meeting")]
    Meeting,
    #[serde(rename = "museum")]
    Museum,
    #[serde(rename = "beach")]
    Beach,
    #[serde(rename = "park")]
    Park,
    #[serde(rename = "shopping")]
    Shopping,
    #[serde(rename = "attraction")]
    Attraction,
    #[serde(rename = "other")]
    Other,
}

impl EventType {
    pub const ALL: [EventType; 14] = [
        Self::Flight,
        Self::TrainTrip,
        Self::BusTrip,
        Self::BoatTrip,
        Self::Accommodation,
        Self::LiveEvent,
        Self::Restaurant,
        Self::Meeting,
        Self::Museum,
        Self::Beach,
        Self::Park,
        Self::Shopping,
        Self::Attraction,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::TrainTrip => "train trip",
            Self::BusTrip => "bus trip",
            Self::BoatTrip => "boat trip",
            Self::Accommodation => "accommodation",
            Self::LiveEvent => "live event",
            Self::Restaurant => "restaurant",
            Self::Meeting => "meeting",
            Self::Museum => "museum",
            Self::Beach => "beach",
            Self::Park => "park",
            Self::Shopping => "shopping",
            Self::Attraction => "attraction",
            Self::Other => "other",
        }
    }

    /// Case-insensitive lookup; `train_trip` and `Train Trip` both resolve.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        Self::ALL.into_iter().find(|kind| kind.as_str() == normalized)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "event_id")]
    pub id: EventId,
    pub trip_id: TripId,
    pub user_id: UserId,
    #[serde(rename = "event_name")]
    pub name: String,
    pub event_type: EventType,
    #[serde(rename = "event_start_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "event_end_date")]
    pub end_date: NaiveDate,
    #[serde(rename = "event_start_time", with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(rename = "event_end_time", with = "clock_time")]
    pub end_time: NaiveTime,
    #[serde(rename = "event_description")]
    pub description: Option<String>,
    #[serde(rename = "event_location")]
    pub location: Option<String>,
    #[serde(rename = "event_cost", with = "rust_decimal::serde::float_option", default)]
    pub cost: Option<Decimal>,
    #[serde(rename = "event_currency")]
    pub currency: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NewEvent {
    #[serde(rename = "event_name")]
    pub name: String,
    pub event_type: EventType,
    #[serde(rename = "event_start_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "event_end_date")]
    pub end_date: NaiveDate,
    #[serde(rename = "event_start_time", with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(rename = "event_end_time", with = "clock_time")]
    pub end_time: NaiveTime,
    #[serde(rename = "event_description", default)]
    pub description: Option<String>,
    #[serde(rename = "event_location", default)]
    pub location: Option<String>,
    #[serde(rename = "event_cost", with = "rust_decimal::serde::float_option", default)]
    pub cost: Option<Decimal>,
    #[serde(rename = "event_currency", default)]
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct EventPatch {
    #[serde(rename = "event_name")]
    pub name: Option<String>,
    pub event_type: Option<EventType>,
    #[serde(rename = "event_start_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "event_end_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "event_start_time", with = "clock_time::option", default)]
    pub start_time: Option<NaiveTime>,
    #[serde(rename = "event_end_time", with = "clock_time::option", default)]
    pub end_time: Option<NaiveTime>,
    #[serde(rename = "event_description")]
    pub description: Option<String>,
    #[serde(rename = "event_location")]
    pub location: Option<String>,
    #[serde(rename = "event_cost", with = "rust_decimal::serde::float_option", default)]
    pub cost: Option<Decimal>,
    #[serde(rename = "event_currency")]
    pub currency: Option<String>,
}

impl NewEvent {
    pub fn window(&self) -> (NaiveDateTime, NaiveDateTime) {
        (self.start_date.and_time(self.start_time), self.end_date.and_time(self.end_time))
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::missing("event_name"));
        }
        ensure_window(self.window())
    }
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Event {
    pub fn new(trip_id: TripId, user_id: UserId, new_event: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: EventId::generate(),
            trip_id,
            user_id,
            name: new_event.name,
            event_type: new_event.event_type,
            start_date: new_event.start_date,
            end_date: new_event.end_date,
            start_time: new_event.start_time,
            end_time: new_event.end_time,
            description: new_event.description,
            location: new_event.location,
            cost: new_event.cost,
            currency: new_event.currency,
            created_at: now,
        }
    }

    pub fn window(&self) -> (NaiveDateTime, NaiveDateTime) {
        (self.start_date.and_time(self.start_time), self.end_date.and_time(self.end_time))
    }

    /// Returns the merged event without touching `self`, so a rejected
    /// update leaves the stored record as it was.
    pub fn merged(&self, patch: &EventPatch) -> Result<Event, DomainError> {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(event_type) = patch.event_type {
            next.event_type = event_type;
        }
        if let Some(start_date) = patch.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            next.end_date = end_date;
        }
        if let Some(start_time) = patch.start_time {
            next.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            next.end_time = end_time;
        }
        if let Some(description) = &patch.description {
            next.description = Some(description.clone());
        }
        if let Some(location) = &patch.location {
            next.location = Some(location.clone());
        }
        if let Some(cost) = patch.cost {
            next.cost = Some(cost);
        }
        if let Some(currency) = &patch.currency {
            next.currency = Some(currency.clone());
        }
        ensure_window(next.window())?;
        Ok(next)
    }
}

fn ensure_window((start, end): (NaiveDateTime, NaiveDateTime)) -> Result<(), DomainError> {
    if end < start {
        return Err(DomainError::InvertedEventWindow { start, end });
    }
    Ok(())
}

/// Wall-clock times travel as `HH:MM`; `HH:MM:SS` is accepted on input.
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Option<NaiveTime> {
        let value = value.trim();
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }

    pub fn format(time: &NaiveTime) -> String {
        time.format("%H:%M").to_string()
    }

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time `{raw}`")))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid time `{raw}`"))),
            }
        }
    }
}
