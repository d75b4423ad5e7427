//! The action catalog the model may emit, parsed into a closed sum type.
//!
//! The model's reply carries loosely typed `{type, params}` objects. Each one
//! is converted into an [`Action`] variant whose payload already passed
//! required-field and format checks, so the executor only deals with domain
//! invariants that need the store (trip containment, ownership, overlaps).

use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::conversation::ConversationId;
use crate::domain::event::{clock_time, EventId, EventPatch, EventType, NewEvent};
use crate::domain::trip::{NewTrip, TripId, TripPatch};
use crate::domain::user::PreferencesPatch;
use crate::errors::DomainError;

/// An action exactly as the model wrote it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub params: Value,
}

impl RawAction {
    /// Lenient conversion from an arbitrary array element. Anything that is
    /// not an object with a string `type` becomes an action of unknown kind.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        Self {
            kind: object.get("type").and_then(Value::as_str).unwrap_or_default().to_string(),
            params: object.get("params").cloned().unwrap_or(Value::Null),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    TripCreate,
    TripUpdate,
    TripDelete,
    EventAdd,
    EventUpdate,
    EventDelete,
    PrefUpdate,
    ConversationUpdate,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        Self::TripCreate,
        Self::TripUpdate,
        Self::TripDelete,
        Self::EventAdd,
        Self::EventUpdate,
        Self::EventDelete,
        Self::PrefUpdate,
        Self::ConversationUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TripCreate => "TRIP_CREATE",
            Self::TripUpdate => "TRIP_UPDATE",
            Self::TripDelete => "TRIP_DELETE",
            Self::EventAdd => "EVENT_ADD",
            Self::EventUpdate => "EVENT_UPDATE",
            Self::EventDelete => "EVENT_DELETE",
            Self::PrefUpdate => "PREF_UPDATE",
            Self::ConversationUpdate => "CONVERSATION_UPDATE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|kind| kind.as_str().eq_ignore_ascii_case(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    TripCreate(NewTrip),
    TripUpdate { trip_id: Option<TripId>, patch: TripPatch },
    TripDelete { trip_id: TripId },
    EventAdd { trip_id: Option<TripId>, event: NewEvent },
    EventUpdate { trip_id: Option<TripId>, event_id: EventId, patch: EventPatch },
    EventDelete { trip_id: Option<TripId>, event_id: EventId },
    PrefUpdate(PreferencesPatch),
    ConversationUpdate { conversation_id: Option<ConversationId>, title: Option<String> },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("unknown action type `{0}`")]
    UnknownType(String),
    #[error("action params must be a JSON object")]
    ParamsNotObject,
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::TripCreate(_) => ActionKind::TripCreate,
            Self::TripUpdate { .. } => ActionKind::TripUpdate,
            Self::TripDelete { .. } => ActionKind::TripDelete,
            Self::EventAdd { .. } => ActionKind::EventAdd,
            Self::EventUpdate { .. } => ActionKind::EventUpdate,
            Self::EventDelete { .. } => ActionKind::EventDelete,
            Self::PrefUpdate(_) => ActionKind::PrefUpdate,
            Self::ConversationUpdate { .. } => ActionKind::ConversationUpdate,
        }
    }

    pub fn from_raw(raw: &RawAction) -> Result<Self, ActionError> {
        let kind =
            ActionKind::parse(&raw.kind).ok_or_else(|| ActionError::UnknownType(raw.kind.clone()))?;
        let empty = Map::new();
        let params = match &raw.params {
            Value::Object(map) => Params(map),
            Value::Null => Params(&empty),
            _ => return Err(ActionError::ParamsNotObject),
        };

        let action = match kind {
            ActionKind::TripCreate => {
                let trip = NewTrip {
                    name: params.required_text("trip_name")?,
                    destination: params.required_text("trip_destination")?,
                    start_date: params.required_date("trip_start_date")?,
                    end_date: params.required_date("trip_end_date")?,
                };
                trip.validate()?;
                Self::TripCreate(trip)
            }
            ActionKind::TripUpdate => Self::TripUpdate {
                trip_id: params.id("trip_id").map(TripId),
                patch: TripPatch {
                    name: params.text("trip_name"),
                    destination: params.text("trip_destination"),
                    start_date: params.date("trip_start_date")?,
                    end_date: params.date("trip_end_date")?,
                },
            },
            ActionKind::TripDelete => Self::TripDelete {
                trip_id: params.id("trip_id").map(TripId).ok_or_else(|| DomainError::missing("trip_id"))?,
            },
            ActionKind::EventAdd => {
                let event = NewEvent {
                    name: params.required_text("event_name")?,
                    event_type: params
                        .event_type()?
                        .ok_or_else(|| DomainError::missing("event_type"))?,
                    start_date: params.required_date("event_start_date")?,
                    end_date: params.required_date("event_end_date")?,
                    start_time: params
                        .time("event_start_time")?
                        .ok_or_else(|| DomainError::missing("event_start_time"))?,
                    end_time: params
                        .time("event_end_time")?
                        .ok_or_else(|| DomainError::missing("event_end_time"))?,
                    description: params.text("event_description"),
                    location: params.text("event_location"),
                    cost: params.cost()?,
                    currency: params.text("event_currency"),
                };
                event.validate()?;
                Self::EventAdd { trip_id: params.id("trip_id").map(TripId), event }
            }
            ActionKind::EventUpdate => Self::EventUpdate {
                trip_id: params.id("trip_id").map(TripId),
                event_id: params
                    .id("event_id")
                    .map(EventId)
                    .ok_or_else(|| DomainError::missing("event_id"))?,
                patch: EventPatch {
                    name: params.text("event_name"),
                    event_type: params.event_type()?,
                    start_date: params.date("event_start_date")?,
                    end_date: params.date("event_end_date")?,
                    start_time: params.time("event_start_time")?,
                    end_time: params.time("event_end_time")?,
                    description: params.text("event_description"),
                    location: params.text("event_location"),
                    cost: params.cost()?,
                    currency: params.text("event_currency"),
                },
            },
            ActionKind::EventDelete => Self::EventDelete {
                trip_id: params.id("trip_id").map(TripId),
                event_id: params
                    .id("event_id")
                    .map(EventId)
                    .ok_or_else(|| DomainError::missing("event_id"))?,
            },
            ActionKind::PrefUpdate => Self::PrefUpdate(PreferencesPatch {
                name: params.text("user_name"),
                currency: params.text("user_currency"),
                language: params.text("user_language"),
                personalization: params.text("user_personalization"),
            }),
            ActionKind::ConversationUpdate => Self::ConversationUpdate {
                conversation_id: params.id("conversation_id").map(ConversationId),
                title: params.text("conversation_title"),
            },
        };
        Ok(action)
    }
}

/// Typed reads over a params object. Absent, `null` and blank values all
/// count as "not provided".
struct Params<'a>(&'a Map<String, Value>);

impl Params<'_> {
    fn present(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }

    fn text(&self, key: &str) -> Option<String> {
        match self.present(key)? {
            Value::String(text) => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    fn required_text(&self, key: &str) -> Result<String, DomainError> {
        self.text(key).ok_or_else(|| DomainError::missing(key))
    }

    /// Ids arrive as strings or, occasionally, bare numbers.
    fn id(&self, key: &str) -> Option<String> {
        match self.present(key)? {
            Value::String(text) => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    fn date(&self, key: &str) -> Result<Option<NaiveDate>, DomainError> {
        let Some(raw) = self.text(key) else {
            return Ok(None);
        };
        parse_date(&raw)
            .map(Some)
            .ok_or_else(|| DomainError::invalid(key, format!("`{raw}` is not a YYYY-MM-DD date")))
    }

    fn required_date(&self, key: &str) -> Result<NaiveDate, DomainError> {
        self.date(key)?.ok_or_else(|| DomainError::missing(key))
    }

    fn time(&self, key: &str) -> Result<Option<NaiveTime>, DomainError> {
        let Some(raw) = self.text(key) else {
            return Ok(None);
        };
        clock_time::parse(&raw)
            .map(Some)
            .ok_or_else(|| DomainError::invalid(key, format!("`{raw}` is not an HH:MM time")))
    }

    fn event_type(&self) -> Result<Option<EventType>, DomainError> {
        let Some(raw) = self.text("event_type") else {
            return Ok(None);
        };
        EventType::parse(&raw).map(Some).ok_or_else(|| {
            DomainError::invalid("event_type", format!("`{raw}` is not a supported event type"))
        })
    }

    fn cost(&self) -> Result<Option<Decimal>, DomainError> {
        let Some(value) = self.present("event_cost") else {
            return Ok(None);
        };
        let cost = match value {
            Value::Number(number) => parse_decimal(&number.to_string()),
            Value::String(text) => {
                let cleaned: String = text
                    .chars()
                    .filter(|ch| !matches!(ch, '$' | '€' | '£' | ',') && !ch.is_whitespace())
                    .collect();
                parse_decimal(&cleaned)
            }
            _ => None,
        };
        match cost {
            Some(cost) if cost.is_sign_negative() => {
                Err(DomainError::invalid("event_cost", "cost cannot be negative"))
            }
            Some(cost) => Ok(Some(cost)),
            None => Err(DomainError::invalid("event_cost", format!("`{value}` is not a number"))),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()))
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw).ok().or_else(|| Decimal::from_scientific(raw).ok())
}
