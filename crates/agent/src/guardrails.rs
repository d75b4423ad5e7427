use tripchat_core::domain::event::{Event, EventId, NewEvent};
use tripchat_core::domain::trip::Trip;
use tripchat_core::domain::user::UserId;
use tripchat_core::schedule::{classify, Clash, Slot};

/// A mutation the model asked for, described with everything the policy
/// needs to judge it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailIntent<'a> {
    AddEvent { trip: &'a Trip, proposed: &'a NewEvent, existing: &'a [Event] },
    MoveEvent { trip: &'a Trip, updated: &'a Event, existing: &'a [Event] },
    ResizeTrip { trip: &'a Trip, events: &'a [Event] },
    TouchRecord { entity: &'static str, owner: &'a UserId, actor: &'a UserId },
}

impl GuardrailIntent<'_> {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::AddEvent { .. } => "event.add",
            Self::MoveEvent { .. } => "event.update",
            Self::ResizeTrip { .. } => "trip.update",
            Self::TouchRecord { .. } => "record.touch",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    /// Stored anyway; the overlapping events are reported back so the next
    /// turn can ask the user which one to keep.
    AllowWithConflicts { conflicts: Vec<EventId> },
    /// The proposal repeats an event already booked; nothing is written.
    Discard { reason_code: &'static str, duplicate_of: EventId },
    Deny { reason_code: &'static str, user_message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub enforce_trip_dates: bool,
    pub discard_duplicates: bool,
    pub enforce_ownership: bool,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { enforce_trip_dates: true, discard_duplicates: true, enforce_ownership: true }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(&self, intent: &GuardrailIntent<'_>) -> GuardrailDecision {
        match intent {
            GuardrailIntent::AddEvent { trip, proposed, existing } => {
                if let Some(denied) = self.outside_trip(trip, proposed.start_date, proposed.end_date)
                {
                    return denied;
                }
                let slot = Slot::from(*proposed);
                let mut conflicts = Vec::new();
                for event in existing.iter() {
                    match classify(&slot, &Slot::from(event)) {
                        Some(Clash::Duplicate) if self.discard_duplicates => {
                            return GuardrailDecision::Discard {
                                reason_code: "duplicate_booking",
                                duplicate_of: event.id.clone(),
                            };
                        }
                        Some(_) => conflicts.push(event.id.clone()),
                        None => {}
                    }
                }
                with_conflicts(conflicts)
            }
            GuardrailIntent::MoveEvent { trip, updated, existing } => {
                if let Some(denied) = self.outside_trip(trip, updated.start_date, updated.end_date) {
                    return denied;
                }
                let slot = Slot::from(*updated);
                let conflicts = existing
                    .iter()
                    .filter(|event| event.id != updated.id)
                    .filter(|event| classify(&slot, &Slot::from(*event)).is_some())
                    .map(|event| event.id.clone())
                    .collect();
                with_conflicts(conflicts)
            }
            GuardrailIntent::ResizeTrip { trip, events } => {
                if !self.enforce_trip_dates {
                    return GuardrailDecision::Allow;
                }
                match events.iter().find(|event| !trip.contains(event.start_date, event.end_date)) {
                    Some(event) => GuardrailDecision::Deny {
                        reason_code: "trip_excludes_events",
                        user_message: format!(
                            "The new trip dates {}..={} would leave `{}` ({}..={}) outside the trip.",
                            trip.start_date,
                            trip.end_date,
                            event.name,
                            event.start_date,
                            event.end_date
                        ),
                    },
                    None => GuardrailDecision::Allow,
                }
            }
            GuardrailIntent::TouchRecord { entity, owner, actor } => {
                if !self.enforce_ownership || owner == actor {
                    return GuardrailDecision::Allow;
                }
                GuardrailDecision::Deny {
                    reason_code: "foreign_record",
                    user_message: format!("That {entity} belongs to another user."),
                }
            }
        }
    }

    fn outside_trip(
        &self,
        trip: &Trip,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Option<GuardrailDecision> {
        if !self.enforce_trip_dates {
            return None;
        }
        trip.ensure_contains(start, end).err().map(|error| GuardrailDecision::Deny {
            reason_code: "event_outside_trip",
            user_message: error.to_string(),
        })
    }
}

fn with_conflicts(conflicts: Vec<EventId>) -> GuardrailDecision {
    if conflicts.is_empty() {
        GuardrailDecision::Allow
    } else {
        GuardrailDecision::AllowWithConflicts { conflicts }
    }
}
