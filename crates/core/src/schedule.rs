//! Overlap and duplicate rules for events sharing a trip.

use chrono::NaiveDateTime;

use crate::domain::event::{Event, EventType, NewEvent};

/// The comparable shape of an event, stored or proposed.
#[derive(Clone, Copy, Debug)]
pub struct Slot<'a> {
    pub name: &'a str,
    pub event_type: EventType,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl<'a> From<&'a Event> for Slot<'a> {
    fn from(event: &'a Event) -> Self {
        let (start, end) = event.window();
        Self { name: &event.name, event_type: event.event_type, start, end }
    }
}

impl<'a> From<&'a NewEvent> for Slot<'a> {
    fn from(event: &'a NewEvent) -> Self {
        let (start, end) = event.window();
        Self { name: &event.name, event_type: event.event_type, start, end }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Clash {
    /// Same booking entered twice.
    Duplicate,
    /// Two different bookings competing for the same time.
    Conflict,
}

/// Half-open windows overlap when they intersect; identical windows always
/// overlap, including zero-length ones.
pub fn overlaps(a: &Slot<'_>, b: &Slot<'_>) -> bool {
    (a.start == b.start && a.end == b.end) || (a.start < b.end && b.start < a.end)
}

pub fn normalize_name(name: &str) -> String {
    name.chars().filter(|ch| ch.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

fn same_booking(a: &Slot<'_>, b: &Slot<'_>) -> bool {
    if a.event_type != b.event_type {
        return false;
    }
    let left = normalize_name(a.name);
    let right = normalize_name(b.name);
    if left.is_empty() || right.is_empty() {
        return left == right;
    }
    left == right || left.contains(&right) || right.contains(&left)
}

impl Slot<'_> {
    /// Accommodation, or anything running past midnight. Other plans happen
    /// during a stay rather than competing with it.
    pub fn is_stay(&self) -> bool {
        self.event_type == EventType::Accommodation || self.start.date() != self.end.date()
    }
}

/// A stay only conflicts with another stay; it can still duplicate itself.
pub fn classify(a: &Slot<'_>, b: &Slot<'_>) -> Option<Clash> {
    if !overlaps(a, b) {
        return None;
    }
    if same_booking(a, b) {
        Some(Clash::Duplicate)
    } else if a.is_stay() != b.is_stay() {
        None
    } else {
        Some(Clash::Conflict)
    }
}

/// Every clashing pair among `events`, duplicates included.
pub fn conflicting_pairs(events: &[Event]) -> Vec<(&Event, &Event)> {
    let mut pairs = Vec::new();
    for (index, left) in events.iter().enumerate() {
        for right in &events[index + 1..] {
            if classify(&Slot::from(left), &Slot::from(right)).is_some() {
                pairs.push((left, right));
            }
        }
    }
    pairs
}
