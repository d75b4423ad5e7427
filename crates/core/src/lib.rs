pub mod actions;
pub mod config;
pub mod domain;
pub mod errors;
pub mod sanitizer;
pub mod schedule;
pub mod session;

pub use actions::{Action, ActionError, ActionKind, RawAction};
pub use domain::conversation::{
    Conversation, ConversationId, HistoryEntry, Message, MessageId, SenderRole,
};
pub use domain::event::{Event, EventId, EventPatch, EventType, NewEvent};
pub use domain::trip::{NewTrip, Trip, TripId, TripPatch, TripWithEvents};
pub use domain::user::{NewUser, PreferencesPatch, User, UserId, UserPreferences};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use sanitizer::{sanitize, ModelReply, ParseStrategy, Sanitized, FALLBACK_MESSAGE};
pub use session::{SessionError, SessionSigner};
