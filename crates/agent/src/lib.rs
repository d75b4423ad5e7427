//! Agent Runtime - model-driven trip planning turns
//!
//! This crate is the part of tripchat that talks to the model and turns its
//! replies into changes to trips, events, preferences and conversations.
//!
//! # Architecture
//!
//! One chat turn runs as a fixed sequence:
//! 1. **Conversation resolution** (`conversation`) - reuse the user's own
//!    conversation or start a new one
//! 2. **Context assembly** (`context`) - history, active trip, preferences,
//!    rendered into a single prompt
//! 3. **Model call** (`llm`) - Gemini or an OpenAI-compatible endpoint
//! 4. **Sanitizing** - `tripchat_core::sanitize` recovers `{message, actions}`
//! 5. **Execution** (`executor`) - each action checked by `guardrails` and
//!    applied on its own
//!
//! `runtime::AgentRuntime` drives the sequence. `receipt` reuses the model
//! seam for single-shot receipt extraction.
//!
//! # Safety Principle
//!
//! The model proposes; it never decides. Date containment, duplicate
//! bookings and record ownership are checked deterministically before
//! anything is written.

pub mod context;
pub mod conversation;
pub mod executor;
pub mod guardrails;
pub mod llm;
pub mod receipt;
pub mod runtime;

pub use executor::{ActionExecutor, ActionOutcome};
pub use guardrails::GuardrailPolicy;
pub use llm::{LlmClient, LlmError};
pub use receipt::{Receipt, ReceiptAnalyzer, ReceiptError};
pub use runtime::{AgentRuntime, TurnError, TurnRequest, TurnResponse};
