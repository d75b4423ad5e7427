use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tripchat_core::domain::conversation::{ConversationId, Message, SenderRole};
use tripchat_core::domain::trip::TripId;
use tripchat_core::domain::user::UserId;
use tripchat_core::errors::ApplicationError;
use tripchat_core::sanitizer::{sanitize, Sanitized};
use tripchat_db::{RepositoryError, Store};

use crate::context::ContextAssembler;
use crate::conversation::ConversationResolver;
use crate::executor::{ActionExecutor, ActionOutcome, ExecutionContext};
use crate::guardrails::GuardrailPolicy;
use crate::llm::{LlmClient, LlmError};

pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(30);

pub const MISSING_PARAMETERS: &str =
    "Missing required parameters. userId and message are required.";

/// Body of `POST /chat`. Every field is optional here so a missing one is
/// reported as a validation failure rather than a decode error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub trip_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub conversation_id: ConversationId,
    pub message: String,
    pub executed_actions: Vec<ActionOutcome>,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("{}", MISSING_PARAMETERS)]
    MissingParameters,
    #[error("user `{0}` was not found")]
    UnknownUser(UserId),
    #[error("model call failed: {0}")]
    Upstream(#[from] LlmError),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl From<TurnError> for ApplicationError {
    fn from(error: TurnError) -> Self {
        match error {
            TurnError::MissingParameters => Self::Validation(MISSING_PARAMETERS.to_string()),
            TurnError::UnknownUser(id) => Self::NotFound { entity: "user", id: id.to_string() },
            TurnError::Upstream(error) => Self::Upstream(error.to_string()),
            TurnError::Store(error) => error.into(),
        }
    }
}

/// Runs one chat turn end to end: resolve the conversation, build the
/// prompt, call the model, apply its actions, then record both messages.
pub struct AgentRuntime {
    store: Store,
    llm: Arc<dyn LlmClient>,
    resolver: ConversationResolver,
    assembler: ContextAssembler,
    executor: ActionExecutor,
    model_timeout: Duration,
}

impl AgentRuntime {
    pub fn new(store: Store, llm: Arc<dyn LlmClient>, guardrails: GuardrailPolicy) -> Self {
        Self {
            resolver: ConversationResolver::new(store.clone()),
            assembler: ContextAssembler::new(store.clone()),
            executor: ActionExecutor::new(store.clone(), guardrails),
            store,
            llm,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse, TurnError> {
        self.handle_turn_at(request, Utc::now()).await
    }

    pub async fn handle_turn_at(
        &self,
        request: TurnRequest,
        now: DateTime<Utc>,
    ) -> Result<TurnResponse, TurnError> {
        let (user_id, message) = match (non_blank(request.user_id), non_blank(request.message)) {
            (Some(user_id), Some(message)) => (UserId(user_id), message),
            _ => return Err(TurnError::MissingParameters),
        };
        let correlation_id = uuid::Uuid::new_v4().to_string();

        let user = self
            .store
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| TurnError::UnknownUser(user_id.clone()))?;

        let requested = non_blank(request.conversation_id).map(ConversationId);
        let conversation =
            self.resolver.resolve(&user.id, requested.as_ref(), now).await?.into_conversation();
        let trip_id =
            non_blank(request.trip_id).map(TripId).or_else(|| conversation.trip_id.clone());

        let (context, prompt) = self
            .assembler
            .assemble(&user, &conversation, trip_id.as_ref(), &message, now.date_naive())
            .await?;

        tracing::info!(
            event_name = "chat.turn.started",
            correlation_id = %correlation_id,
            user_id = %user.id,
            conversation_id = %conversation.id,
            active_trip = context.active_trip_id().map(TripId::as_str).unwrap_or(""),
            history = context.history.len(),
            "calling model"
        );
        let raw = match tokio::time::timeout(self.model_timeout, self.llm.complete(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.model_timeout)),
        }
        .map_err(|error| {
            tracing::error!(
                event_name = "chat.turn.upstream_failed",
                correlation_id = %correlation_id,
                conversation_id = %conversation.id,
                error = %error,
                "model call failed"
            );
            TurnError::Upstream(error)
        })?;

        let sanitized = sanitize(&raw);
        match &sanitized {
            Sanitized::Parsed { strategy, reply } => tracing::debug!(
                event_name = "chat.reply.parsed",
                correlation_id = %correlation_id,
                strategy = strategy.as_str(),
                actions = reply.actions.len(),
                "model reply parsed"
            ),
            Sanitized::Fallback { reason, .. } => tracing::warn!(
                event_name = "chat.reply.fallback",
                correlation_id = %correlation_id,
                reason = %reason,
                "model reply unreadable; using fallback"
            ),
        }
        let reply = sanitized.into_reply();

        let mut execution = ExecutionContext {
            user_id: user.id.clone(),
            conversation_id: conversation.id.clone(),
            current_trip: context.active_trip_id().cloned(),
            correlation_id: correlation_id.clone(),
        };
        let executed_actions = self.executor.execute(&mut execution, &reply.actions, now).await;

        self.store
            .messages
            .append(Message::new(conversation.id.clone(), SenderRole::User, message, now))
            .await?;
        let replied_at = Utc::now().max(now);
        self.store
            .messages
            .append(Message::new(
                conversation.id.clone(),
                SenderRole::Assistant,
                reply.message.clone(),
                replied_at,
            ))
            .await?;

        tracing::info!(
            event_name = "chat.turn.completed",
            correlation_id = %correlation_id,
            user_id = %user.id,
            conversation_id = %conversation.id,
            actions = executed_actions.len(),
            failed = executed_actions.iter().filter(|outcome| !outcome.success).count(),
            "turn completed"
        );

        Ok(TurnResponse {
            conversation_id: conversation.id,
            message: reply.message,
            executed_actions,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
