use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tracing::info;

use tripchat_agent::llm::{self, LlmError};
use tripchat_agent::{AgentRuntime, GuardrailPolicy, ReceiptAnalyzer};
use tripchat_core::config::{AppConfig, ConfigError};
use tripchat_core::session::SessionSigner;
use tripchat_db::{connect_with_settings, migrations, DbPool, Store};

use crate::app::{self, AppState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("model client could not be built: {0}")]
    Llm(#[source] LlmError),
    #[error("server.allowed_origin `{0}` is not a valid header value")]
    InvalidOrigin(String),
}

impl Application {
    pub fn router(&self) -> Result<Router, BootstrapError> {
        app::router(self.state.clone(), self.db_pool.clone(), &self.config.server)
            .map_err(|_| BootstrapError::InvalidOrigin(self.config.server.allowed_origin.clone()))
    }
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        llm_model = %config.llm.model,
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let llm = llm::from_config(&config.llm).map_err(BootstrapError::Llm)?;
    let model_timeout = Duration::from_secs(config.llm.timeout_secs);
    let store = Store::sql(db_pool.clone());

    let state = AppState {
        runtime: Arc::new(
            AgentRuntime::new(store.clone(), llm.clone(), GuardrailPolicy::default())
                .with_model_timeout(model_timeout),
        ),
        receipts: Arc::new(ReceiptAnalyzer::new(llm, model_timeout)),
        sessions: Arc::new(SessionSigner::new(
            config.auth.session_secret.clone(),
            config.auth.session_ttl_hours,
        )),
        store,
    };

    Ok(Application { config, db_pool, state })
}
