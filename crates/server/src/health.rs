use std::time::Instant;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tripchat_db::migrations::{count_schema_tables, SCHEMA_TABLES};
use tripchat_db::DbPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

/// One probed dependency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentCheck {
    pub component: &'static str,
    pub readiness: Readiness,
    pub detail: String,
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: Readiness,
    pub version: &'static str,
    pub checks: Vec<ComponentCheck>,
    pub checked_at: DateTime<Utc>,
}

#[cfg(test)]
impl HealthReport {
    fn check(&self, component: &str) -> Option<&ComponentCheck> {
        self.checks.iter().find(|check| check.component == component)
    }
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(db_pool)
}

/// 200 only when the database answers and the schema is fully migrated.
pub async fn health(State(pool): State<DbPool>) -> (StatusCode, Json<HealthReport>) {
    let checks = vec![probe_connection(&pool).await, probe_schema(&pool).await];
    let status = if checks.iter().all(|check| check.readiness == Readiness::Ready) {
        Readiness::Ready
    } else {
        Readiness::Degraded
    };

    if status == Readiness::Degraded {
        for check in checks.iter().filter(|check| check.readiness == Readiness::Degraded) {
            tracing::warn!(
                event_name = "system.health.degraded",
                component = check.component,
                detail = %check.detail,
                "health probe failed"
            );
        }
    }

    let report =
        HealthReport { status, version: env!("CARGO_PKG_VERSION"), checks, checked_at: Utc::now() };
    let code = match status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

async fn probe_connection(pool: &DbPool) -> ComponentCheck {
    let started = Instant::now();
    let outcome = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await;
    let (readiness, detail) = match outcome {
        Ok(_) => (Readiness::Ready, "sqlite reachable".to_string()),
        Err(error) => (Readiness::Degraded, format!("sqlite unreachable: {error}")),
    };
    ComponentCheck { component: "database", readiness, detail, elapsed_ms: elapsed_ms(started) }
}

async fn probe_schema(pool: &DbPool) -> ComponentCheck {
    let started = Instant::now();
    let (readiness, detail) = match count_schema_tables(pool).await {
        Ok(found) if found == SCHEMA_TABLES.len() => {
            (Readiness::Ready, format!("{found} tables present"))
        }
        Ok(found) => (
            Readiness::Degraded,
            format!("{found} of {} tables present; migrations pending", SCHEMA_TABLES.len()),
        ),
        Err(error) => (Readiness::Degraded, format!("schema lookup failed: {error}")),
    };
    ComponentCheck { component: "schema", readiness, detail, elapsed_ms: elapsed_ms(started) }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
