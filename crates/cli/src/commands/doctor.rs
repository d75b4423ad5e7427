use chrono::Utc;
use serde::Serialize;
use tripchat_core::config::{AppConfig, LlmProvider, LoadOptions};
use tripchat_core::domain::user::UserId;
use tripchat_core::session::SessionSigner;
use tripchat_db::migrations::{count_schema_tables, SCHEMA_TABLES};

use super::connect;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Verdict {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct Finding {
    name: &'static str,
    status: Verdict,
    details: String,
}

impl Finding {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: Verdict::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: Verdict::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, because: &str) -> Self {
        Self { name, status: Verdict::Skipped, details: format!("skipped: {because}") }
    }
}

#[derive(Debug, Serialize)]
struct Diagnosis {
    overall_status: Verdict,
    summary: String,
    checks: Vec<Finding>,
}

impl Diagnosis {
    fn from_findings(checks: Vec<Finding>) -> Self {
        let failed = checks.iter().filter(|check| check.status != Verdict::Pass).count();
        let (overall_status, summary) = if failed == 0 {
            (Verdict::Pass, "tripchat is ready to serve chat turns".to_string())
        } else {
            (Verdict::Fail, format!("{failed} of {} checks need attention", checks.len()))
        };
        Self { overall_status, summary, checks }
    }

    fn render(&self) -> String {
        let mut lines = vec![self.summary.clone()];
        lines.extend(self.checks.iter().map(|check| {
            let marker = match check.status {
                Verdict::Pass => "ok",
                Verdict::Fail => "fail",
                Verdict::Skipped => "skip",
            };
            format!("- [{marker}] {}: {}", check.name, check.details)
        }));
        lines.join("\n")
    }
}

/// Checks run in order: config, model endpoint, database schema, session
/// signing. Later checks are skipped when the config does not load.
pub fn run(json_output: bool) -> String {
    let diagnosis = Diagnosis::from_findings(match AppConfig::load(LoadOptions::default()) {
        Ok(config) => vec![
            Finding::pass("config_validation", "configuration loaded and validated"),
            llm_endpoint(&config),
            database_schema(&config),
            session_signing(&config),
        ],
        Err(error) => {
            let mut findings = vec![Finding::fail("config_validation", error.to_string())];
            findings.extend(
                ["llm_readiness", "database_schema", "session_signing"]
                    .into_iter()
                    .map(|name| Finding::skipped(name, "configuration did not load")),
            );
            findings
        }
    });

    if !json_output {
        return diagnosis.render();
    }
    serde_json::to_string_pretty(&diagnosis).unwrap_or_else(|error| {
        serde_json::json!({
            "overall_status": "fail",
            "summary": "doctor output could not be serialized",
            "error": error.to_string(),
        })
        .to_string()
    })
}

fn llm_endpoint(config: &AppConfig) -> Finding {
    let endpoint = config.llm.base_url.clone().unwrap_or_else(|| {
        match config.llm.provider {
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com",
            LlmProvider::OpenAi => "https://api.openai.com/v1",
        }
        .to_string()
    });
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Finding::fail("llm_readiness", format!("`{endpoint}` is not an http(s) endpoint"));
    }
    Finding::pass(
        "llm_readiness",
        format!(
            "{} model `{}` at {endpoint}, {}s timeout",
            config.llm.provider.as_str(),
            config.llm.model,
            config.llm.timeout_secs
        ),
    )
}

fn database_schema(config: &AppConfig) -> Finding {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return Finding::fail("database_schema", format!("no async runtime: {error}")),
    };

    let found = runtime.block_on(async {
        let pool = connect(config).await.map_err(|(_, message, _)| message)?;
        let found = count_schema_tables(&pool).await.map_err(|error| error.to_string());
        pool.close().await;
        found
    });

    match found {
        Ok(found) if found == SCHEMA_TABLES.len() => Finding::pass(
            "database_schema",
            format!("`{}` has all {found} tables", config.database.url),
        ),
        Ok(found) => Finding::fail(
            "database_schema",
            format!("{found} of {} tables present; run `tripchat migrate`", SCHEMA_TABLES.len()),
        ),
        Err(error) => Finding::fail("database_schema", format!("database unavailable: {error}")),
    }
}

/// Signs and verifies a throwaway token so a bad secret shows up here rather
/// than as rejected logins.
fn session_signing(config: &AppConfig) -> Finding {
    let signer =
        SessionSigner::new(config.auth.session_secret.clone(), config.auth.session_ttl_hours);
    let probe = UserId("doctor-probe".to_string());
    let now = Utc::now();
    let verified = signer
        .issue(&probe, now)
        .map_err(|error| error.to_string())
        .and_then(|token| signer.verify(&token, now).map_err(|error| error.to_string()));

    match verified {
        Ok(subject) if subject == probe => Finding::pass(
            "session_signing",
            format!("tokens valid for {}h", config.auth.session_ttl_hours),
        ),
        Ok(subject) => {
            Finding::fail("session_signing", format!("token verified as `{subject}`"))
        }
        Err(error) => Finding::fail("session_signing", error),
    }
}
