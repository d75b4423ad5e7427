use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tripchat_cli::commands::{config, doctor, issue_token, migrate, user_add};

const SESSION_SECRET: &str = "cli-test-session-secret-0123";

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&valid_env("sqlite::memory:"), || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_without_session_secret() {
    with_env(&[("TRIPCHAT_LLM_API_KEY", "gemini-test-key")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("auth.session_secret"));
    });
}

#[test]
fn user_add_then_issue_token_round_trip_through_a_file_database() {
    let database = TempDatabase::new();
    with_env(&valid_env(&database.url()), || {
        let added = user_add::run("Ana", Some("ana@example.com"), Some("google-123"));
        assert_eq!(added.exit_code, 0, "user-add failed: {}", added.output);
        let added = parse_payload(&added.output);
        let user_id = added["data"]["user_id"].as_str().expect("user id").to_string();

        let again = parse_payload(&user_add::run("Ana B.", None, Some("google-123")).output);
        assert_eq!(again["data"]["user_id"], user_id.as_str(), "external id should be reused");

        let issued = issue_token::run(&user_id);
        assert_eq!(issued.exit_code, 0, "issue-token failed: {}", issued.output);
        let issued = parse_payload(&issued.output);
        let token = issued["data"]["token"].as_str().expect("token");
        assert!(token.starts_with(&format!("{user_id}.")));
        assert!(issued["data"]["expires_at"].is_string());
    });
}

#[test]
fn issue_token_rejects_unknown_users() {
    let database = TempDatabase::new();
    with_env(&valid_env(&database.url()), || {
        assert_eq!(migrate::run().exit_code, 0);

        let result = issue_token::run("no-such-user");
        assert_eq!(result.exit_code, 7);
        assert_eq!(parse_payload(&result.output)["error_class"], "unknown_user");
    });
}

#[test]
fn user_add_rejects_blank_names() {
    with_env(&valid_env("sqlite::memory:"), || {
        let result = user_add::run("  ", None, None);
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_argument");
    });
}

#[test]
fn doctor_reports_missing_schema_until_migrated() {
    let database = TempDatabase::new();
    with_env(&valid_env(&database.url()), || {
        let before: Value = serde_json::from_str(&doctor::run(true)).expect("doctor json");
        assert_eq!(before["overall_status"], "fail");
        assert_eq!(before["checks"][2]["name"], "database_schema");
        assert_eq!(before["checks"][2]["status"], "fail");

        assert_eq!(migrate::run().exit_code, 0);

        let after: Value = serde_json::from_str(&doctor::run(true)).expect("doctor json");
        assert_eq!(after["overall_status"], "pass");
        assert_eq!(after["checks"][1]["name"], "llm_readiness");
    });
}

#[test]
fn config_redacts_secrets_and_attributes_env_sources() {
    with_env(&valid_env("sqlite::memory:"), || {
        let output = config::run();

        assert!(output.contains("- database.url = sqlite::memory: (source: env (TRIPCHAT_DATABASE_URL))"));
        assert!(output.contains("- auth.session_secret = cli-***"));
        assert!(output.contains("- llm.api_key = gemi***"));
        assert!(!output.contains(SESSION_SECRET));
        assert!(output.contains("- server.port = 3000 (source: default)"));
    });
}

fn valid_env(database_url: &str) -> Vec<(&'static str, String)> {
    vec![
        ("TRIPCHAT_DATABASE_URL", database_url.to_string()),
        ("TRIPCHAT_LLM_API_KEY", "gemini-test-key".to_string()),
        ("TRIPCHAT_AUTH_SESSION_SECRET", SESSION_SECRET.to_string()),
    ]
}

struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    fn new() -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
        let path =
            env::temp_dir().join(format!("tripchat-cli-{}-{nanos}.db", std::process::id()));
        Self { path }
    }

    fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

fn with_env<K: AsRef<str>, V: AsRef<str>>(vars: &[(K, V)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TRIPCHAT_DATABASE_URL",
        "TRIPCHAT_DATABASE_MAX_CONNECTIONS",
        "TRIPCHAT_DATABASE_TIMEOUT_SECS",
        "TRIPCHAT_LLM_PROVIDER",
        "TRIPCHAT_LLM_API_KEY",
        "TRIPCHAT_LLM_BASE_URL",
        "TRIPCHAT_LLM_MODEL",
        "TRIPCHAT_LLM_TIMEOUT_SECS",
        "TRIPCHAT_SERVER_BIND_ADDRESS",
        "TRIPCHAT_SERVER_PORT",
        "PORT",
        "TRIPCHAT_SERVER_ALLOWED_ORIGIN",
        "TRIPCHAT_SERVER_BODY_LIMIT_BYTES",
        "TRIPCHAT_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "TRIPCHAT_AUTH_SESSION_SECRET",
        "TRIPCHAT_AUTH_SESSION_TTL_HOURS",
        "TRIPCHAT_LOGGING_LEVEL",
        "TRIPCHAT_LOGGING_FORMAT",
        "TRIPCHAT_LOG_LEVEL",
        "TRIPCHAT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key.as_ref(), value.as_ref());
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}
