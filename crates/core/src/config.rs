//! Layered configuration for every tripchat binary.
//!
//! Layers are merged in order: built-in defaults, the TOML file
//! (`tripchat.toml` or `config/tripchat.toml`, with `${VAR}` interpolation),
//! `TRIPCHAT_*` environment variables, then programmatic overrides. Every
//! layer is expressed as a `ConfigPatch` so they all merge the same way.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::MAX_SESSION_TTL_HOURS;

pub const DEFAULT_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Searched in order when no explicit path is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["tripchat.toml", "config/tripchat.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    /// Overrides the provider's public endpoint, e.g. a local
    /// OpenAI-compatible server.
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// The single browser origin allowed to call the API with credentials.
    pub allowed_origin: String,
    pub body_limit_bytes: usize,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub session_secret: SecretString,
    pub session_ttl_hours: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(alias = "google")]
    Gemini,
    #[serde(alias = "openai")]
    OpenAi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Values set by the caller; they win over file and environment.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub server_port: Option<u16>,
    pub session_secret: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("config file references `${{{var}}}` but it is not set")]
    MissingEnvInterpolation { var: String },
    #[error("config file has a `${{` without a closing `}}`")]
    UnterminatedInterpolation,
    #[error("environment variable `{key}` has an unusable value `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tripchat.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Gemini,
                api_key: None,
                base_url: None,
                model: "gemini-1.5-flash".to_string(),
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                allowed_origin: "http://localhost:5173".to_string(),
                body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
                graceful_shutdown_secs: 15,
            },
            auth: AuthConfig { session_secret: String::new().into(), session_ttl_hours: 24 * 7 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            other => Err(ConfigError::Validation(format!(
                "llm.provider `{other}` is not supported; use gemini or openai"
            ))),
        }
    }
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "logging.format `{other}` is not supported; use compact, pretty or json"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match find_config_file(options.config_path.as_deref()) {
            Some(path) => config.merge(read_file_patch(&path)?),
            None if options.require_file => {
                let expected = options
                    .config_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }
        config.merge(env_patch()?);
        config.merge(options.overrides.into());

        config.validate()?;
        Ok(config)
    }

    fn merge(&mut self, patch: ConfigPatch) {
        let ConfigPatch { database, llm, server, auth, logging } = patch;

        let database = database.unwrap_or_default();
        set(&mut self.database.url, database.url);
        set(&mut self.database.max_connections, database.max_connections);
        set(&mut self.database.timeout_secs, database.timeout_secs);

        let llm = llm.unwrap_or_default();
        set(&mut self.llm.provider, llm.provider);
        if let Some(key) = llm.api_key {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if llm.base_url.is_some() {
            self.llm.base_url = llm.base_url;
        }
        set(&mut self.llm.model, llm.model);
        set(&mut self.llm.timeout_secs, llm.timeout_secs);

        let server = server.unwrap_or_default();
        set(&mut self.server.bind_address, server.bind_address);
        set(&mut self.server.port, server.port);
        set(&mut self.server.allowed_origin, server.allowed_origin);
        set(&mut self.server.body_limit_bytes, server.body_limit_bytes);
        set(&mut self.server.graceful_shutdown_secs, server.graceful_shutdown_secs);

        let auth = auth.unwrap_or_default();
        if let Some(secret) = auth.session_secret {
            self.auth.session_secret = SecretString::from(secret);
        }
        set(&mut self.auth.session_ttl_hours, auth.session_ttl_hours);

        let logging = logging.unwrap_or_default();
        set(&mut self.logging.level, logging.level);
        set(&mut self.logging.format, logging.format);
    }

    /// Fails on the first problem, naming the key to fix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self { database, llm, server, auth, logging } = self;

        let url = database.url.trim();
        require(
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:",
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
        )?;
        require(database.max_connections > 0, "database.max_connections must be at least 1")?;
        require(
            (1..=300).contains(&database.timeout_secs),
            "database.timeout_secs must be between 1 and 300",
        )?;

        require((1..=300).contains(&llm.timeout_secs), "llm.timeout_secs must be between 1 and 300")?;
        require(!llm.model.trim().is_empty(), "llm.model must name a model")?;
        if let Some(base_url) = &llm.base_url {
            require(is_http_url(base_url), "llm.base_url must start with http:// or https://")?;
        }
        let has_key = llm.api_key.as_ref().is_some_and(|key| !key.expose_secret().trim().is_empty());
        match llm.provider {
            LlmProvider::Gemini => require(
                has_key,
                "llm.api_key is required for the gemini provider (set TRIPCHAT_LLM_API_KEY)",
            )?,
            // A self-hosted OpenAI-compatible endpoint may run without a key.
            LlmProvider::OpenAi => require(
                has_key || llm.base_url.is_some(),
                "llm.api_key is required for the openai provider unless llm.base_url is set",
            )?,
        }

        require(server.port > 0, "server.port must be greater than zero")?;
        require(
            is_http_url(&server.allowed_origin),
            "server.allowed_origin must be an http(s) origin such as http://localhost:5173",
        )?;
        require(server.body_limit_bytes >= 1024, "server.body_limit_bytes must be at least 1024")?;
        require(
            server.graceful_shutdown_secs > 0,
            "server.graceful_shutdown_secs must be greater than zero",
        )?;

        require(
            auth.session_secret.expose_secret().trim().len() >= 16,
            "auth.session_secret must be at least 16 characters (set TRIPCHAT_AUTH_SESSION_SECRET)",
        )?;
        require(
            (1..=MAX_SESSION_TTL_HOURS).contains(&auth.session_ttl_hours),
            "auth.session_ttl_hours must be between 1 and 8760 (one year)",
        )?;

        require(
            matches!(
                logging.level.trim().to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ),
            "logging.level must be one of trace, debug, info, warn, error",
        )
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn require(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Validation(message.to_string()))
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

fn read_file_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&interpolate(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${VAR}` with the variable's value.
fn interpolate(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);

    Ok(output)
}

/// First non-blank value among `keys`, with the key it came from.
fn env_value(keys: &[&'static str]) -> Option<(&'static str, String)> {
    keys.iter().find_map(|key| {
        env::var(key).ok().filter(|value| !value.trim().is_empty()).map(|value| (*key, value))
    })
}

fn env_parsed<T: FromStr>(keys: &[&'static str]) -> Result<Option<T>, ConfigError> {
    env_value(keys)
        .map(|(key, value)| {
            value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: value.clone(),
            })
        })
        .transpose()
}

fn env_string(keys: &[&'static str]) -> Option<String> {
    env_value(keys).map(|(_, value)| value)
}

fn env_patch() -> Result<ConfigPatch, ConfigError> {
    let provider: Option<LlmProvider> = env_string(&["TRIPCHAT_LLM_PROVIDER"]).map(|value| value.parse()).transpose()?;
    let format: Option<LogFormat> = env_string(&["TRIPCHAT_LOGGING_FORMAT", "TRIPCHAT_LOG_FORMAT"])
        .map(|value| value.parse())
        .transpose()?;

    Ok(ConfigPatch {
        database: Some(DatabasePatch {
            url: env_string(&["TRIPCHAT_DATABASE_URL"]),
            max_connections: env_parsed(&["TRIPCHAT_DATABASE_MAX_CONNECTIONS"])?,
            timeout_secs: env_parsed(&["TRIPCHAT_DATABASE_TIMEOUT_SECS"])?,
        }),
        llm: Some(LlmPatch {
            provider,
            api_key: env_string(&["TRIPCHAT_LLM_API_KEY"]),
            base_url: env_string(&["TRIPCHAT_LLM_BASE_URL"]),
            model: env_string(&["TRIPCHAT_LLM_MODEL"]),
            timeout_secs: env_parsed(&["TRIPCHAT_LLM_TIMEOUT_SECS"])?,
        }),
        server: Some(ServerPatch {
            bind_address: env_string(&["TRIPCHAT_SERVER_BIND_ADDRESS"]),
            port: env_parsed(&["TRIPCHAT_SERVER_PORT", "PORT"])?,
            allowed_origin: env_string(&["TRIPCHAT_SERVER_ALLOWED_ORIGIN"]),
            body_limit_bytes: env_parsed(&["TRIPCHAT_SERVER_BODY_LIMIT_BYTES"])?,
            graceful_shutdown_secs: env_parsed(&["TRIPCHAT_SERVER_GRACEFUL_SHUTDOWN_SECS"])?,
        }),
        auth: Some(AuthPatch {
            session_secret: env_string(&["TRIPCHAT_AUTH_SESSION_SECRET"]),
            session_ttl_hours: env_parsed(&["TRIPCHAT_AUTH_SESSION_TTL_HOURS"])?,
        }),
        logging: Some(LoggingPatch {
            level: env_string(&["TRIPCHAT_LOGGING_LEVEL", "TRIPCHAT_LOG_LEVEL"]),
            format,
        }),
    })
}

impl From<ConfigOverrides> for ConfigPatch {
    fn from(overrides: ConfigOverrides) -> Self {
        Self {
            database: Some(DatabasePatch { url: overrides.database_url, ..DatabasePatch::default() }),
            llm: Some(LlmPatch {
                provider: overrides.llm_provider,
                api_key: overrides.llm_api_key,
                model: overrides.llm_model,
                ..LlmPatch::default()
            }),
            server: Some(ServerPatch { port: overrides.server_port, ..ServerPatch::default() }),
            auth: Some(AuthPatch {
                session_secret: overrides.session_secret,
                ..AuthPatch::default()
            }),
            logging: Some(LoggingPatch { level: overrides.log_level, ..LoggingPatch::default() }),
        }
    }
}

/// One configuration layer; `None` leaves the lower layer's value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    auth: Option<AuthPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    allowed_origin: Option<String>,
    body_limit_bytes: Option<usize>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthPatch {
    session_secret: Option<String>,
    session_ttl_hours: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        interpolate, AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat,
    };

    const SECRET: &str = "0123456789abcdef0123";

    /// Every variable any test sets; cleared before and after each test.
    const TOUCHED: [&str; 13] = [
        "TRIPCHAT_LLM_API_KEY",
        "TRIPCHAT_AUTH_SESSION_TTL_HOURS",
        "TRIPCHAT_LLM_PROVIDER",
        "TRIPCHAT_LLM_BASE_URL",
        "TRIPCHAT_AUTH_SESSION_SECRET",
        "TRIPCHAT_DATABASE_URL",
        "TRIPCHAT_SERVER_ALLOWED_ORIGIN",
        "TRIPCHAT_SERVER_PORT",
        "TRIPCHAT_LOG_LEVEL",
        "TRIPCHAT_LOG_FORMAT",
        "TRIPCHAT_TEST_KEY",
        "TRIPCHAT_TEST_SECRET",
        "PORT",
    ];

    fn env_guard() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_env<T>(vars: &[(&str, &str)], body: impl FnOnce() -> T) -> T {
        let _guard = env_guard();
        TOUCHED.iter().for_each(|key| env::remove_var(key));
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = body();
        TOUCHED.iter().for_each(|key| env::remove_var(key));
        result
    }

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("tripchat.toml");
        fs::write(&path, body).expect("write config");
        path
    }

    fn load_from(path: PathBuf) -> Result<AppConfig, ConfigError> {
        AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
    }

    #[test]
    fn file_values_interpolate_environment() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            "[llm]\napi_key = \"${TRIPCHAT_TEST_KEY}\"\n\n[auth]\nsession_secret = \"${TRIPCHAT_TEST_SECRET}\"\n",
        );

        let config = with_env(
            &[("TRIPCHAT_TEST_KEY", "key-from-env"), ("TRIPCHAT_TEST_SECRET", "secret-from-env-0001")],
            || load_from(path),
        )
        .expect("config loads");

        assert_eq!(config.llm.api_key.as_ref().map(|key| key.expose_secret()), Some("key-from-env"));
        assert_eq!(config.auth.session_secret.expose_secret(), "secret-from-env-0001");
    }

    #[test]
    fn interpolation_reports_missing_and_unterminated_variables() {
        with_env(&[], || {
            assert!(matches!(
                interpolate("key = \"${TRIPCHAT_TEST_KEY}\""),
                Err(ConfigError::MissingEnvInterpolation { var }) if var == "TRIPCHAT_TEST_KEY"
            ));
            assert!(matches!(interpolate("key = \"${OPEN"), Err(ConfigError::UnterminatedInterpolation)));
            assert_eq!(interpolate("cost = \"$5\"").expect("plain dollar"), "cost = \"$5\"");
        });
    }

    #[test]
    fn layers_apply_defaults_then_file_then_env_then_overrides() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
[database]
url = "sqlite://from-file.db"

[llm]
provider = "openai"
base_url = "http://localhost:11434/v1"

[server]
port = 8088
allowed_origin = "http://from-file:5173"

[logging]
level = "warn"
"#,
        );

        let config = with_env(
            &[
                ("TRIPCHAT_AUTH_SESSION_SECRET", SECRET),
                ("TRIPCHAT_DATABASE_URL", "sqlite://from-env.db"),
                ("TRIPCHAT_SERVER_ALLOWED_ORIGIN", "https://travel.example.com"),
            ],
            || {
                AppConfig::load(LoadOptions {
                    config_path: Some(path),
                    overrides: ConfigOverrides {
                        database_url: Some("sqlite://from-override.db".to_string()),
                        log_level: Some("debug".to_string()),
                        ..ConfigOverrides::default()
                    },
                    ..LoadOptions::default()
                })
            },
        )
        .expect("config loads");

        assert_eq!(config.database.url, "sqlite://from-override.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.allowed_origin, "https://travel.example.com");
        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.timeout_secs, 30);
    }

    #[test]
    fn logging_aliases_and_platform_port_are_read() {
        let config = with_env(
            &[
                ("TRIPCHAT_LLM_API_KEY", "gemini-test-key"),
                ("TRIPCHAT_AUTH_SESSION_SECRET", SECRET),
                ("TRIPCHAT_LOG_LEVEL", "warn"),
                ("TRIPCHAT_LOG_FORMAT", "json"),
                ("PORT", "8080"),
            ],
            || AppConfig::load(LoadOptions::default()),
        )
        .expect("config loads");

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn bad_values_fail_with_the_key_to_fix() {
        let short_secret = with_env(
            &[("TRIPCHAT_LLM_API_KEY", "gemini-test-key"), ("TRIPCHAT_AUTH_SESSION_SECRET", "short")],
            || AppConfig::load(LoadOptions::default()),
        );
        assert!(matches!(
            short_secret,
            Err(ConfigError::Validation(message)) if message.contains("auth.session_secret")
        ));

        let bad_port = with_env(
            &[
                ("TRIPCHAT_LLM_API_KEY", "gemini-test-key"),
                ("TRIPCHAT_AUTH_SESSION_SECRET", SECRET),
                ("TRIPCHAT_SERVER_PORT", "eighty"),
            ],
            || AppConfig::load(LoadOptions::default()),
        );
        assert!(matches!(
            bad_port,
            Err(ConfigError::InvalidEnvOverride { key, .. }) if key == "TRIPCHAT_SERVER_PORT"
        ));

        let missing_key = with_env(&[("TRIPCHAT_AUTH_SESSION_SECRET", SECRET)], || {
            AppConfig::load(LoadOptions::default())
        });
        assert!(matches!(
            missing_key,
            Err(ConfigError::Validation(message)) if message.contains("llm.api_key")
        ));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, "[server]\nprot = 8080\n");

        let result = with_env(&[], || load_from(path));

        assert!(matches!(result, Err(ConfigError::ParseFile { .. })));
    }

    #[test]
    fn required_file_must_exist() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("absent.toml");

        let result = with_env(&[], || {
            AppConfig::load(LoadOptions {
                config_path: Some(missing.clone()),
                require_file: true,
                ..LoadOptions::default()
            })
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(path)) if path == missing));
    }

    #[test]
    fn openai_with_local_endpoint_needs_no_key() {
        let config = with_env(
            &[
                ("TRIPCHAT_AUTH_SESSION_SECRET", SECRET),
                ("TRIPCHAT_LLM_PROVIDER", "openai"),
                ("TRIPCHAT_LLM_BASE_URL", "http://localhost:11434/v1"),
            ],
            || AppConfig::load(LoadOptions::default()),
        )
        .expect("config loads");

        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn session_lifetime_is_bounded_to_a_year() {
        let load = |hours: &str| {
            with_env(
                &[
                    ("TRIPCHAT_LLM_API_KEY", "key"),
                    ("TRIPCHAT_AUTH_SESSION_SECRET", SECRET),
                    ("TRIPCHAT_AUTH_SESSION_TTL_HOURS", hours),
                ],
                || AppConfig::load(LoadOptions::default()),
            )
        };

        assert_eq!(load("8760").expect("one year is accepted").auth.session_ttl_hours, 8760);
        for hours in ["0", "8761", "18446744073709551615"] {
            let rejected = matches!(
                load(hours),
                Err(ConfigError::Validation(message)) if message.contains("session_ttl_hours")
            );
            assert!(rejected, "{hours} hours should be rejected");
        }
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = with_env(
            &[
                ("TRIPCHAT_LLM_API_KEY", "gemini-secret-value"),
                ("TRIPCHAT_AUTH_SESSION_SECRET", "session-secret-value"),
            ],
            || AppConfig::load(LoadOptions::default()),
        )
        .expect("config loads");

        let debug = format!("{config:?}");
        assert!(!debug.contains("gemini-secret-value"));
        assert!(!debug.contains("session-secret-value"));
        assert_eq!(config.logging.format, LogFormat::Compact);
    }
}
