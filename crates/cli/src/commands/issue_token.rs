use chrono::Utc;
use serde_json::json;

use tripchat_core::domain::user::UserId;
use tripchat_core::session::SessionSigner;
use tripchat_db::Store;

use crate::commands::{connect, load_config, runtime, CommandResult, StepError};

/// Mints a session token for an existing user, for use as the `auth_token`
/// cookie or a bearer header.
pub fn run(user_id: &str) -> CommandResult {
    let config = match load_config("issue-token") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("issue-token") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let user_id = UserId(user_id.trim().to_string());
    let lookup = runtime.block_on(async {
        let pool = connect(&config).await?;
        let found = Store::sql(pool.clone())
            .users
            .find_by_id(&user_id)
            .await
            .map_err(|error| ("store", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, StepError>(found)
    });
    match lookup {
        Ok(Some(_)) => {}
        Ok(None) => {
            return CommandResult::failure(
                "issue-token",
                "unknown_user",
                format!("user `{user_id}` was not found"),
                7,
            );
        }
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("issue-token", error_class, message, exit_code);
        }
    }

    let signer = SessionSigner::new(config.auth.session_secret.clone(), config.auth.session_ttl_hours);
    let now = Utc::now();
    match signer.issue(&user_id, now) {
        Ok(token) => CommandResult::success_with(
            "issue-token",
            format!("session token issued for `{user_id}`"),
            Some(json!({
                "user_id": user_id,
                "token": token,
                "expires_at": (now + signer.ttl()).to_rfc3339(),
            })),
        ),
        Err(error) => CommandResult::failure("issue-token", "signing", error.to_string(), 8),
    }
}
