use chrono::Utc;
use serde_json::json;

use tripchat_core::domain::user::NewUser;
use tripchat_db::{migrations, Store};

use crate::commands::{connect, load_config, runtime, CommandResult, StepError};

/// Registers a user the way the login flow would: an existing user with the
/// same external id is returned instead of creating a second one.
pub fn run(name: &str, email: Option<&str>, external_id: Option<&str>) -> CommandResult {
    if name.trim().is_empty() {
        return CommandResult::failure("user-add", "invalid_argument", "--name must not be empty", 2);
    }
    let config = match load_config("user-add") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("user-add") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let new_user = NewUser {
        external_id: external_id.map(str::to_string),
        name: name.trim().to_string(),
        email: email.map(str::to_string),
    };
    let result = runtime.block_on(async {
        let pool = connect(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let user = Store::sql(pool.clone())
            .users
            .find_or_create(new_user, Utc::now())
            .await
            .map_err(|error| ("store", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, StepError>(user)
    });

    match result {
        Ok(user) => CommandResult::success_with(
            "user-add",
            format!("user `{}` ready", user.id),
            Some(json!({ "user_id": user.id, "user_name": user.name })),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("user-add", error_class, message, exit_code)
        }
    }
}
