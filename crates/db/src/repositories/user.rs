use sqlx::{sqlite::SqliteRow, Row};

use tripchat_core::domain::user::{PreferencesPatch, User, UserId};

use super::codec::{encode_timestamp, parse_timestamp};
use super::{RepositoryError, UserRepository};
use crate::DbPool;

const USER_COLUMNS: &str = "user_id, external_id, user_name, user_email, user_currency,
    user_language, user_personalization, created_at";

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = ?"))
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(user_from_row).transpose()
    }

    async fn create(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (
                user_id,
                external_id,
                user_name,
                user_email,
                user_currency,
                user_language,
                user_personalization,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.as_str())
        .bind(user.external_id.as_deref())
        .bind(&user.name)
        .bind(user.email.as_deref())
        .bind(&user.currency)
        .bind(&user.language)
        .bind(user.personalization.as_deref())
        .bind(encode_timestamp(&user.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_preferences(
        &self,
        id: &UserId,
        patch: &PreferencesPatch,
    ) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET
                user_name = COALESCE(?, user_name),
                user_currency = COALESCE(?, user_currency),
                user_language = COALESCE(?, user_language),
                user_personalization = COALESCE(?, user_personalization)
             WHERE user_id = ?",
        )
        .bind(patch.name.as_deref())
        .bind(patch.currency.as_deref())
        .bind(patch.language.as_deref())
        .bind(patch.personalization.as_deref())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("user", id));
        }

        self.find_by_id(id).await?.ok_or_else(|| RepositoryError::not_found("user", id))
    }
}

fn user_from_row(row: SqliteRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId(row.try_get("user_id")?),
        external_id: row.try_get("external_id")?,
        name: row.try_get("user_name")?,
        email: row.try_get("user_email")?,
        currency: row.try_get("user_currency")?,
        language: row.try_get("user_language")?,
        personalization: row.try_get("user_personalization")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
