use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_LANGUAGE: &str = "en-US";

record_id!(UserId);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: UserId,
    pub external_id: Option<String>,
    #[serde(rename = "user_name")]
    pub name: String,
    #[serde(rename = "user_email")]
    pub email: Option<String>,
    #[serde(rename = "user_currency")]
    pub currency: String,
    #[serde(rename = "user_language")]
    pub language: String,
    #[serde(rename = "user_personalization")]
    pub personalization: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The slice of a user the model is allowed to see and change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(rename = "user_name")]
    pub name: String,
    #[serde(rename = "user_currency")]
    pub currency: String,
    #[serde(rename = "user_language")]
    pub language: String,
    #[serde(rename = "user_personalization")]
    pub personalization: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub external_id: Option<String>,
    #[serde(rename = "user_name")]
    pub name: String,
    #[serde(rename = "user_email")]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PreferencesPatch {
    #[serde(rename = "user_name")]
    pub name: Option<String>,
    #[serde(rename = "user_currency")]
    pub currency: Option<String>,
    #[serde(rename = "user_language")]
    pub language: Option<String>,
    #[serde(rename = "user_personalization")]
    pub personalization: Option<String>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.currency.is_none()
            && self.language.is_none()
            && self.personalization.is_none()
    }
}

impl User {
    pub fn new(new_user: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::generate(),
            external_id: new_user.external_id,
            name: new_user.name,
            email: new_user.email,
            currency: DEFAULT_CURRENCY.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            personalization: None,
            created_at: now,
        }
    }

    pub fn preferences(&self) -> UserPreferences {
        UserPreferences {
            name: self.name.clone(),
            currency: self.currency.clone(),
            language: self.language.clone(),
            personalization: self.personalization.clone(),
        }
    }

    pub fn apply(&mut self, patch: &PreferencesPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(currency) = &patch.currency {
            self.currency = currency.clone();
        }
        if let Some(language) = &patch.language {
            self.language = language.clone();
        }
        if let Some(personalization) = &patch.personalization {
            self.personalization = Some(personalization.clone());
        }
    }
}
