use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of a saved account.
///
/// Stored as a plain string so identifiers written by earlier app versions
/// keep loading unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn generate() -> Self {
        Self(format!("account_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A login identity previously used on this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAccount {
    pub id: AccountId,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub last_login_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_default: bool,
}

impl SavedAccount {
    /// Creates a record for a phone number seen for the first time
    pub fn from_draft(draft: AccountDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::generate(),
            phone_number: draft.phone_number,
            name: draft.name,
            avatar: draft.avatar,
            last_login_date: now,
            is_default: draft.is_default.unwrap_or(false),
        }
    }

    /// Applies a repeated login to an existing record.
    ///
    /// The id is kept and every other field takes the draft's value: an
    /// absent name or avatar clears it, an absent default flag means not
    /// default. The login date never moves backwards.
    pub fn merge(&self, draft: AccountDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id.clone(),
            phone_number: draft.phone_number,
            name: draft.name,
            avatar: draft.avatar,
            last_login_date: now.max(self.last_login_date),
            is_default: draft.is_default.unwrap_or(false),
        }
    }
}

/// Input of a save: everything the caller controls about an account
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDraft {
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl AccountDraft {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = Some(is_default);
        self
    }
}

/// Usage summary over the saved accounts
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    pub total_accounts: usize,
    pub last_used_account: Option<SavedAccount>,
    pub oldest_account: Option<SavedAccount>,
}

impl AccountStats {
    pub fn from_accounts(accounts: &[SavedAccount]) -> Self {
        let mut by_last_login = accounts.to_vec();
        by_last_login.sort_by(|a, b| b.last_login_date.cmp(&a.last_login_date));

        Self {
            total_accounts: accounts.len(),
            last_used_account: by_last_login.first().cloned(),
            oldest_account: by_last_login.last().cloned(),
        }
    }
}
