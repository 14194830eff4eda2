use crate::errors::{DomainError, DomainResult, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account profile as held by the identity store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        !self.disabled
    }
}

/// NewAccount DTO - used when provisioning an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

impl NewAccount {
    pub fn validate(&self) -> DomainResult<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::required("id").into());
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::required("email").into());
        }
        if !self.email.contains('@') {
            return Err(ValidationError::invalid_value("email", "must contain '@'").into());
        }
        Ok(())
    }
}

/// AccountRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub disabled: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl AccountRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Account> {
        let parse = |field: &str, value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| DomainError::Internal(format!("Invalid {} format: {}", field, value)))
        };

        Ok(Account {
            created_at: parse("created_at", &self.created_at)?,
            updated_at: parse("updated_at", &self.updated_at)?,
            id: self.id,
            email: self.email,
            display_name: self.display_name,
            disabled: self.disabled != 0,
        })
    }
}
