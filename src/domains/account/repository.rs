use crate::errors::{DbError, DomainError, DomainResult};
use crate::domains::account::types::{Account, AccountRow, NewAccount};
use crate::domains::core::repository::IdentityStore;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, SqlitePool};

const ENTITY_NAME: &str = "account";

/// SQLite implementation of IdentityStore
#[derive(Clone)]
pub struct SqliteIdentityStore {
    pool: SqlitePool,
}

impl SqliteIdentityStore {
    /// Create a new repository instance
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Provision an account. Not part of the lifecycle contract; used by seeding and admin tooling.
    pub async fn create(&self, new_account: NewAccount) -> DomainResult<Account> {
        new_account.validate()?;
        let now = Utc::now().to_rfc3339();

        query(
            "INSERT INTO accounts (id, email, display_name, disabled, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&new_account.id)
        .bind(&new_account.email)
        .bind(&new_account.display_name)
        .bind(i64::from(new_account.disabled))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from_sqlx(e)))?;

        self.get(&new_account.id).await
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn get(&self, id: &str) -> DomainResult<Account> {
        let row = query_as::<_, AccountRow>(
            "SELECT id, email, display_name, disabled, created_at, updated_at FROM accounts WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from_sqlx(e)))?
        .ok_or_else(|| DomainError::EntityNotFound(ENTITY_NAME.to_string(), id.to_string()))?;

        row.into_entity()
    }

    async fn set_disabled(&self, id: &str, disabled: bool) -> DomainResult<()> {
        // SQLite reports matched rows, so re-applying the current value still counts as found
        let result = query("UPDATE accounts SET disabled = ?, updated_at = ? WHERE id = ?")
            .bind(i64::from(disabled))
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from_sqlx(e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound(ENTITY_NAME.to_string(), id.to_string()));
        }
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> DomainResult<()> {
        let result = query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from_sqlx(e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound(ENTITY_NAME.to_string(), id.to_string()));
        }
        Ok(())
    }
}
