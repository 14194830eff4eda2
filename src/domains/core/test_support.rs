//! Shared fixtures for store-backed tests.

use crate::db_migration::run_migrations;
use crate::domains::account::types::Account;
use crate::domains::core::repository::{Document, EntityStore, IdentityStore};
use crate::errors::{DbError, DomainError, DomainResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fresh migrated in-memory database. One connection, so every query sees the same database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    run_migrations(&pool).await.expect("migrations");
    pool
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Query,
    Update,
    Delete,
    SetDisabled,
    DeleteAccount,
}

fn injected(op: StoreOp, key: &str) -> DomainError {
    DomainError::Database(DbError::Other(format!("injected {:?} failure for {}", op, key)))
}

/// Wraps a real store, failing chosen operations for chosen keys and recording deletes.
/// For `Query` the key is the queried value.
pub struct FaultyEntityStore {
    inner: Arc<dyn EntityStore>,
    failures: Mutex<Vec<(StoreOp, String)>>,
    delays: Mutex<HashMap<String, Duration>>,
    deleted: Mutex<Vec<(String, String)>>,
}

impl FaultyEntityStore {
    pub fn new(inner: Arc<dyn EntityStore>) -> Self {
        Self {
            inner,
            failures: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, op: StoreOp, key: &str) {
        self.failures.lock().unwrap().push((op, key.to_string()));
    }

    /// Delay every operation touching `key`
    pub fn delay(&self, key: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(key.to_string(), delay);
    }

    /// Successful deletes in call order as (collection, id)
    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }

    async fn check(&self, op: StoreOp, key: &str) -> DomainResult<()> {
        let delay = self.delays.lock().unwrap().get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let fails = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|(o, k)| *o == op && k == key);
        if fails {
            return Err(injected(op, key));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FaultyEntityStore {
    async fn get(&self, collection: &str, id: &str) -> DomainResult<Document> {
        self.inner.get(collection, id).await
    }

    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> DomainResult<Vec<Document>> {
        self.check(StoreOp::Query, value.as_str().unwrap_or_default()).await?;
        self.inner.query_by_field(collection, field, value).await
    }

    async fn set(&self, collection: &str, document: &Document) -> DomainResult<()> {
        self.inner.set(collection, document).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> DomainResult<()> {
        self.check(StoreOp::Update, id).await?;
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> DomainResult<()> {
        self.check(StoreOp::Delete, id).await?;
        self.inner.delete(collection, id).await?;
        self.deleted
            .lock()
            .unwrap()
            .push((collection.to_string(), id.to_string()));
        Ok(())
    }
}

/// IdentityStore counterpart of FaultyEntityStore
pub struct FaultyIdentityStore {
    inner: Arc<dyn IdentityStore>,
    failures: Mutex<Vec<(StoreOp, String)>>,
}

impl FaultyIdentityStore {
    pub fn new(inner: Arc<dyn IdentityStore>) -> Self {
        Self {
            inner,
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, op: StoreOp, id: &str) {
        self.failures.lock().unwrap().push((op, id.to_string()));
    }

    fn check(&self, op: StoreOp, id: &str) -> DomainResult<()> {
        let fails = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|(o, k)| *o == op && k == id);
        if fails {
            return Err(injected(op, id));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for FaultyIdentityStore {
    async fn get(&self, id: &str) -> DomainResult<Account> {
        self.inner.get(id).await
    }

    async fn set_disabled(&self, id: &str, disabled: bool) -> DomainResult<()> {
        self.check(StoreOp::SetDisabled, id)?;
        self.inner.set_disabled(id, disabled).await
    }

    async fn delete_account(&self, id: &str) -> DomainResult<()> {
        self.check(StoreOp::DeleteAccount, id)?;
        self.inner.delete_account(id).await
    }
}
