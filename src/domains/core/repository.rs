use crate::errors::DomainResult;
use crate::domains::account::types::Account;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless record held in a named collection of the entity store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// Contract for the document collection that holds interviews and their dependents
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch a document; `EntityNotFound` when absent
    async fn get(&self, collection: &str, id: &str) -> DomainResult<Document>;

    /// All documents in `collection` whose `field` equals `value`
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> DomainResult<Vec<Document>>;

    /// Create or replace a document
    async fn set(&self, collection: &str, document: &Document) -> DomainResult<()>;

    /// Merge `fields` into an existing document; `EntityNotFound` when absent
    async fn update(&self, collection: &str, id: &str, fields: Map<String, Value>) -> DomainResult<()>;

    /// Remove a document; `EntityNotFound` when absent
    async fn delete(&self, collection: &str, id: &str) -> DomainResult<()>;
}

/// Contract for the account directory
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch an account profile; `EntityNotFound` when absent
    async fn get(&self, id: &str) -> DomainResult<Account>;

    /// Set the disabled flag. Setting the current value again is not an error.
    async fn set_disabled(&self, id: &str, disabled: bool) -> DomainResult<()>;

    /// Remove the account; `EntityNotFound` when absent
    async fn delete_account(&self, id: &str) -> DomainResult<()>;
}
