use crate::errors::{DomainError, DomainResult};
use crate::domains::core::repository::EntityStore;
use crate::domains::interview::types::{FEEDBACK_COLLECTION, INTERVIEW_ID_FIELD};
use crate::types::EntityKind;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A dependent record that must be deleted together with its owner
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependentRef {
    /// Collection holding the dependent record
    pub collection: String,

    /// Id of the dependent record
    pub id: String,
}

/// Foreign-key relationship from a dependent collection to an owner kind
#[derive(Debug, Clone)]
pub struct CascadeRule {
    /// Name of the collection with dependent records
    pub collection: String,

    /// Field of the dependent record holding the owner id
    pub foreign_key: String,
}

/// Finds the records that must go when an entity is deleted
#[async_trait]
pub trait CascadeResolver: Send + Sync {
    /// Dependents of `id`, resolved by foreign key value only. The owner itself
    /// may already be gone. No dependents is an empty list, not an error.
    async fn resolve(&self, kind: EntityKind, id: &str) -> DomainResult<Vec<DependentRef>>;
}

/// CascadeResolver that queries the entity store for every registered rule of a kind
pub struct ForeignKeyCascadeResolver {
    store: Arc<dyn EntityStore>,
    /// Maps owner kind to the collections referencing it
    rules: HashMap<EntityKind, Vec<CascadeRule>>,
}

impl ForeignKeyCascadeResolver {
    /// Resolver with the default rules: feedback references interviews by `interviewId`.
    /// Accounts have no dependents by default.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self::without_rules(store).with_rule(EntityKind::Interview, FEEDBACK_COLLECTION, INTERVIEW_ID_FIELD)
    }

    pub fn without_rules(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            rules: HashMap::new(),
        }
    }

    /// Register an additional dependent collection for `kind`
    pub fn with_rule(mut self, kind: EntityKind, collection: &str, foreign_key: &str) -> Self {
        self.rules.entry(kind).or_default().push(CascadeRule {
            collection: collection.to_string(),
            foreign_key: foreign_key.to_string(),
        });
        self
    }

    pub fn rules_for(&self, kind: EntityKind) -> &[CascadeRule] {
        self.rules.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[async_trait]
impl CascadeResolver for ForeignKeyCascadeResolver {
    async fn resolve(&self, kind: EntityKind, id: &str) -> DomainResult<Vec<DependentRef>> {
        let mut dependents = Vec::new();
        let mut seen = HashSet::new();
        let owner_id = Value::String(id.to_string());

        for rule in self.rules_for(kind) {
            let documents = self
                .store
                .query_by_field(&rule.collection, &rule.foreign_key, &owner_id)
                .await
                .map_err(|e| DomainError::CascadeResolution {
                    kind: kind.to_string(),
                    id: id.to_string(),
                    reason: format!("querying {}.{}: {}", rule.collection, rule.foreign_key, e),
                })?;

            for doc in documents {
                let dependent = DependentRef {
                    collection: rule.collection.clone(),
                    id: doc.id,
                };
                if seen.insert(dependent.clone()) {
                    dependents.push(dependent);
                }
            }
        }

        if !dependents.is_empty() {
            log::debug!("Resolved {} dependents for {} {}", dependents.len(), kind, id);
        }
        Ok(dependents)
    }
}
