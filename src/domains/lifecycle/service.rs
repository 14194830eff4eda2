use crate::domains::account::repository::SqliteIdentityStore;
use crate::domains::core::batch::{BatchOptions, BatchRequest, CancellationFlag, ItemOutcome};
use crate::domains::core::batch_executor::BatchExecutor;
use crate::domains::core::cascade_resolver::ForeignKeyCascadeResolver;
use crate::domains::core::document_store::SqliteEntityStore;
use crate::domains::core::result_reporter::BatchReport;
use crate::domains::lifecycle::types::{parse_action_and_kind, BatchRequestDto};
use crate::errors::{DomainResult, ValidationError};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Entry point for the outer layers: parses requests, runs the executor, builds the report
pub struct LifecycleService {
    executor: BatchExecutor,
}

impl LifecycleService {
    pub fn new(executor: BatchExecutor) -> Self {
        Self { executor }
    }

    /// Wire the SQLite-backed stores and the default cascade rules
    pub fn from_pool(pool: SqlitePool, options: BatchOptions) -> Self {
        let entity_store = Arc::new(SqliteEntityStore::new(pool.clone()));
        let identity_store = Arc::new(SqliteIdentityStore::new(pool));
        let resolver = Arc::new(ForeignKeyCascadeResolver::new(entity_store.clone()));

        Self::new(BatchExecutor::new(entity_store, identity_store, resolver).with_options(options))
    }

    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    pub async fn run_batch(&self, dto: BatchRequestDto) -> DomainResult<BatchReport> {
        self.run_batch_with_cancellation(dto, &CancellationFlag::new()).await
    }

    pub async fn run_batch_with_cancellation(
        &self,
        dto: BatchRequestDto,
        cancel: &CancellationFlag,
    ) -> DomainResult<BatchReport> {
        let request = BatchRequest::try_from(dto)?;
        let result = self.executor.execute_with_cancellation(request, cancel).await?;
        Ok(BatchReport::from(&result))
    }

    /// Single-item equivalent of a batch of one
    pub async fn apply_one(&self, action: &str, kind: Option<&str>, id: &str) -> DomainResult<ItemOutcome> {
        let (action, kind) = parse_action_and_kind(action, kind)?;
        if id.trim().is_empty() {
            return Err(ValidationError::required("id").into());
        }
        Ok(self.executor.execute_one(action, kind, id).await)
    }
}
