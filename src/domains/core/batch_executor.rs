use crate::errors::DomainResult;
use crate::domains::core::batch::{
    BatchOptions, BatchRequest, BatchResult, CancellationFlag, ItemOutcome, CANCELLED_DETAIL,
};
use crate::domains::core::cascade_resolver::CascadeResolver;
use crate::domains::core::repository::{EntityStore, IdentityStore};
use crate::domains::interview::types::{finalization_patch, Interview, INTERVIEWS_COLLECTION};
use crate::types::{EntityKind, LifecycleAction};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Applies one lifecycle action across many ids with per-item isolation.
///
/// Each id runs through its own error boundary and yields exactly one
/// `ItemOutcome`; a failing id never stops the others. Only request
/// validation errors are returned as `Err`. The executor keeps no entity
/// state between calls.
pub struct BatchExecutor {
    entity_store: Arc<dyn EntityStore>,
    identity_store: Arc<dyn IdentityStore>,
    cascade_resolver: Arc<dyn CascadeResolver>,
    options: BatchOptions,
}

impl BatchExecutor {
    pub fn new(
        entity_store: Arc<dyn EntityStore>,
        identity_store: Arc<dyn IdentityStore>,
        cascade_resolver: Arc<dyn CascadeResolver>,
    ) -> Self {
        Self {
            entity_store,
            identity_store,
            cascade_resolver,
            options: BatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Run the request to completion
    pub async fn execute(&self, request: BatchRequest) -> DomainResult<BatchResult> {
        self.execute_with_cancellation(request, &CancellationFlag::new()).await
    }

    /// Run the request, skipping items that have not started once `cancel` fires
    /// or the configured deadline passes. Applied items are never rolled back.
    pub async fn execute_with_cancellation(
        &self,
        request: BatchRequest,
        cancel: &CancellationFlag,
    ) -> DomainResult<BatchResult> {
        request.validate()?;

        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let deadline = self.options.deadline.map(|d| started + d);
        let action = request.action;
        let kind = request.kind;

        // Each distinct id runs once; repeated ids share that outcome
        let mut seen = HashSet::new();
        let distinct: Vec<String> = request
            .target_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        log::info!(
            "Batch {} started: {} {} x{} ({} distinct)",
            batch_id,
            action,
            kind,
            request.target_ids.len(),
            distinct.len()
        );

        // `buffered` starts at most `max_concurrency` items and yields in input order
        let outcomes: Vec<ItemOutcome> = stream::iter(distinct)
            // Owned ids keep the item futures Send so the batch can run on a spawned task
            .map(|id: String| async move {
                let expired = deadline.is_some_and(|d| Instant::now() >= d);
                if cancel.is_cancelled() || expired {
                    log::debug!("Batch {}: skipping {} ({})", batch_id, id, CANCELLED_DETAIL);
                    return ItemOutcome::failure(id, CANCELLED_DETAIL);
                }
                self.execute_one(action, kind, &id).await
            })
            .buffered(self.options.max_concurrency.max(1))
            .collect()
            .await;

        let by_id: HashMap<&str, &ItemOutcome> =
            outcomes.iter().map(|o| (o.id.as_str(), o)).collect();
        let ordered = request
            .target_ids
            .iter()
            .map(|id| match by_id.get(id.as_str()) {
                Some(outcome) => (*outcome).clone(),
                None => ItemOutcome::failure(id.as_str(), "no outcome recorded"),
            })
            .collect();

        let result = BatchResult::from_outcomes(ordered);
        log::info!(
            "Batch {} finished in {:?}: {} succeeded, {} failed",
            batch_id,
            started.elapsed(),
            result.success_count,
            result.failure_count
        );
        Ok(result)
    }

    /// Apply `action` to a single id. Never fails; errors land in the outcome.
    pub async fn execute_one(&self, action: LifecycleAction, kind: EntityKind, id: &str) -> ItemOutcome {
        if id.trim().is_empty() {
            return ItemOutcome::failure(id, format!("{} {}: empty id", action, kind));
        }

        match self.apply(action, kind, id).await {
            Ok(()) => ItemOutcome::success(id),
            Err(e) => {
                log::warn!("{} {} {} failed: {}", action, kind, id, e);
                ItemOutcome::failure(id, format!("{} {} {}: {}", action, kind, id, e))
            }
        }
    }

    async fn apply(&self, action: LifecycleAction, kind: EntityKind, id: &str) -> DomainResult<()> {
        action.resolve_kind(Some(kind))?;

        match action {
            LifecycleAction::Delete => self.delete_with_dependents(kind, id).await,
            LifecycleAction::Finalize => self.set_finalized(id, true).await,
            LifecycleAction::Unfinalize => self.set_finalized(id, false).await,
            LifecycleAction::Disable => self.identity_store.set_disabled(id, true).await,
            LifecycleAction::Enable => self.identity_store.set_disabled(id, false).await,
        }
    }

    async fn set_finalized(&self, id: &str, finalized: bool) -> DomainResult<()> {
        let current = Interview::from_document(&self.entity_store.get(INTERVIEWS_COLLECTION, id).await?);
        if current.finalized == finalized {
            log::debug!("Interview {} already has finalized={}", id, finalized);
            return Ok(());
        }

        self.entity_store
            .update(INTERVIEWS_COLLECTION, id, finalization_patch(finalized, Utc::now()))
            .await
    }

    /// Two-phase delete: dependents first, then the primary.
    ///
    /// If dependents cannot be enumerated nothing is deleted. A failure after
    /// some dependents are gone leaves the primary in place; retrying the same
    /// delete resolves the remaining dependents (possibly none) and finishes.
    async fn delete_with_dependents(&self, kind: EntityKind, id: &str) -> DomainResult<()> {
        let dependents = self.cascade_resolver.resolve(kind, id).await?;

        for dependent in &dependents {
            match self.entity_store.delete(&dependent.collection, &dependent.id).await {
                Ok(()) => {}
                // Removed by someone else between resolve and delete
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        // Recovery point: every dependent is gone, only the primary may remain
        match kind {
            EntityKind::Interview => self.entity_store.delete(INTERVIEWS_COLLECTION, id).await,
            EntityKind::Account => self.identity_store.delete_account(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::account::repository::SqliteIdentityStore;
    use crate::domains::account::types::NewAccount;
    use crate::domains::core::cascade_resolver::ForeignKeyCascadeResolver;
    use crate::domains::core::document_store::SqliteEntityStore;
    use crate::domains::core::repository::Document;
    use crate::domains::core::test_support::{memory_pool, FaultyEntityStore, FaultyIdentityStore, StoreOp};
    use crate::domains::interview::types::{Feedback, FEEDBACK_COLLECTION, INTERVIEW_ID_FIELD};
    use crate::errors::DomainError;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        entities: Arc<SqliteEntityStore>,
        identities: Arc<SqliteIdentityStore>,
    }

    impl Fixture {
        async fn new() -> Self {
            let pool = memory_pool().await;
            Self {
                entities: Arc::new(SqliteEntityStore::new(pool.clone())),
                identities: Arc::new(SqliteIdentityStore::new(pool)),
            }
        }

        async fn interview(&self, id: &str, feedback: &[&str]) {
            self.entities
                .set(INTERVIEWS_COLLECTION, &Document::new(id).with_field("finalized", false))
                .await
                .unwrap();
            for fid in feedback {
                self.entities
                    .set(FEEDBACK_COLLECTION, &Feedback::new(*fid, id).into_document())
                    .await
                    .unwrap();
            }
        }

        async fn account(&self, id: &str, disabled: bool) {
            self.identities
                .create(NewAccount {
                    id: id.to_string(),
                    email: format!("{}@example.com", id),
                    display_name: None,
                    disabled,
                })
                .await
                .unwrap();
        }

        fn executor(&self) -> BatchExecutor {
            self.executor_over(self.entities.clone(), self.identities.clone())
        }

        fn executor_over(
            &self,
            entities: Arc<dyn EntityStore>,
            identities: Arc<dyn IdentityStore>,
        ) -> BatchExecutor {
            let resolver = Arc::new(ForeignKeyCascadeResolver::new(entities.clone()));
            BatchExecutor::new(entities, identities, resolver)
        }

        async fn feedback_for(&self, interview_id: &str) -> usize {
            self.entities
                .query_by_field(FEEDBACK_COLLECTION, INTERVIEW_ID_FIELD, &json!(interview_id))
                .await
                .unwrap()
                .len()
        }

        async fn interview_exists(&self, id: &str) -> bool {
            self.entities.get(INTERVIEWS_COLLECTION, id).await.is_ok()
        }

        async fn finalized(&self, id: &str) -> bool {
            let doc = self.entities.get(INTERVIEWS_COLLECTION, id).await.unwrap();
            Interview::from_document(&doc).finalized
        }
    }

    #[tokio::test]
    async fn test_delete_interviews_with_feedback() {
        let fx = Fixture::new().await;
        fx.interview("i1", &["f1", "f2"]).await;
        fx.interview("i2", &[]).await;

        let result = fx
            .executor()
            .execute(BatchRequest::new(LifecycleAction::Delete, EntityKind::Interview, ["i1", "i2"]))
            .await
            .unwrap();

        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 0);
        assert_eq!(
            result.outcomes,
            vec![ItemOutcome::success("i1"), ItemOutcome::success("i2")]
        );
        assert!(!fx.interview_exists("i1").await);
        assert!(!fx.interview_exists("i2").await);
        assert_eq!(fx.feedback_for("i1").await, 0);
        assert_eq!(fx.feedback_for("i2").await, 0);
    }

    #[tokio::test]
    async fn test_cascade_deletes_dependents_then_primary() {
        let fx = Fixture::new().await;
        fx.interview("i1", &["f1", "f2", "f3"]).await;
        let recorder = Arc::new(FaultyEntityStore::new(fx.entities.clone()));

        let result = fx
            .executor_over(recorder.clone(), fx.identities.clone())
            .execute(BatchRequest::new(LifecycleAction::Delete, EntityKind::Interview, ["i1"]))
            .await
            .unwrap();

        assert_eq!(result.success_count, 1);
        let deleted = recorder.deleted();
        assert_eq!(deleted.len(), 4);
        assert!(deleted[..3].iter().all(|(c, _)| c == FEEDBACK_COLLECTION));
        assert_eq!(deleted[3], (INTERVIEWS_COLLECTION.to_string(), "i1".to_string()));
    }

    #[tokio::test]
    async fn test_missing_id_fails_alone() {
        let fx = Fixture::new().await;
        for id in ["i1", "i2", "i4", "i5"] {
            fx.interview(id, &[]).await;
        }

        let result = fx
            .executor()
            .execute(BatchRequest::new(
                LifecycleAction::Finalize,
                EntityKind::Interview,
                ["i1", "i2", "i3", "i4", "i5"],
            ))
            .await
            .unwrap();

        assert_eq!(result.success_count, 4);
        assert_eq!(result.failure_count, 1);
        for (idx, outcome) in result.outcomes.iter().enumerate() {
            assert_eq!(outcome.ok, idx != 2, "outcome {} = {:?}", idx, outcome);
        }
        let detail = result.outcomes[2].error_detail.as_deref().unwrap();
        assert!(!detail.is_empty());
        assert!(detail.contains("i3"));
    }

    #[tokio::test]
    async fn test_finalize_toggle_is_idempotent() {
        let fx = Fixture::new().await;
        fx.interview("i1", &[]).await;
        let executor = fx.executor();

        for action in [
            LifecycleAction::Finalize,
            LifecycleAction::Finalize,
            LifecycleAction::Unfinalize,
            LifecycleAction::Unfinalize,
            LifecycleAction::Finalize,
        ] {
            let result = executor
                .execute(BatchRequest::new(action, EntityKind::Interview, ["i1"]))
                .await
                .unwrap();
            assert_eq!(result.success_count, 1, "{} should succeed", action);
        }
        assert!(fx.finalized("i1").await);
    }

    #[tokio::test]
    async fn test_disable_already_disabled_account() {
        let fx = Fixture::new().await;
        fx.account("u1", true).await;

        let result = fx
            .executor()
            .execute(BatchRequest::new(LifecycleAction::Disable, EntityKind::Account, ["u1"]))
            .await
            .unwrap();

        assert_eq!((result.success_count, result.failure_count), (1, 0));
        assert!(fx.identities.get("u1").await.unwrap().disabled);
    }

    #[tokio::test]
    async fn test_enable_and_delete_accounts() {
        let fx = Fixture::new().await;
        fx.account("u1", true).await;
        fx.account("u2", false).await;
        let executor = fx.executor();

        let enabled = executor
            .execute(BatchRequest::new(LifecycleAction::Enable, EntityKind::Account, ["u1", "u2"]))
            .await
            .unwrap();
        assert_eq!(enabled.success_count, 2);
        assert!(!fx.identities.get("u1").await.unwrap().disabled);

        let deleted = executor
            .execute(BatchRequest::new(LifecycleAction::Delete, EntityKind::Account, ["u1", "ghost"]))
            .await
            .unwrap();
        assert_eq!((deleted.success_count, deleted.failure_count), (1, 1));
        assert!(fx.identities.get("u1").await.unwrap_err().is_not_found());
        assert!(!deleted.outcomes[1].ok);
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let fx = Fixture::new().await;

        let err = fx
            .executor()
            .execute(BatchRequest::new(LifecycleAction::Delete, EntityKind::Interview, Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cascade_failure_deletes_nothing() {
        let fx = Fixture::new().await;
        fx.interview("i1", &["f1", "f2"]).await;
        fx.interview("i2", &["f3"]).await;
        let faulty = Arc::new(FaultyEntityStore::new(fx.entities.clone()));
        faulty.fail_on(StoreOp::Query, "i1");

        let result = fx
            .executor_over(faulty.clone(), fx.identities.clone())
            .execute(BatchRequest::new(LifecycleAction::Delete, EntityKind::Interview, ["i1", "i2"]))
            .await
            .unwrap();

        assert_eq!((result.success_count, result.failure_count), (1, 1));
        assert!(!result.outcomes[0].ok);
        assert!(result.outcomes[1].ok);
        assert!(fx.interview_exists("i1").await);
        assert_eq!(fx.feedback_for("i1").await, 2);
        assert!(faulty.deleted().iter().all(|(_, id)| id != "i1" && id != "f1" && id != "f2"));
    }

    #[tokio::test]
    async fn test_partial_cascade_heals_on_retry() {
        let fx = Fixture::new().await;
        fx.interview("i1", &["f1", "f2"]).await;
        let faulty = Arc::new(FaultyEntityStore::new(fx.entities.clone()));
        faulty.fail_on(StoreOp::Delete, "f2");
        let request = BatchRequest::new(LifecycleAction::Delete, EntityKind::Interview, ["i1"]);

        let first = fx
            .executor_over(faulty, fx.identities.clone())
            .execute(request.clone())
            .await
            .unwrap();
        assert_eq!(first.failure_count, 1);
        assert!(fx.interview_exists("i1").await);

        let retry = fx.executor().execute(request).await.unwrap();
        assert_eq!(retry.success_count, 1);
        assert!(!fx.interview_exists("i1").await);
        assert_eq!(fx.feedback_for("i1").await, 0);
    }

    #[tokio::test]
    async fn test_primary_delete_failure_keeps_primary() {
        let fx = Fixture::new().await;
        fx.interview("i1", &["f1"]).await;
        let faulty = Arc::new(FaultyEntityStore::new(fx.entities.clone()));
        faulty.fail_on(StoreOp::Delete, "i1");

        let result = fx
            .executor_over(faulty, fx.identities.clone())
            .execute(BatchRequest::new(LifecycleAction::Delete, EntityKind::Interview, ["i1"]))
            .await
            .unwrap();

        assert_eq!(result.failure_count, 1);
        assert!(fx.interview_exists("i1").await);
        assert_eq!(fx.feedback_for("i1").await, 0);
    }

    #[tokio::test]
    async fn test_identity_store_error_is_isolated() {
        let fx = Fixture::new().await;
        fx.account("u1", false).await;
        fx.account("u2", false).await;
        let faulty = Arc::new(FaultyIdentityStore::new(fx.identities.clone()));
        faulty.fail_on(StoreOp::SetDisabled, "u1");

        let result = fx
            .executor_over(fx.entities.clone(), faulty)
            .execute(BatchRequest::new(LifecycleAction::Disable, EntityKind::Account, ["u1", "u2"]))
            .await
            .unwrap();

        assert_eq!((result.success_count, result.failure_count), (1, 1));
        assert!(result.outcomes[0].error_detail.as_deref().unwrap().contains("injected"));
        assert!(fx.identities.get("u2").await.unwrap().disabled);
    }

    #[tokio::test]
    async fn test_duplicate_ids_each_get_an_outcome() {
        let fx = Fixture::new().await;
        fx.interview("i1", &["f1"]).await;
        fx.interview("i2", &[]).await;

        let result = fx
            .executor()
            .execute(BatchRequest::new(
                LifecycleAction::Delete,
                EntityKind::Interview,
                ["i1", "i2", "i1"],
            ))
            .await
            .unwrap();

        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.success_count + result.failure_count, 3);
        assert_eq!(result.outcomes[0], result.outcomes[2]);
        assert!(result.outcomes.iter().all(|o| o.ok));
        assert_eq!(
            result.outcomes.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(),
            vec!["i1", "i2", "i1"]
        );
    }

    #[tokio::test]
    async fn test_outcomes_keep_input_order_under_concurrency() {
        let fx = Fixture::new().await;
        let ids: Vec<String> = (0..8).map(|n| format!("i{}", n)).collect();
        for id in &ids {
            fx.interview(id, &[]).await;
        }
        let slow = Arc::new(FaultyEntityStore::new(fx.entities.clone()));
        slow.delay("i0", Duration::from_millis(60));
        slow.delay("i1", Duration::from_millis(30));

        let executor = fx
            .executor_over(slow, fx.identities.clone())
            .with_options(BatchOptions {
                max_concurrency: 4,
                deadline: None,
            });
        let result = executor
            .execute(BatchRequest::new(LifecycleAction::Finalize, EntityKind::Interview, ids.clone()))
            .await
            .unwrap();

        assert_eq!(result.success_count, 8);
        let returned: Vec<_> = result.outcomes.iter().map(|o| o.id.clone()).collect();
        assert_eq!(returned, ids);
    }

    #[tokio::test]
    async fn test_cancelled_batch_starts_nothing() {
        let fx = Fixture::new().await;
        fx.interview("i1", &["f1"]).await;
        fx.interview("i2", &[]).await;
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let result = fx
            .executor()
            .execute_with_cancellation(
                BatchRequest::new(LifecycleAction::Delete, EntityKind::Interview, ["i1", "i2"]),
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!((result.success_count, result.failure_count), (0, 2));
        assert!(result
            .outcomes
            .iter()
            .all(|o| o.error_detail.as_deref() == Some(CANCELLED_DETAIL)));
        assert!(fx.interview_exists("i1").await);
        assert_eq!(fx.feedback_for("i1").await, 1);
    }

    #[tokio::test]
    async fn test_expired_deadline_skips_unstarted_items() {
        let fx = Fixture::new().await;
        fx.interview("i1", &[]).await;

        let executor = fx.executor().with_options(BatchOptions {
            max_concurrency: 1,
            deadline: Some(Duration::ZERO),
        });
        let result = executor
            .execute(BatchRequest::new(LifecycleAction::Finalize, EntityKind::Interview, ["i1"]))
            .await
            .unwrap();

        assert_eq!(result.failure_count, 1);
        assert!(!fx.finalized("i1").await);
    }

    async fn six_interviews_with_slow_second(fx: &Fixture) -> (Vec<String>, Arc<FaultyEntityStore>) {
        let ids: Vec<String> = (0..6).map(|n| format!("i{}", n)).collect();
        for id in &ids {
            fx.interview(id, &[]).await;
        }
        let slow = Arc::new(FaultyEntityStore::new(fx.entities.clone()));
        slow.delay("i1", Duration::from_millis(100));
        (ids, slow)
    }

    fn assert_applied_then_skipped(outcomes: &[ItemOutcome], applied: usize) {
        for (n, outcome) in outcomes.iter().enumerate() {
            if n < applied {
                assert!(outcome.ok, "{} should have been applied", outcome.id);
            } else {
                assert_eq!(outcome.error_detail.as_deref(), Some(CANCELLED_DETAIL), "{}", outcome.id);
            }
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_keeps_applied_items() {
        let fx = Fixture::new().await;
        let (ids, slow) = six_interviews_with_slow_second(&fx).await;
        let executor = Arc::new(fx.executor_over(slow, fx.identities.clone()).with_options(BatchOptions {
            max_concurrency: 1,
            deadline: None,
        }));
        let cancel = CancellationFlag::new();

        let handle = {
            let executor = executor.clone();
            let cancel = cancel.clone();
            let request = BatchRequest::new(LifecycleAction::Finalize, EntityKind::Interview, ids.clone());
            tokio::spawn(async move { executor.execute_with_cancellation(request, &cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        let result = handle.await.unwrap().unwrap();

        assert_eq!((result.success_count, result.failure_count), (2, 4));
        assert_applied_then_skipped(&result.outcomes, 2);
        assert!(fx.finalized("i0").await);
        assert!(fx.finalized("i1").await);
        for id in &ids[2..] {
            assert!(!fx.finalized(id).await, "{} should be untouched", id);
        }
    }

    #[tokio::test]
    async fn test_deadline_mid_batch_keeps_applied_items() {
        let fx = Fixture::new().await;
        let (ids, slow) = six_interviews_with_slow_second(&fx).await;
        let executor = fx.executor_over(slow, fx.identities.clone()).with_options(BatchOptions {
            max_concurrency: 1,
            deadline: Some(Duration::from_millis(50)),
        });

        let result = executor
            .execute(BatchRequest::new(LifecycleAction::Finalize, EntityKind::Interview, ids.clone()))
            .await
            .unwrap();

        assert_applied_then_skipped(&result.outcomes, 2);
        assert!(fx.finalized("i1").await);
        assert!(!fx.finalized("i2").await);
        assert!(!fx.finalized("i5").await);
    }

    #[tokio::test]
    async fn test_execute_one_reports_kind_mismatch() {
        let fx = Fixture::new().await;
        fx.account("u1", false).await;

        let outcome = fx
            .executor()
            .execute_one(LifecycleAction::Finalize, EntityKind::Account, "u1")
            .await;
        assert!(!outcome.ok);

        let blank = fx
            .executor()
            .execute_one(LifecycleAction::Disable, EntityKind::Account, "  ")
            .await;
        assert!(!blank.ok);
    }
}
