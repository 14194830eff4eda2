use crate::errors::ValidationError;
use crate::types::{EntityKind, LifecycleAction};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Detail recorded for items skipped after cancellation or deadline expiry
pub const CANCELLED_DETAIL: &str = "cancelled before start";

/// One action over an ordered list of ids. Built per call and consumed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub action: LifecycleAction,
    pub kind: EntityKind,
    pub target_ids: Vec<String>,
}

impl BatchRequest {
    pub fn new<I, S>(action: LifecycleAction, kind: EntityKind, target_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action,
            kind,
            target_ids: target_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Request-level checks; nothing is attempted when these fail
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target_ids.is_empty() {
            return Err(ValidationError::required("targetIds"));
        }
        self.action.resolve_kind(Some(self.kind))?;
        Ok(())
    }
}

/// Result of applying the action to a single id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ItemOutcome {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: true,
            error_detail: None,
        }
    }

    pub fn failure(id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: false,
            error_detail: Some(detail.into()),
        }
    }
}

/// Aggregate of one batch; outcomes are in request order, one per requested id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchResult {
    pub fn from_outcomes(outcomes: Vec<ItemOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.ok).count();
        Self {
            success_count,
            failure_count: outcomes.len() - success_count,
            outcomes,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Shared cancellation signal. Items not yet started when it fires are skipped;
/// items already applied stay applied.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Execution tuning for the batch executor
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Upper bound on items in flight at once
    pub max_concurrency: usize,

    /// Items not started once this has elapsed are skipped
    pub deadline: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            deadline: None,
        }
    }
}
