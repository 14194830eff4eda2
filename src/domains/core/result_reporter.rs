use crate::domains::core::batch::{BatchResult, ItemOutcome};
use serde::{Deserialize, Serialize};

/// Reason recorded when a failed outcome carries no detail
const UNKNOWN_REASON: &str = "unknown error";

/// One failed id and why it failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedItem {
    pub id: String,
    pub reason: String,
}

/// Caller-facing summary of a batch. Built only after every item has resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_attempted: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Every failure in request order, repeated ids and repeated reasons included
    pub failures: Vec<FailedItem>,
    pub outcomes: Vec<ItemOutcome>,
}

impl From<&BatchResult> for BatchReport {
    fn from(result: &BatchResult) -> Self {
        let failures = result
            .outcomes
            .iter()
            .filter(|o| !o.ok)
            .map(|o| FailedItem {
                id: o.id.clone(),
                reason: o
                    .error_detail
                    .clone()
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| UNKNOWN_REASON.to_string()),
            })
            .collect();

        Self {
            total_attempted: result.outcomes.len(),
            success_count: result.success_count,
            failure_count: result.failure_count,
            failures,
            outcomes: result.outcomes.clone(),
        }
    }
}

impl BatchReport {
    /// The ids to resubmit to retry exactly the failed subset
    pub fn retry_ids(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.id.clone()).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} attempted, {} succeeded, {} failed",
            self.total_attempted, self.success_count, self.failure_count
        )
    }
}
