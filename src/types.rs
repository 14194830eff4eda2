use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Kind of entity a lifecycle action is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Interview,
    Account,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Interview => "interview",
            EntityKind::Account => "account",
        }
    }
}

impl FromStr for EntityKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interview" | "interviews" => Ok(EntityKind::Interview),
            "account" | "accounts" | "user" | "users" => Ok(EntityKind::Account),
            _ => Err(ValidationError::invalid_value(
                "kind",
                &format!("unrecognized entity kind '{}'", s),
            )),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle transition requested for every id in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Delete,
    Finalize,
    Unfinalize,
    Disable,
    Enable,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Delete => "delete",
            LifecycleAction::Finalize => "finalize",
            LifecycleAction::Unfinalize => "unfinalize",
            LifecycleAction::Disable => "disable",
            LifecycleAction::Enable => "enable",
        }
    }

    /// The only kind this action can target, if it is not kind-agnostic.
    pub fn implied_kind(&self) -> Option<EntityKind> {
        match self {
            LifecycleAction::Delete => None,
            LifecycleAction::Finalize | LifecycleAction::Unfinalize => Some(EntityKind::Interview),
            LifecycleAction::Disable | LifecycleAction::Enable => Some(EntityKind::Account),
        }
    }

    /// Resolve the target kind for this action, rejecting contradictory or missing kinds.
    pub fn resolve_kind(&self, requested: Option<EntityKind>) -> Result<EntityKind, ValidationError> {
        match (self.implied_kind(), requested) {
            (Some(implied), None) => Ok(implied),
            (Some(implied), Some(kind)) if implied == kind => Ok(kind),
            (Some(implied), Some(kind)) => Err(ValidationError::invalid_value(
                "kind",
                &format!("action '{}' applies to {} records, not {}", self, implied, kind),
            )),
            (None, Some(kind)) => Ok(kind),
            (None, None) => Err(ValidationError::required("kind")),
        }
    }
}

impl FromStr for LifecycleAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delete" => Ok(LifecycleAction::Delete),
            "finalize" => Ok(LifecycleAction::Finalize),
            "unfinalize" => Ok(LifecycleAction::Unfinalize),
            "disable" => Ok(LifecycleAction::Disable),
            "enable" => Ok(LifecycleAction::Enable),
            _ => Err(ValidationError::invalid_value(
                "action",
                &format!("unrecognized action '{}'", s),
            )),
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
