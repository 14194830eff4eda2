use crate::domains::core::repository::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const INTERVIEWS_COLLECTION: &str = "interviews";
pub const FEEDBACK_COLLECTION: &str = "feedback";

pub const FINALIZED_FIELD: &str = "finalized";
pub const FINALIZED_AT_FIELD: &str = "finalizedAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";
pub const INTERVIEW_ID_FIELD: &str = "interviewId";

/// Interview status: Draft ⇄ Finalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewStatus {
    Draft,
    Finalized,
}

/// Typed view over an interview document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: String,
    pub finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl Interview {
    /// Missing or malformed status fields read as a draft
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            finalized: doc.get_bool(FINALIZED_FIELD).unwrap_or(false),
            finalized_at: doc
                .get_str(FINALIZED_AT_FIELD)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    pub fn status(&self) -> InterviewStatus {
        if self.finalized {
            InterviewStatus::Finalized
        } else {
            InterviewStatus::Draft
        }
    }
}

/// Field patch moving an interview to the requested finalization state.
/// Un-finalizing clears `finalizedAt`.
pub fn finalization_patch(finalized: bool, now: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(FINALIZED_FIELD.to_string(), Value::Bool(finalized));
    fields.insert(
        FINALIZED_AT_FIELD.to_string(),
        if finalized {
            Value::String(now.to_rfc3339())
        } else {
            Value::Null
        },
    );
    fields.insert(UPDATED_AT_FIELD.to_string(), Value::String(now.to_rfc3339()));
    fields
}

/// Feedback report attached to an interview; lives and dies with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub interview_id: String,
    pub body: Option<String>,
}

impl Feedback {
    pub fn new(id: impl Into<String>, interview_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            interview_id: interview_id.into(),
            body: None,
        }
    }

    pub fn into_document(self) -> Document {
        let doc = Document::new(self.id).with_field(INTERVIEW_ID_FIELD, self.interview_id);
        match self.body {
            Some(body) => doc.with_field("body", body),
            None => doc,
        }
    }
}
