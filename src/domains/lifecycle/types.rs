use crate::domains::core::batch::BatchRequest;
use crate::errors::ValidationError;
use crate::types::{EntityKind, LifecycleAction};
use serde::{Deserialize, Serialize};

/// Wire form of a batch request: `{ "action": "...", "kind": "...", "targetIds": [...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequestDto {
    pub action: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, alias = "target_ids")]
    pub target_ids: Vec<String>,
}

/// Parse the action and kind names shared by batch and single-item requests
pub fn parse_action_and_kind(
    action: &str,
    kind: Option<&str>,
) -> Result<(LifecycleAction, EntityKind), ValidationError> {
    let action: LifecycleAction = action.parse()?;
    let kind = kind.map(str::parse::<EntityKind>).transpose()?;
    Ok((action, action.resolve_kind(kind)?))
}

impl TryFrom<BatchRequestDto> for BatchRequest {
    type Error = ValidationError;

    fn try_from(dto: BatchRequestDto) -> Result<Self, Self::Error> {
        let (action, kind) = parse_action_and_kind(&dto.action, dto.kind.as_deref())?;
        let request = BatchRequest::new(action, kind, dto.target_ids);
        request.validate()?;
        Ok(request)
    }
}
