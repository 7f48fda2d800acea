use crate::labels;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Selects targets by label match within the policy's own namespace for
/// namespaced kinds, or cluster-wide for `Gateway`/`GatewayClass` targets
/// (spec §4.4 "Attachment").
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetSelector {
    pub group: Option<String>,
    pub kind: String,
    pub match_labels: labels::Selector,
}
