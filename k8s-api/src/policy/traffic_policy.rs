use super::target_ref::{LocalTargetRef, NamespacedTargetRef};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Timeout, retry, header mutation and resilience settings attached to a
/// Gateway, a Listener (via `sectionName`), a Route, or a Route rule.
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "TrafficPolicy",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPolicySpec {
    pub target_refs: Option<Vec<LocalTargetRef>>,
    pub target_selectors: Option<Vec<super::target_selector::TargetSelector>>,
    pub timeouts: Option<Timeouts>,
    pub retry: Option<Retry>,
    pub header_modifier: Option<HeaderModifier>,
    pub cors: Option<Cors>,
    pub rate_limit: Option<RateLimit>,
    /// Field paths cleared by this policy at this attachment level (spec
    /// §4.4 "Disable semantics").
    pub disable: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    pub request: Option<String>,
    pub per_try_timeout: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Retry {
    pub attempts: Option<u32>,
    /// Requires `sectionName` when the policy targets a Gateway (spec
    /// §4.4 "Section-name discipline").
    pub retry_on: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeaderModifier {
    pub add: Option<Vec<NamedValue>>,
    pub set: Option<Vec<NamedValue>>,
    pub remove: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct NamedValue {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cors {
    pub allow_origins: Option<Vec<String>>,
    pub allow_methods: Option<Vec<String>>,
    pub allow_headers: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub requests_per_unit: u32,
    pub unit: String,
}

/// Deprecated: folded into `ListenerPolicy.httpSettings` at attachment
/// time. Retained only so existing documents keep validating.
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "HTTPListenerPolicy",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HttpListenerPolicySpec {
    pub target_refs: Option<Vec<LocalTargetRef>>,
    pub http_settings: Option<HttpSettings>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpSettings {
    pub idle_timeout: Option<String>,
    pub preserve_external_request_id: Option<bool>,
}

#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "ListenerPolicy",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ListenerPolicySpec {
    pub target_refs: Option<Vec<LocalTargetRef>>,
    pub target_selectors: Option<Vec<super::target_selector::TargetSelector>>,
    pub http_settings: Option<HttpSettings>,
    pub health_check: Option<bool>,
}

#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "BackendConfigPolicy",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfigPolicySpec {
    pub target_refs: Option<Vec<LocalTargetRef>>,
    pub connect_timeout: Option<String>,
    pub dns_lookup_family: Option<String>,
    pub load_balancer: Option<String>,
}

/// References a `GatewayExtension` that implements custom auth/rate-limit
/// logic; carries no directly-attachable fields of its own.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ExtensionRef {
    pub name: String,
    pub namespace: Option<String>,
}

pub type TargetRef = NamespacedTargetRef;
