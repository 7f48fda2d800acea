use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters referenced by `Gateway.spec.infrastructure.parametersRef`
/// that configure the auto-provisioned Envoy workload (image, replica
/// count, overlay).
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "GatewayParameters",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GatewayParametersSpec {
    pub kube: Option<KubernetesProxyConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesProxyConfig {
    pub deployment: Option<ProvisionedWorkload>,
    pub service: Option<ProvisionedWorkload>,
    pub service_account: Option<ProvisionedWorkload>,
    pub pod_disruption_budget: Option<ProvisionedWorkload>,
    pub horizontal_pod_autoscaler: Option<ProvisionedWorkload>,
    pub vertical_pod_autoscaler: Option<ProvisionedWorkload>,
}

/// A strategic-merge patch applied over the rendered manifest of one kind
/// (spec §4.9 "Overlay Applier"). Stored as raw JSON since the patch
/// shape depends on the target kind's own schema.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ProvisionedWorkload {
    pub replicas: Option<i32>,
    pub patch: Option<serde_json::Value>,
}

/// The same shape for the `agentgateway` data plane alternative (spec
/// §1: "Envoy and an alternative agentgateway").
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "AgentgatewayParameters",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AgentgatewayParametersSpec {
    pub kube: Option<KubernetesProxyConfig>,
}

#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "AgentgatewayPolicy",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AgentgatewayPolicySpec {
    pub target_refs: Option<Vec<super::target_ref::LocalTargetRef>>,
    pub mcp: Option<serde_json::Value>,
}

#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "AgentgatewayBackend",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AgentgatewayBackendSpec {
    pub targets: Vec<super::backend::Host>,
}

/// A filter-attachable response shortcut, used by route rules that should
/// terminate with a synthesized response rather than forward upstream.
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "DirectResponse",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct DirectResponseSpec {
    pub status: u16,
    pub body: Option<String>,
}
