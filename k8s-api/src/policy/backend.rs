use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A destination endpoint set that isn't a plain Kubernetes `Service`:
/// static hosts, a dynamic-forward-proxy, a cloud function, an AI
/// provider, or an MCP-style agent backend (spec §3 "Backend").
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "Backend",
    namespaced,
    status = "BackendStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct BackendSpec {
    #[serde(rename = "type")]
    pub type_: BackendType,
    pub static_backend: Option<StaticBackend>,
    pub dynamic_forward_proxy: Option<DynamicForwardProxy>,
    pub aws_lambda: Option<CloudFunction>,
    pub gcp_function: Option<CloudFunction>,
    pub ai: Option<AiProvider>,
    pub mcp: Option<StaticBackend>,
    pub app_protocol: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum BackendType {
    Static,
    DynamicForwardProxy,
    AwsLambda,
    GcpFunction,
    Ai,
    Mcp,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StaticBackend {
    pub hosts: Vec<Host>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Host {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct DynamicForwardProxy {}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudFunction {
    pub function_name: String,
    pub region: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiProvider {
    pub provider: String,
    pub model: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct BackendStatus {
    pub conditions: Option<Vec<k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition>>,
}

/// References a non-GatewayExtension external configuration source, such
/// as a custom auth server or rate-limit service, attached to a Gateway
/// (spec §3 "Policy").
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "gateway.kgateway.dev",
    version = "v1alpha1",
    kind = "GatewayExtension",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GatewayExtensionSpec {
    #[serde(rename = "type")]
    pub type_: String,
    pub ext_auth: Option<ExtAuthProvider>,
    pub ext_proc: Option<ExtProcProvider>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtAuthProvider {
    pub backend_ref: super::target_ref::NamespacedTargetRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtProcProvider {
    pub backend_ref: super::target_ref::NamespacedTargetRef,
}
