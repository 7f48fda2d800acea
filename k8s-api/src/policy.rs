pub mod backend;
pub mod gateway_parameters;
pub mod target_ref;
pub mod target_selector;
pub mod traffic_policy;

pub use self::{
    backend::{
        AiProvider, Backend, BackendSpec, BackendStatus, BackendType, CloudFunction,
        DynamicForwardProxy, ExtAuthProvider, ExtProcProvider, GatewayExtension,
        GatewayExtensionSpec, Host, StaticBackend,
    },
    gateway_parameters::{
        AgentgatewayBackend, AgentgatewayBackendSpec, AgentgatewayParameters,
        AgentgatewayParametersSpec, AgentgatewayPolicy, AgentgatewayPolicySpec, DirectResponse,
        DirectResponseSpec, GatewayParameters, GatewayParametersSpec, KubernetesProxyConfig,
        ProvisionedWorkload,
    },
    target_ref::{ClusterTargetRef, LocalTargetRef, NamespacedTargetRef},
    target_selector::TargetSelector,
    traffic_policy::{
        BackendConfigPolicy, BackendConfigPolicySpec, Cors, HeaderModifier, HTTPListenerPolicy,
        HttpListenerPolicySpec, HttpSettings, ListenerPolicy, ListenerPolicySpec, NamedValue,
        RateLimit, Retry, Timeouts, TrafficPolicy, TrafficPolicySpec,
    },
};

fn targets_kind<T>(group: Option<&str>, kind: &str) -> bool
where
    T: kube::Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();

    let mut t_group = &*T::group(&dt);
    if t_group.is_empty() {
        t_group = "core";
    }

    group
        .filter(|s| !s.is_empty())
        .unwrap_or("core")
        .eq_ignore_ascii_case(t_group)
        && kind.eq_ignore_ascii_case(&T::kind(&dt))
}
