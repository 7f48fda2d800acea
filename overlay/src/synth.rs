//! Synthesizes auxiliary workload objects — PodDisruptionBudget,
//! HorizontalPodAutoscaler, VerticalPodAutoscaler — when an overlay for
//! that kind is present and a Deployment exists to target it (spec
//! §4.9: "Auxiliary objects ... are synthesized when the overlay is
//! present and a Deployment exists to target").
//!
//! VPA has no stable upstream API type, so like the overlay patches
//! themselves its rendered form is plain JSON shaped to the
//! `autoscaling.k8s.io/v1` CRD schema rather than a typed
//! `k8s-openapi` struct.

use gwctl_k8s_api::policy::gateway_parameters::{KubernetesProxyConfig, ProvisionedWorkload};
use k8s_openapi::{
    api::{
        autoscaling::v2::{HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec},
        policy::v1::{PodDisruptionBudget, PodDisruptionBudgetSpec},
    },
    apimachinery::pkg::{apis::meta::v1::ObjectMeta, util::intstr::IntOrString},
};
use serde_json::{json, Map, Value};

fn owner_meta(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

fn selector(deployment_name: &str) -> k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector {
    let mut match_labels = std::collections::BTreeMap::new();
    match_labels.insert("app".to_string(), deployment_name.to_string());
    k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector {
        match_labels: Some(match_labels),
        ..Default::default()
    }
}

/// Builds a default PDB targeting `deployment_name`, allowing at most one
/// unavailable replica. The overlay patch (if any) is applied on top by
/// the caller via `apply_overlay`.
pub fn synthesize_pdb(deployment_name: &str, namespace: &str) -> PodDisruptionBudget {
    PodDisruptionBudget {
        metadata: owner_meta(deployment_name, namespace),
        spec: Some(PodDisruptionBudgetSpec {
            max_unavailable: Some(IntOrString::Int(1)),
            selector: Some(selector(deployment_name)),
            ..Default::default()
        }),
        status: None,
    }
}

/// Builds a default HPA scaling `deployment_name` between 1 and 3
/// replicas on CPU utilization. Overlay-provided bounds replace these.
pub fn synthesize_hpa(deployment_name: &str, namespace: &str) -> HorizontalPodAutoscaler {
    use k8s_openapi::api::autoscaling::v2::{
        CrossVersionObjectReference, MetricSpec, MetricTarget, ResourceMetricSource,
    };

    HorizontalPodAutoscaler {
        metadata: owner_meta(deployment_name, namespace),
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: deployment_name.to_string(),
            },
            min_replicas: Some(1),
            max_replicas: 3,
            metrics: Some(vec![MetricSpec {
                type_: "Resource".to_string(),
                resource: Some(ResourceMetricSource {
                    name: "cpu".to_string(),
                    target: MetricTarget {
                        type_: "Utilization".to_string(),
                        average_utilization: Some(80),
                        ..Default::default()
                    },
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

/// Builds a default VPA in `Off` update mode (recommendation-only),
/// represented as raw JSON since `autoscaling.k8s.io/v1` is a CRD this
/// crate has no generated type for.
pub fn synthesize_vpa(deployment_name: &str, namespace: &str) -> Value {
    json!({
        "apiVersion": "autoscaling.k8s.io/v1",
        "kind": "VerticalPodAutoscaler",
        "metadata": {"name": deployment_name, "namespace": namespace},
        "spec": {
            "targetRef": {
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "name": deployment_name,
            },
            "updatePolicy": {"updateMode": "Off"},
        },
    })
}

/// Synthesizes every auxiliary kind whose overlay is present, inserting
/// the serialized result into `rendered` keyed by kind. Does nothing if
/// `rendered` has no Deployment (nothing to target).
pub fn synthesize_auxiliaries(
    config: &KubernetesProxyConfig,
    deployment_name: &str,
    namespace: &str,
    rendered: &mut Map<String, Value>,
) {
    if !rendered.contains_key("Deployment") {
        return;
    }

    if config.pod_disruption_budget.is_some() {
        let pdb = synthesize_pdb(deployment_name, namespace);
        if let Ok(value) = serde_json::to_value(&pdb) {
            rendered.insert("PodDisruptionBudget".to_string(), value);
        }
    }

    if config.horizontal_pod_autoscaler.is_some() {
        let hpa = synthesize_hpa(deployment_name, namespace);
        if let Ok(value) = serde_json::to_value(&hpa) {
            rendered.insert("HorizontalPodAutoscaler".to_string(), value);
        }
    }

    if config.vertical_pod_autoscaler.is_some() {
        rendered.insert(
            "VerticalPodAutoscaler".to_string(),
            synthesize_vpa(deployment_name, namespace),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdb_targets_the_deployment_by_label() {
        let pdb = synthesize_pdb("gw-envoy", "gw-system");
        let selector = pdb.spec.unwrap().selector.unwrap();
        assert_eq!(
            selector.match_labels.unwrap().get("app"),
            Some(&"gw-envoy".to_string())
        );
    }

    #[test]
    fn hpa_scales_the_deployment() {
        let hpa = synthesize_hpa("gw-envoy", "gw-system");
        let spec = hpa.spec.unwrap();
        assert_eq!(spec.scale_target_ref.name, "gw-envoy");
        assert_eq!(spec.max_replicas, 3);
    }

    #[test]
    fn vpa_is_off_by_default() {
        let vpa = synthesize_vpa("gw-envoy", "gw-system");
        assert_eq!(vpa["spec"]["updatePolicy"]["updateMode"], "Off");
    }

    #[test]
    fn no_deployment_means_no_synthesis() {
        let config = KubernetesProxyConfig {
            deployment: None,
            service: None,
            service_account: None,
            pod_disruption_budget: None,
            horizontal_pod_autoscaler: None,
            vertical_pod_autoscaler: None,
        };
        let mut rendered = Map::new();
        synthesize_auxiliaries(&config, "gw-envoy", "gw-system", &mut rendered);
        assert!(rendered.is_empty());
    }

    #[test]
    fn vpa_is_synthesized_when_requested_and_deployment_exists() {
        let config = KubernetesProxyConfig {
            deployment: Some(ProvisionedWorkload { replicas: None, patch: None }),
            service: None,
            service_account: None,
            pod_disruption_budget: None,
            horizontal_pod_autoscaler: None,
            vertical_pod_autoscaler: Some(ProvisionedWorkload { replicas: None, patch: None }),
        };
        let mut rendered = Map::new();
        rendered.insert("Deployment".to_string(), json!({"kind": "Deployment"}));
        synthesize_auxiliaries(&config, "gw-envoy", "gw-system", &mut rendered);
        assert_eq!(
            rendered["VerticalPodAutoscaler"]["spec"]["updatePolicy"]["updateMode"],
            "Off"
        );
    }
}
