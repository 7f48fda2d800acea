//! The C9 overlay entry point: combines the metadata shallow-merge and
//! the strategic-merge-patch spec of spec §4.9 into one `apply_overlay`
//! call per rendered manifest, plus the kind-dispatch table that maps a
//! `KubernetesProxyConfig` onto the set of rendered objects.

use crate::merge::{shallow_merge_labels, strategic_merge};
use gwctl_k8s_api::policy::gateway_parameters::{KubernetesProxyConfig, ProvisionedWorkload};
use serde_json::{Map, Value};

/// The kinds this applier knows how to overlay; anything else is passed
/// through untouched (spec §4.9 "Unknown kinds are skipped").
const KNOWN_KINDS: &[&str] = &[
    "Deployment",
    "Service",
    "ServiceAccount",
    "PodDisruptionBudget",
    "HorizontalPodAutoscaler",
    "VerticalPodAutoscaler",
];

pub fn is_known_kind(kind: &str) -> bool {
    KNOWN_KINDS.contains(&kind)
}

/// Applies one overlay patch onto one rendered object. `obj` and `patch`
/// are both full manifest JSON (`{metadata, spec, ...}`); the `kind`
/// field is not itself touched. Unknown kinds are returned unchanged.
pub fn apply_overlay(obj: &Value, patch: &Value, kind: &str) -> Value {
    if !is_known_kind(kind) {
        return obj.clone();
    }

    let mut result = obj.clone();
    let Value::Object(result_map) = &mut result else {
        return obj.clone();
    };

    if let Some(Value::Object(patch_meta)) = patch.get("metadata") {
        let base_labels = result_map
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let base_annotations = result_map
            .get("metadata")
            .and_then(|m| m.get("annotations"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let metadata = result_map
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(metadata_map) = metadata {
            if let Some(Value::Object(overlay_labels)) = patch_meta.get("labels") {
                metadata_map.insert(
                    "labels".to_string(),
                    Value::Object(shallow_merge_labels(&base_labels, overlay_labels)),
                );
            }
            if let Some(Value::Object(overlay_annotations)) = patch_meta.get("annotations") {
                metadata_map.insert(
                    "annotations".to_string(),
                    Value::Object(shallow_merge_labels(&base_annotations, overlay_annotations)),
                );
            }
        }
    }

    if let Some(spec_patch) = patch.get("spec") {
        let base_spec = result_map.get("spec").cloned().unwrap_or(Value::Object(Map::new()));
        result_map.insert("spec".to_string(), strategic_merge(&base_spec, spec_patch));
    }

    result
}

/// Applies every configured overlay in `config` to its matching rendered
/// object, by kind. Kinds with no rendered object (e.g. a PDB overlay
/// when no PDB was synthesized) are silently skipped; synthesis of
/// auxiliary objects happens in `synth` before this is called.
pub fn apply_all(config: &KubernetesProxyConfig, rendered: &mut Map<String, Value>) {
    let overlays: [(&str, &Option<ProvisionedWorkload>); 6] = [
        ("Deployment", &config.deployment),
        ("Service", &config.service),
        ("ServiceAccount", &config.service_account),
        ("PodDisruptionBudget", &config.pod_disruption_budget),
        ("HorizontalPodAutoscaler", &config.horizontal_pod_autoscaler),
        ("VerticalPodAutoscaler", &config.vertical_pod_autoscaler),
    ];

    for (kind, overlay) in overlays {
        let Some(workload) = overlay else { continue };
        let Some(patch) = &workload.patch else { continue };
        if let Some(existing) = rendered.get(kind) {
            rendered.insert(kind.to_string(), apply_overlay(existing, patch, kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_labels_shallow_merge_overlay_wins() {
        let obj = json!({
            "kind": "Deployment",
            "metadata": {"labels": {"app": "gw", "team": "net"}},
            "spec": {"replicas": 1},
        });
        let patch = json!({"metadata": {"labels": {"team": "platform"}}});
        let merged = apply_overlay(&obj, &patch, "Deployment");
        assert_eq!(merged["metadata"]["labels"]["app"], "gw");
        assert_eq!(merged["metadata"]["labels"]["team"], "platform");
    }

    #[test]
    fn spec_is_strategic_merged() {
        let obj = json!({"kind": "Deployment", "spec": {"replicas": 1, "paused": false}});
        let patch = json!({"spec": {"replicas": 4}});
        let merged = apply_overlay(&obj, &patch, "Deployment");
        assert_eq!(merged["spec"]["replicas"], 4);
        assert_eq!(merged["spec"]["paused"], false);
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let obj = json!({"kind": "Ingress", "spec": {"rules": []}});
        let patch = json!({"spec": {"rules": [{"host": "example.com"}]}});
        let merged = apply_overlay(&obj, &patch, "Ingress");
        assert_eq!(merged, obj);
    }

    #[test]
    fn idempotence_round_trip_law() {
        let obj = json!({
            "kind": "Deployment",
            "metadata": {"labels": {"app": "gw"}},
            "spec": {"replicas": 1},
        });
        let patch = json!({
            "metadata": {"labels": {"tier": "edge"}},
            "spec": {"replicas": 3},
        });
        let once = apply_overlay(&obj, &patch, "Deployment");
        let twice = apply_overlay(&once, &patch, "Deployment");
        assert_eq!(once, twice);
    }
}
