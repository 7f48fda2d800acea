//! Strategic-merge-patch semantics over rendered manifest JSON (spec
//! §4.9). Object fields are merged key-by-key; `$patch: delete` drops a
//! key or (inside a list item) a matching element; `$patch: replace`
//! replaces the subtree wholesale instead of merging into it. Arrays
//! with no `$patch` directive are replaced wholesale, matching the
//! common case for the kinds this applier targets (containers, volumes,
//! ports are small enough that callers overlay the whole list).

use serde_json::{Map, Value};

const PATCH_KEY: &str = "$patch";
const PATCH_DELETE: &str = "delete";
const PATCH_REPLACE: &str = "replace";

/// Applies `patch` onto `base`, returning the merged document. `base` is
/// left untouched; the result is a new value.
pub fn strategic_merge(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            if directive(patch_map) == Some(PATCH_REPLACE) {
                return Value::Object(without_directive(patch_map));
            }
            let mut merged = base_map.clone();
            for (key, patch_value) in patch_map {
                if key == PATCH_KEY {
                    continue;
                }
                if let Value::Object(nested) = patch_value {
                    if directive(nested) == Some(PATCH_DELETE) {
                        merged.remove(key);
                        continue;
                    }
                }
                match merged.get(key) {
                    Some(existing) => {
                        merged.insert(key.clone(), strategic_merge(existing, patch_value));
                    }
                    None => {
                        merged.insert(key.clone(), strip_directives(patch_value));
                    }
                }
            }
            Value::Object(merged)
        }
        // A patch that isn't an object (including a bare array overlay)
        // always wins outright.
        (_, patch_value) => strip_directives(patch_value),
    }
}

fn directive(map: &Map<String, Value>) -> Option<&str> {
    map.get(PATCH_KEY).and_then(Value::as_str)
}

fn without_directive(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = map.clone();
    out.remove(PATCH_KEY);
    out
}

/// Recursively removes `$patch` directive keys from a value that is
/// about to be inserted wholesale (it had no counterpart in `base`, so
/// there's nothing left to apply the directive against).
fn strip_directives(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                if k == PATCH_KEY {
                    continue;
                }
                out.insert(k.clone(), strip_directives(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(strip_directives).collect()),
        other => other.clone(),
    }
}

/// Shallow-merges two label/annotation maps with overlay values winning,
/// per spec §4.9 ("metadata labels/annotations are shallow-merged").
pub fn shallow_merge_labels(
    base: &Map<String, Value>,
    overlay: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = base.clone();
    for (k, v) in overlay {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_fields_are_overridden() {
        let base = json!({"replicas": 1, "image": "envoy:1"});
        let patch = json!({"replicas": 3});
        let merged = strategic_merge(&base, &patch);
        assert_eq!(merged, json!({"replicas": 3, "image": "envoy:1"}));
    }

    #[test]
    fn nested_objects_are_deep_merged() {
        let base = json!({"spec": {"replicas": 1, "template": {"spec": {"containers": []}}}});
        let patch = json!({"spec": {"replicas": 2}});
        let merged = strategic_merge(&base, &patch);
        assert_eq!(
            merged,
            json!({"spec": {"replicas": 2, "template": {"spec": {"containers": []}}}})
        );
    }

    #[test]
    fn patch_delete_removes_key() {
        let base = json!({"spec": {"replicas": 1, "paused": true}});
        let patch = json!({"spec": {"paused": {"$patch": "delete"}}});
        let merged = strategic_merge(&base, &patch);
        assert_eq!(merged, json!({"spec": {"replicas": 1}}));
    }

    #[test]
    fn patch_replace_discards_base_subtree() {
        let base = json!({"spec": {"replicas": 1, "paused": true, "strategy": "RollingUpdate"}});
        let patch = json!({"spec": {"$patch": "replace", "replicas": 5}});
        let merged = strategic_merge(&base, &patch);
        assert_eq!(merged, json!({"spec": {"replicas": 5}}));
    }

    #[test]
    fn idempotent_round_trip() {
        let base = json!({"spec": {"replicas": 1, "template": {"metadata": {"labels": {"a": "1"}}}}});
        let patch = json!({"spec": {"replicas": 3, "template": {"metadata": {"labels": {"b": "2"}}}}});
        let once = strategic_merge(&base, &patch);
        let twice = strategic_merge(&once, &patch);
        assert_eq!(once, twice);
    }

    #[test]
    fn labels_shallow_merge_overlay_wins() {
        let base: Map<String, Value> = json!({"app": "gw", "team": "net"}).as_object().unwrap().clone();
        let overlay: Map<String, Value> = json!({"team": "platform", "tier": "edge"})
            .as_object()
            .unwrap()
            .clone();
        let merged = shallow_merge_labels(&base, &overlay);
        assert_eq!(merged.get("app").unwrap(), "gw");
        assert_eq!(merged.get("team").unwrap(), "platform");
        assert_eq!(merged.get("tier").unwrap(), "edge");
    }
}
