//! Policy attachment and merge (spec §4.4, C4): resolves which policies
//! attach to a given object at a given hierarchy level, then folds their
//! fields in most-specific-wins order, recording provenance for every
//! surviving value.

use crate::collection::Collection;
use gwctl_core::{
    policy::{
        FieldData, FieldValue, HierarchyLevel, MergeOrigins, MergeStrategy, Origin, Policy,
        PolicyFields, PolicyKind, TargetRef, TargetSelector,
    },
    resource::ObjectRef,
};

/// One rung of the attachment hierarchy a concrete object sits at —
/// e.g. the HTTPRoute rule itself, the route, the listener it binds,
/// the Gateway, the GatewayClass, and finally the global policy
/// namespace (spec §4.4 rule 1).
#[derive(Clone, Debug)]
pub struct AttachmentPoint {
    pub level: HierarchyLevel,
    pub object: ObjectRef,
    pub section_name: Option<String>,
    pub labels: Vec<(String, String)>,
}

impl AttachmentPoint {
    pub fn new(level: HierarchyLevel, object: ObjectRef) -> Self {
        Self {
            level,
            object,
            section_name: None,
            labels: Vec::new(),
        }
    }

    pub fn with_section(mut self, section_name: impl Into<String>) -> Self {
        self.section_name = Some(section_name.into());
        self
    }
}

fn target_ref_matches(tr: &TargetRef, point: &AttachmentPoint) -> bool {
    tr.group == point.object.group
        && tr.kind == point.object.kind
        && tr.name == point.object.name
        && tr
            .namespace
            .as_deref()
            .unwrap_or(&point.object.namespace)
            == point.object.namespace
        && tr
            .section_name
            .as_deref()
            .map(|s| Some(s) == point.section_name.as_deref())
            .unwrap_or(true)
}

fn target_selector_matches(ts: &TargetSelector, point: &AttachmentPoint) -> bool {
    ts.group == point.object.group
        && ts.kind == point.object.kind
        && ts
            .match_labels
            .iter()
            .all(|(k, v)| point.labels.iter().any(|(lk, lv)| lk == k && lv == v))
}

#[derive(Clone)]
pub struct PolicyEngine {
    policies: Collection<ObjectRef, Policy>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            policies: Collection::new(),
        }
    }

    pub fn policies(&self) -> &Collection<ObjectRef, Policy> {
        &self.policies
    }

    /// Every policy of `kind` that targets `point`, ordered by
    /// `creationTimestamp` then `uid` for a stable tie-break when two
    /// policies were created at the same instant (spec §9 Open Question).
    pub fn attached(&self, kind: PolicyKind, point: &AttachmentPoint) -> Vec<Policy> {
        let mut matched: Vec<Policy> = self
            .policies
            .list()
            .into_iter()
            .filter(|p| {
                p.kind == kind
                    && (p.target_refs.iter().any(|tr| target_ref_matches(tr, point))
                        || p
                            .target_selectors
                            .iter()
                            .any(|ts| target_selector_matches(ts, point)))
            })
            .collect();
        matched.sort_by(|a, b| {
            a.creation_timestamp
                .cmp(&b.creation_timestamp)
                .then_with(|| a.uid.cmp(&b.uid))
        });
        matched
    }

    /// Folds every attached policy of `kind` across `points`, which must
    /// be ordered most-specific-first (`Rule` before `Global`). A field
    /// set at a more specific level always wins; a `disable` directive at
    /// a more specific level suppresses the field at every less specific
    /// level, per spec §4.4 "Disable semantics".
    pub fn merge(&self, points: &[AttachmentPoint], kind: PolicyKind) -> (PolicyFields, MergeOrigins) {
        let mut result = PolicyFields::default();
        let mut origins = MergeOrigins::default();
        let mut list_append: std::collections::HashMap<String, Vec<String>> = Default::default();

        for point in points {
            for policy in self.attached(kind, point) {
                for (path, value) in &policy.fields.fields {
                    if origins.origins.contains_key(path) && !matches!(
                        PolicyFields::merge_strategy_for(path),
                        MergeStrategy::ListAppend
                    ) {
                        continue;
                    }
                    match value {
                        FieldValue::Disabled => {
                            origins
                                .origins
                                .entry(path.clone())
                                .or_insert_with(|| Origin::DisabledBy(policy.id.clone()));
                            result.fields.remove(path);
                        }
                        FieldValue::Set(data) => {
                            if origins.origins.contains_key(path) {
                                // Already resolved at a more specific level
                                // unless this path list-appends.
                                if let (MergeStrategy::ListAppend, FieldData::StringList(items)) =
                                    (PolicyFields::merge_strategy_for(path), data)
                                {
                                    list_append
                                        .entry(path.clone())
                                        .or_default()
                                        .extend(items.iter().cloned());
                                }
                                continue;
                            }
                            origins
                                .origins
                                .insert(path.clone(), Origin::Policy(policy.id.clone()));
                            if let (MergeStrategy::ListAppend, FieldData::StringList(items)) =
                                (PolicyFields::merge_strategy_for(path), data)
                            {
                                list_append.entry(path.clone()).or_default().extend(items.iter().cloned());
                            } else {
                                result.fields.insert(path.clone(), value.clone());
                            }
                        }
                    }
                }
            }
        }

        for (path, items) in list_append {
            if !matches!(origins.origins.get(&path), Some(Origin::DisabledBy(_))) {
                result
                    .fields
                    .insert(path, FieldValue::Set(FieldData::StringList(items)));
            }
        }

        (result, origins)
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn policy(
        name: &str,
        target: ObjectRef,
        section: Option<&str>,
        fields: Vec<(&str, FieldValue)>,
        ts: i64,
    ) -> Policy {
        Policy {
            id: ObjectRef::new("gateway.kgateway.dev", "TrafficPolicy", "ns1", name),
            kind: PolicyKind::TrafficPolicy,
            target_refs: vec![TargetRef {
                group: target.group.clone(),
                kind: target.kind.clone(),
                name: target.name.clone(),
                namespace: Some(target.namespace.clone()),
                section_name: section.map(|s| s.to_string()),
            }],
            target_selectors: vec![],
            creation_timestamp: Some(Utc.timestamp_opt(ts, 0).unwrap()),
            uid: name.to_string(),
            fields: PolicyFields {
                fields: fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            },
        }
    }

    #[test]
    fn route_level_overrides_gateway_level() {
        let engine = PolicyEngine::new();
        let route = ObjectRef::new("gateway.networking.k8s.io", "HTTPRoute", "ns1", "r1");
        let gw = ObjectRef::new("gateway.networking.k8s.io", "Gateway", "ns1", "gw1");

        engine.policies().apply(
            ObjectRef::new("gateway.kgateway.dev", "TrafficPolicy", "ns1", "route-pol"),
            policy(
                "route-pol",
                route.clone(),
                None,
                vec![("timeouts.request", FieldValue::Set(FieldData::Unsigned(5)))],
                1,
            ),
        );
        engine.policies().apply(
            ObjectRef::new("gateway.kgateway.dev", "TrafficPolicy", "ns1", "gw-pol"),
            policy(
                "gw-pol",
                gw.clone(),
                None,
                vec![("timeouts.request", FieldValue::Set(FieldData::Unsigned(30)))],
                1,
            ),
        );

        let points = vec![
            AttachmentPoint::new(HierarchyLevel::Route, route),
            AttachmentPoint::new(HierarchyLevel::Gateway, gw),
        ];
        let (fields, origins) = engine.merge(&points, PolicyKind::TrafficPolicy);
        assert_eq!(
            fields.get("timeouts.request"),
            Some(&FieldValue::Set(FieldData::Unsigned(5)))
        );
        assert!(matches!(origins.origins.get("timeouts.request"), Some(Origin::Policy(_))));
    }

    #[test]
    fn disable_at_route_level_suppresses_gateway_value() {
        let engine = PolicyEngine::new();
        let route = ObjectRef::new("gateway.networking.k8s.io", "HTTPRoute", "ns1", "r1");
        let gw = ObjectRef::new("gateway.networking.k8s.io", "Gateway", "ns1", "gw1");

        engine.policies().apply(
            ObjectRef::new("gateway.kgateway.dev", "TrafficPolicy", "ns1", "route-pol"),
            policy("route-pol", route.clone(), None, vec![("cors.allowOrigins", FieldValue::Disabled)], 1),
        );
        engine.policies().apply(
            ObjectRef::new("gateway.kgateway.dev", "TrafficPolicy", "ns1", "gw-pol"),
            policy(
                "gw-pol",
                gw.clone(),
                None,
                vec![(
                    "cors.allowOrigins",
                    FieldValue::Set(FieldData::StringList(vec!["*".to_string()])),
                )],
                1,
            ),
        );

        let points = vec![
            AttachmentPoint::new(HierarchyLevel::Route, route),
            AttachmentPoint::new(HierarchyLevel::Gateway, gw),
        ];
        let (fields, origins) = engine.merge(&points, PolicyKind::TrafficPolicy);
        assert_eq!(fields.get("cors.allowOrigins"), None);
        assert!(matches!(
            origins.origins.get("cors.allowOrigins"),
            Some(Origin::DisabledBy(_))
        ));
    }

    #[test]
    fn list_append_accumulates_across_levels() {
        let engine = PolicyEngine::new();
        let route = ObjectRef::new("gateway.networking.k8s.io", "HTTPRoute", "ns1", "r1");
        let gw = ObjectRef::new("gateway.networking.k8s.io", "Gateway", "ns1", "gw1");

        engine.policies().apply(
            ObjectRef::new("gateway.kgateway.dev", "TrafficPolicy", "ns1", "route-pol"),
            policy(
                "route-pol",
                route.clone(),
                None,
                vec![(
                    "headers.add",
                    FieldValue::Set(FieldData::StringList(vec!["x-route: 1".to_string()])),
                )],
                1,
            ),
        );
        engine.policies().apply(
            ObjectRef::new("gateway.kgateway.dev", "TrafficPolicy", "ns1", "gw-pol"),
            policy(
                "gw-pol",
                gw.clone(),
                None,
                vec![(
                    "headers.add",
                    FieldValue::Set(FieldData::StringList(vec!["x-gw: 1".to_string()])),
                )],
                1,
            ),
        );

        let points = vec![
            AttachmentPoint::new(HierarchyLevel::Route, route),
            AttachmentPoint::new(HierarchyLevel::Gateway, gw),
        ];
        let (fields, _origins) = engine.merge(&points, PolicyKind::TrafficPolicy);
        match fields.get("headers.add") {
            Some(FieldValue::Set(FieldData::StringList(items))) => {
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected appended list, got {other:?}"),
        }
    }

    #[test]
    fn section_name_narrows_to_one_listener() {
        let engine = PolicyEngine::new();
        let gw = ObjectRef::new("gateway.networking.k8s.io", "Gateway", "ns1", "gw1");
        engine.policies().apply(
            ObjectRef::new("gateway.kgateway.dev", "ListenerPolicy", "ns1", "l-pol"),
            policy(
                "l-pol",
                gw.clone(),
                Some("https"),
                vec![("idleTimeout", FieldValue::Set(FieldData::Unsigned(60)))],
                1,
            ),
        );

        let matching = AttachmentPoint::new(HierarchyLevel::Listener, gw.clone()).with_section("https");
        let non_matching = AttachmentPoint::new(HierarchyLevel::Listener, gw).with_section("http");

        assert_eq!(engine.attached(PolicyKind::TrafficPolicy, &matching).len(), 1);
        assert_eq!(engine.attached(PolicyKind::TrafficPolicy, &non_matching).len(), 0);
    }
}
