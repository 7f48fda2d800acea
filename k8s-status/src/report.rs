//! The per-pass report built during translation (spec §4.7): one entry
//! per reportable object, each accumulating conditions keyed by the
//! ancestor (parent/controller) they describe.

use gwctl_core::resource::{Condition, ObjectRef};
use std::collections::HashMap;

/// Identifies one ancestor entry in a reportable object's status: the
/// controller that wrote it, the parent object it describes, and (for
/// Gateway parents) the listener it narrows to.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AncestorKey {
    pub controller_name: String,
    pub parent: ObjectRef,
    pub section_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentStatus {
    pub ancestor: AncestorKey,
    pub conditions: Vec<Condition>,
}

/// Freshly computed self-owned statuses for every object touched by a
/// translation pass. Only entries for `controllerName == self` are ever
/// placed here; foreign-controller entries are never read back from
/// in-memory state, only preserved from the live object at write time
/// (see `merge::merge`).
#[derive(Default, Debug, Clone)]
pub struct ReportMap {
    entries: HashMap<ObjectRef, Vec<ParentStatus>>,
}

impl ReportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, object: ObjectRef, ancestor: AncestorKey, conditions: Vec<Condition>) {
        self.entries
            .entry(object)
            .or_default()
            .push(ParentStatus { ancestor, conditions });
    }

    pub fn get(&self, object: &ObjectRef) -> &[ParentStatus] {
        self.entries.get(object).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectRef> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwctl_core::resource::{ConditionStatus, ConditionType};

    fn accepted() -> Condition {
        Condition {
            type_: ConditionType::Accepted,
            status: ConditionStatus::True,
            reason: "Accepted".to_string(),
            message: String::new(),
            observed_generation: 1,
        }
    }

    #[test]
    fn records_one_entry_per_ancestor() {
        let mut report = ReportMap::new();
        let route = ObjectRef::new("gateway.networking.k8s.io", "HTTPRoute", "default", "echo");
        let gw = ObjectRef::new("gateway.networking.k8s.io", "Gateway", "default", "gw-1");
        report.record(
            route.clone(),
            AncestorKey {
                controller_name: "gwctl.io/controller".to_string(),
                parent: gw,
                section_name: None,
            },
            vec![accepted()],
        );
        assert_eq!(report.get(&route).len(), 1);
        assert!(report.get(&ObjectRef::new("", "HTTPRoute", "default", "other")).is_empty());
    }
}
