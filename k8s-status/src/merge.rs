//! The merge step of spec §4.7 step 2: preserve every ancestor entry
//! whose `controllerName != self`, replace every entry whose
//! `controllerName == self` with the freshly computed list, then sort
//! the result by `(controllerName, parentRef...)` for stability.

use crate::report::ParentStatus;

pub fn merge(controller_name: &str, existing: &[ParentStatus], fresh_self: &[ParentStatus]) -> Vec<ParentStatus> {
    let mut merged: Vec<ParentStatus> = existing
        .iter()
        .filter(|p| p.ancestor.controller_name != controller_name)
        .cloned()
        .collect();
    merged.extend(fresh_self.iter().cloned());
    merged.sort_by(|a, b| {
        (&a.ancestor.controller_name, &a.ancestor.parent, &a.ancestor.section_name).cmp(&(
            &b.ancestor.controller_name,
            &b.ancestor.parent,
            &b.ancestor.section_name,
        ))
    });
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::AncestorKey;
    use gwctl_core::resource::{Condition, ConditionStatus, ConditionType, ObjectRef};

    fn status(controller: &str, parent_name: &str) -> ParentStatus {
        ParentStatus {
            ancestor: AncestorKey {
                controller_name: controller.to_string(),
                parent: ObjectRef::new("gateway.networking.k8s.io", "Gateway", "default", parent_name),
                section_name: None,
            },
            conditions: vec![Condition {
                type_: ConditionType::Accepted,
                status: ConditionStatus::True,
                reason: "Accepted".to_string(),
                message: String::new(),
                observed_generation: 1,
            }],
        }
    }

    // Scenario 5 of spec §8: a foreign controller's entry for `gw-x` must
    // survive a write that only recomputes this controller's `gw-1` entry.
    #[test]
    fn foreign_controller_entries_are_preserved() {
        let existing = vec![status("other", "gw-x"), status("gwctl.io/controller", "gw-1-stale")];
        let fresh_self = vec![status("gwctl.io/controller", "gw-1")];

        let merged = merge("gwctl.io/controller", &existing, &fresh_self);

        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|p| p.ancestor.controller_name == "other"
            && p.ancestor.parent.name == "gw-x"));
        assert!(merged
            .iter()
            .any(|p| p.ancestor.controller_name == "gwctl.io/controller" && p.ancestor.parent.name == "gw-1"));
        assert!(!merged.iter().any(|p| p.ancestor.parent.name == "gw-1-stale"));
    }

    #[test]
    fn result_is_sorted_for_determinism() {
        let existing = vec![status("z-controller", "gw-z"), status("a-controller", "gw-a")];
        let merged = merge("gwctl.io/controller", &existing, &[]);
        assert_eq!(merged[0].ancestor.controller_name, "a-controller");
        assert_eq!(merged[1].ancestor.controller_name, "z-controller");
    }

    #[test]
    fn self_entries_with_no_fresh_report_are_dropped() {
        // If this pass produced zero ancestor entries for this controller,
        // the merge alone won't re-add stale self entries; clearing them
        // fully is the sweeper's job (spec §4.7 "stale-status sweeper").
        let existing = vec![status("gwctl.io/controller", "gw-1")];
        let merged = merge("gwctl.io/controller", &existing, &[]);
        assert!(merged.is_empty());
    }
}
