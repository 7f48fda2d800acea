//! The stale-status sweeper (spec §4.7, §9 open question c): objects
//! that previously carried a self-owned entry but are no longer
//! mentioned by the current translation pass's report still need that
//! entry cleared, or it lingers forever.
//!
//! This runs as a second pass after the main report-driven writes,
//! rather than inline with them, since "referenced by zero current
//! reports" can only be known once the whole pass has completed.

use gwctl_core::resource::ObjectRef;
use std::collections::HashSet;

/// Objects that carried a self-owned entry as of the previous sweep but
/// are absent from `currently_reported` this pass, and therefore need
/// their self entries cleared.
pub fn stale_objects(
    previously_self_owned: &HashSet<ObjectRef>,
    currently_reported: &HashSet<ObjectRef>,
) -> Vec<ObjectRef> {
    previously_self_owned
        .difference(currently_reported)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_dropped_from_report_is_flagged_stale() {
        let gw1 = ObjectRef::new("gateway.networking.k8s.io", "Gateway", "default", "gw-1");
        let gw2 = ObjectRef::new("gateway.networking.k8s.io", "Gateway", "default", "gw-2");
        let previously: HashSet<_> = [gw1.clone(), gw2.clone()].into_iter().collect();
        let current: HashSet<_> = [gw1.clone()].into_iter().collect();

        let stale = stale_objects(&previously, &current);
        assert_eq!(stale, vec![gw2]);
    }

    #[test]
    fn fully_covered_objects_are_not_stale() {
        let gw1 = ObjectRef::new("gateway.networking.k8s.io", "Gateway", "default", "gw-1");
        let previously: HashSet<_> = [gw1.clone()].into_iter().collect();
        let current: HashSet<_> = [gw1].into_iter().collect();
        assert!(stale_objects(&previously, &current).is_empty());
    }
}
