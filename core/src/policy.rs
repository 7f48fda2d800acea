//! Policy IR (spec §3, §4.4): targets, merge strategy declarations, and
//! the provenance map the policy engine produces alongside every merged
//! value.

use crate::resource::ObjectRef;
use ahash::AHashMap as HashMap;
use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    TrafficPolicy,
    ListenerPolicy,
    HttpListenerPolicy,
    BackendConfigPolicy,
    BackendTlsPolicy,
    GatewayExtension,
}

impl PolicyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrafficPolicy => "TrafficPolicy",
            Self::ListenerPolicy => "ListenerPolicy",
            // HTTPListenerPolicy is deprecated and folded into
            // ListenerPolicy.httpSettings at attachment time (spec §6);
            // its own kind is retained only to recognize and translate
            // legacy documents.
            Self::HttpListenerPolicy => "HTTPListenerPolicy",
            Self::BackendConfigPolicy => "BackendConfigPolicy",
            Self::BackendTlsPolicy => "BackendTLSPolicy",
            Self::GatewayExtension => "GatewayExtension",
        }
    }
}

/// Where in the attachment hierarchy a policy was attached. Ordered so
/// that `Rule > Route > Listener > Gateway > Class > Global` sorts
/// ascending as "most specific first" (spec §4.4 rule 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HierarchyLevel {
    Rule,
    Route,
    Listener,
    Gateway,
    Class,
    Global,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetRef {
    pub group: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub section_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetSelector {
    pub group: String,
    pub kind: String,
    pub match_labels: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policy {
    pub id: ObjectRef,
    pub kind: PolicyKind,
    pub target_refs: Vec<TargetRef>,
    pub target_selectors: Vec<TargetSelector>,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub uid: String,
    pub fields: PolicyFields,
}

/// The field-level merge strategy a policy kind declares for itself.
/// `OverrideFirst` is the default; kinds opt into `DeepMerge` via a
/// merge-settings document (spec §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStrategy {
    OverrideFirst,
    OverrideLast,
    DeepMerge,
    ListAppend,
}

/// A typed configuration fragment. Each field is independently
/// mergeable; a field holding `None` means "not set by this policy" and
/// is skipped during the fold, distinct from `Disabled` which actively
/// clears an inherited value (spec §4.4 "Disable semantics").
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PolicyFields {
    pub fields: HashMap<String, FieldValue>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Set(FieldData),
    Disabled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldData {
    Duration(std::time::Duration),
    Unsigned(u64),
    Text(String),
    StringList(Vec<String>),
    Bool(bool),
}

impl PolicyFields {
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        self.fields.get(path)
    }

    pub fn merge_strategy_for(path: &str) -> MergeStrategy {
        // A small number of well-known fields opt into list-append /
        // deep-merge; everything else defaults to override-first (spec
        // §4.4).
        match path {
            "retry.attempts" | "timeouts.request" => MergeStrategy::OverrideFirst,
            p if p.starts_with("headers.add") => MergeStrategy::ListAppend,
            p if p.starts_with("cors.") => MergeStrategy::DeepMerge,
            _ => MergeStrategy::OverrideFirst,
        }
    }
}

/// Maps a merged field's path to the policy that contributed its final
/// value, or `None` if the field was cleared by a `disable` directive at
/// a lower level (spec §4.4, GLOSSARY "MergeOrigins").
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct MergeOrigins {
    pub origins: HashMap<String, Origin>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    Policy(ObjectRef),
    DisabledBy(ObjectRef),
}
