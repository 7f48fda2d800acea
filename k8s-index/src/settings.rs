//! Cluster-wide settings threaded through the resolver, policy engine and
//! translator; these are exactly the flags spec §6 lists under
//! "feature flags" (experimental features, global policy namespace,
//! validation mode, weighted route precedence, discovery namespace
//! selectors, DNS lookup family).

use crate::ports::PortSet;
use gwctl_core::{backend::DnsLookupFamily, error::ValidationMode, IpNet};

#[derive(Clone, Debug)]
pub struct Settings {
    /// Networks including pod/service IPs in this cluster; used by the
    /// resolver to classify an address as in-cluster vs. external.
    pub cluster_networks: Vec<IpNet>,

    pub cluster_domain: String,

    /// The namespace policies without an explicit namespace fall back to
    /// (spec §6 "global policy namespace").
    pub global_policy_namespace: Option<String>,

    pub validation_mode: ValidationMode,

    /// When set, route weight overrides match specificity in the
    /// translator's ordering stage (spec §4.5).
    pub weighted_route_precedence: bool,

    pub dns_lookup_family: DnsLookupFamily,

    /// Restricts which namespaces are watched for Gateway API/backend
    /// resources; `None` means cluster-wide.
    pub discovery_namespace_selector: Option<Vec<(String, String)>>,

    pub experimental_features: bool,

    pub reserved_ports: PortSet,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cluster_networks: Vec::new(),
            cluster_domain: "cluster.local".to_string(),
            global_policy_namespace: None,
            validation_mode: ValidationMode::Standard,
            weighted_route_precedence: false,
            dns_lookup_family: DnsLookupFamily::Auto,
            discovery_namespace_selector: None,
            experimental_features: false,
            reserved_ports: PortSet::default(),
        }
    }
}

impl Settings {
    pub fn is_in_cluster(&self, addr: std::net::IpAddr) -> bool {
        self.cluster_networks.iter().any(|n| n.contains(&addr))
    }
}
