//! Backend and endpoint-set IR (spec §3).

use crate::resource::ObjectRef;
use std::net::{IpAddr, SocketAddr};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backend {
    pub id: ObjectRef,
    pub kind: BackendKind,
    pub app_protocol: Option<AppProtocol>,
    pub tls: Option<BackendTls>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppProtocol {
    H2c,
    WebSocket,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// EDS-discovered: endpoints arrive via a separate `EndpointSet`
    /// update and are never part of the policy fingerprint (spec §3).
    Service { port: u16 },
    Static { targets: Vec<SocketAddr> },
    DynamicForwardProxy,
    CloudFunction(CloudFunction),
    AiProvider(AiProvider),
    Mcp { targets: Vec<SocketAddr> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloudFunction {
    Aws { function_name: String, region: String },
    Gcp { function_name: String, region: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiProvider {
    pub provider: String,
    pub model: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendTls {
    pub sans: Vec<crate::identity::IdentityMatch>,
    pub ca_secret: Option<ObjectRef>,
}

/// The live, healthy pod set for a Service backend. Endpoint churn never
/// triggers a policy-engine recomputation; only the translator's EDS stage
/// reads it (spec §3 invariant).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct EndpointSet {
    pub endpoints: Vec<Endpoint>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub address: IpAddr,
    pub port: u16,
    pub zone: Option<String>,
    pub subset: Vec<(String, String)>,
    pub healthy: bool,
}

/// Address-family ordering used when inlining endpoints for static/cloud
/// backends (spec §4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DnsLookupFamily {
    V4Only,
    V6Only,
    V4Preferred,
    #[default]
    Auto,
    All,
}

pub fn order_addresses(addrs: &mut [SocketAddr], family: DnsLookupFamily) {
    use std::cmp::Ordering;
    let rank = |a: &SocketAddr| -> u8 {
        match (family, a.is_ipv4()) {
            (DnsLookupFamily::V4Only, true) => 0,
            (DnsLookupFamily::V4Only, false) => 1,
            (DnsLookupFamily::V6Only, false) => 0,
            (DnsLookupFamily::V6Only, true) => 1,
            (DnsLookupFamily::V4Preferred, true) => 0,
            (DnsLookupFamily::V4Preferred, false) => 1,
            (DnsLookupFamily::Auto, false) => 0,
            (DnsLookupFamily::Auto, true) => 1,
            (DnsLookupFamily::All, _) => 0,
        }
    };
    if matches!(family, DnsLookupFamily::All) {
        return;
    }
    addrs.sort_by(|a, b| match rank(a).cmp(&rank(b)) {
        Ordering::Equal => a.cmp(b),
        other => other,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn v4_preferred_orders_v4_first() {
        let mut addrs = vec![addr("[::1]:80"), addr("10.0.0.1:80")];
        order_addresses(&mut addrs, DnsLookupFamily::V4Preferred);
        assert!(addrs[0].is_ipv4());
    }

    #[test]
    fn auto_orders_v6_first() {
        let mut addrs = vec![addr("10.0.0.1:80"), addr("[::1]:80")];
        order_addresses(&mut addrs, DnsLookupFamily::Auto);
        assert!(addrs[0].is_ipv6());
    }

    #[test]
    fn all_leaves_order_unchanged() {
        let mut addrs = vec![addr("10.0.0.2:80"), addr("10.0.0.1:80")];
        let before = addrs.clone();
        order_addresses(&mut addrs, DnsLookupFamily::All);
        assert_eq!(addrs, before);
    }
}
