//! The immutable, version-stamped configuration bundle published to a
//! data-plane client (spec §3 "Snapshot", GLOSSARY "UCC").

use crate::{backend::EndpointSet, resource::ObjectRef};
use ahash::AHashMap as HashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Unique client identity: the node metadata triple a data-plane instance
/// presents on connect.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClientId {
    pub cluster: String,
    pub namespace: String,
    pub labels: Vec<(String, String)>,
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.cluster, self.namespace)
    }
}

/// An immutable, deep-copied bundle of proxy configuration for one
/// client. Snapshots are structurally shared via `Arc` between
/// publications but are never mutated after construction (spec §3
/// invariant).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u64,
    pub listeners: Arc<Vec<ListenerConfig>>,
    pub routes: Arc<Vec<RouteConfig>>,
    pub clusters: Arc<Vec<ClusterConfig>>,
    pub endpoints: Arc<HashMap<ObjectRef, EndpointSet>>,
    pub secrets: Arc<Vec<SecretConfig>>,
}

impl Snapshot {
    /// A content hash over the deterministic, canonical encoding of every
    /// field, used by tests asserting translator determinism (spec §8).
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for l in self.listeners.iter() {
            hasher.update(l.name.as_bytes());
        }
        for r in self.routes.iter() {
            hasher.update(r.name.as_bytes());
        }
        for c in self.clusters.iter() {
            hasher.update(c.name.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerConfig {
    pub name: String,
    pub address: std::net::SocketAddr,
    pub filter_chains: Vec<FilterChain>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterChain {
    pub sni: Vec<String>,
    pub stages: Vec<FilterStage>,
    pub tls: Option<String>,
}

/// The fixed pipeline stages a filter chain is assembled from, in
/// emission order (spec §4.5 "Filter chain assembly").
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    AuthN,
    AuthZ,
    HealthCheck,
    RateLimit,
    HeaderMutation,
    Transformation,
    Compression,
    Route,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterStage {
    pub stage: Stage,
    pub plugin: String,
    pub route_config_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteConfig {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHost>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<RouteEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub name: String,
    pub cluster: String,
    pub weighted_clusters: Vec<(String, u32)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterConfig {
    pub name: String,
    pub discovery: Discovery,
    pub tls: Option<ClusterTls>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discovery {
    Eds,
    Static(Vec<std::net::SocketAddr>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterTls {
    pub sni: Option<String>,
    pub sans: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretConfig {
    pub name: String,
    pub cert_chain: Vec<u8>,
    pub private_key: Vec<u8>,
}

/// The raw translator product before it is stamped with a version and
/// wrapped for publication (spec §4.5).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TranslationResult {
    pub listeners: Vec<ListenerConfig>,
    pub routes: Vec<RouteConfig>,
    pub clusters: Vec<ClusterConfig>,
    pub endpoints: HashMap<ObjectRef, EndpointSet>,
    pub secrets: Vec<SecretConfig>,
}
