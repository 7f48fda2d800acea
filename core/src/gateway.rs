//! Gateway and Listener IR (spec §3).

use crate::resource::ObjectRef;
use std::num::NonZeroU16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gateway {
    pub id: ObjectRef,
    pub gateway_class_name: String,
    pub listeners: Vec<Listener>,
    pub infrastructure: Option<Infrastructure>,
}

impl Gateway {
    /// A Gateway is accepted only if at least one listener is valid
    /// (spec §3 invariant).
    pub fn is_accepted(&self) -> bool {
        self.listeners.iter().any(|l| l.valid)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Infrastructure {
    pub parameters_ref: Option<ObjectRef>,
    pub overlay_ref: Option<ObjectRef>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listener {
    pub name: String,
    pub protocol: ListenerProtocol,
    pub port: NonZeroU16,
    pub hostname: Option<String>,
    pub tls: Option<TlsConfig>,
    pub allowed_routes: AllowedRoutes,
    /// False when the listener lost a port-collision check or failed
    /// validation; excluded from the published snapshot but still
    /// reported on the Gateway's status.
    pub valid: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListenerProtocol {
    Http,
    Https,
    Tls,
    Tcp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsConfig {
    pub certificates: Vec<ObjectRef>,
    pub alpn: Vec<String>,
    pub mode: TlsMode,
}

impl TlsConfig {
    /// Default ALPN is `["h2", "http/1.1"]` unless a policy overrides it
    /// (spec §4.5).
    pub fn default_alpn() -> Vec<String> {
        vec!["h2".to_string(), "http/1.1".to_string()]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlsMode {
    Terminate,
    Passthrough,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AllowedRoutes {
    pub namespaces: NamespaceFilter,
    pub kinds: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum NamespaceFilter {
    #[default]
    Same,
    All,
    Selector(Vec<(String, String)>),
}

/// Ports across listeners (and attached ListenerSets) that collide are
/// rejected per spec §3. Two listeners collide if they share a port and
/// either share a protocol or one is unset; hostname-disjoint HTTPS/TLS
/// listeners on the same port do not collide.
pub fn colliding(a: &Listener, b: &Listener) -> bool {
    if a.port != b.port {
        return false;
    }
    if a.protocol != b.protocol {
        // TCP cannot share a port with anything else; HTTP/HTTPS/TLS may
        // share a port only when SNI (hostname) disambiguates them.
        return matches!(a.protocol, ListenerProtocol::Tcp)
            || matches!(b.protocol, ListenerProtocol::Tcp);
    }
    match (&a.hostname, &b.hostname) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listener(protocol: ListenerProtocol, port: u16, hostname: Option<&str>) -> Listener {
        Listener {
            name: "l".into(),
            protocol,
            port: NonZeroU16::new(port).unwrap(),
            hostname: hostname.map(str::to_string),
            tls: None,
            allowed_routes: AllowedRoutes::default(),
            valid: true,
        }
    }

    #[test]
    fn same_port_same_protocol_no_hostname_collides() {
        let a = listener(ListenerProtocol::Http, 80, None);
        let b = listener(ListenerProtocol::Http, 80, None);
        assert!(colliding(&a, &b));
    }

    #[test]
    fn distinct_sni_hostnames_do_not_collide() {
        let a = listener(ListenerProtocol::Https, 443, Some("a.example.com"));
        let b = listener(ListenerProtocol::Https, 443, Some("b.example.com"));
        assert!(!colliding(&a, &b));
    }

    #[test]
    fn tcp_never_shares_a_port() {
        let a = listener(ListenerProtocol::Tcp, 9000, None);
        let b = listener(ListenerProtocol::Http, 9000, None);
        assert!(colliding(&a, &b));
    }
}
