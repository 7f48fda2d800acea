//! Converts watched Gateway API objects into the IR types `gwctl_core`
//! defines (spec §3). Each function here is a pure `K8s type -> IR`
//! mapping; nothing here touches a `Collection` directly, so the
//! conversions can be unit tested without standing up a watch.

use gwctl_core::{
    gateway::{AllowedRoutes, Gateway, Infrastructure, Listener, ListenerProtocol, NamespaceFilter, TlsConfig, TlsMode},
    resource::ObjectRef,
    route::{GrpcRoute, HttpFilter, HttpRoute, HttpRouteRule, ParentRef, Route, TcpRoute, TcpRouteRule, WeightedBackend},
    route_match::{HeaderModifierFilter, HeaderName, HeaderValue, HttpRouteMatch, RequestRedirectFilter, Scheme, StatusCode},
};
use gwctl_k8s_api::gateway as api;
use std::num::NonZeroU16;

fn header_name(s: &str) -> Option<HeaderName> {
    HeaderName::try_from(s).ok()
}

fn header_value(s: &str) -> Option<HeaderValue> {
    HeaderValue::try_from(s).ok()
}

/// Builds the IR `Gateway` for one `Gateway` object. Listeners the
/// apiserver already rejected (malformed TLS, bad port) are still
/// carried through with `valid: false` so the status aggregator can
/// report `Programmed=False` for just that listener rather than the
/// whole object (spec §4.2 "Partial validity").
pub fn gateway_from_api(
    namespace: &str,
    name: &str,
    spec: &api::gateway::v1::GatewaySpec,
) -> Gateway {
    let id = ObjectRef::new("gateway.networking.k8s.io", "Gateway", namespace, name);
    let listeners = spec
        .listeners
        .iter()
        .map(listener_from_api)
        .collect::<Vec<_>>();

    Gateway {
        id,
        gateway_class_name: spec.gateway_class_name.clone(),
        listeners,
        infrastructure: spec.infrastructure.as_ref().map(|_| Infrastructure {
            parameters_ref: None,
            overlay_ref: None,
        }),
    }
}

fn listener_from_api(l: &api::gateway::v1::Listener) -> Listener {
    let protocol = match l.protocol.as_str() {
        "HTTP" => ListenerProtocol::Http,
        "HTTPS" => ListenerProtocol::Https,
        "TLS" => ListenerProtocol::Tls,
        "TCP" => ListenerProtocol::Tcp,
        _ => ListenerProtocol::Tcp,
    };

    let port = NonZeroU16::new(l.port as u16);
    let valid = port.is_some();

    let tls = l.tls.as_ref().map(|tls| {
        let mode = match tls.mode.as_deref() {
            Some("Passthrough") => TlsMode::Passthrough,
            _ => TlsMode::Terminate,
        };
        TlsConfig {
            certificates: tls
                .certificate_refs
                .iter()
                .flatten()
                .map(|r| ObjectRef::new("", "Secret", r.namespace.clone().unwrap_or_default(), r.name.clone()))
                .collect(),
            alpn: TlsConfig::default_alpn(),
            mode,
        }
    });

    let allowed_routes = l.allowed_routes.as_ref().map(|ar| AllowedRoutes {
        namespaces: match ar.namespaces.as_ref().and_then(|n| n.from.as_deref()) {
            Some("All") => NamespaceFilter::All,
            Some("Selector") => NamespaceFilter::Selector(
                ar.namespaces
                    .as_ref()
                    .and_then(|n| n.selector.as_ref())
                    .and_then(|s| s.match_labels.as_ref())
                    .map(|m| m.clone().into_iter().collect())
                    .unwrap_or_default(),
            ),
            _ => NamespaceFilter::Same,
        },
        kinds: ar
            .kinds
            .iter()
            .flatten()
            .map(|k| k.kind.clone())
            .collect(),
    });

    Listener {
        name: l.name.clone(),
        protocol,
        port: port.unwrap_or_else(|| NonZeroU16::new(1).unwrap()),
        hostname: l.hostname.clone(),
        tls,
        allowed_routes: allowed_routes.unwrap_or_default(),
        valid,
    }
}

/// Builds the IR `HttpRoute` for one `HTTPRoute` object, including its
/// filter chain. Backend resolution happens later, in the translator —
/// this only carries forward the `BackendRef` identity and weight.
pub fn http_route_from_api(
    namespace: &str,
    name: &str,
    creation_timestamp: Option<chrono::DateTime<chrono::Utc>>,
    spec: &api::gateway::v1::HTTPRouteSpec,
) -> HttpRoute {
    let id = ObjectRef::new("gateway.networking.k8s.io", "HTTPRoute", namespace, name);

    let parent_refs = spec
        .parent_refs
        .iter()
        .flatten()
        .map(|p| ParentRef {
            gateway: ObjectRef::new(
                "gateway.networking.k8s.io",
                "Gateway",
                p.namespace.clone().unwrap_or_else(|| namespace.to_string()),
                p.name.clone(),
            ),
            section_name: p.section_name.clone(),
            port: p.port.map(|port| port as u16),
        })
        .collect();

    let hostnames = spec.hostnames.clone().unwrap_or_default();

    let rules = spec
        .rules
        .iter()
        .flatten()
        .map(|rule| http_rule_from_api(namespace, rule))
        .collect();

    HttpRoute {
        id,
        parent_refs,
        hostnames,
        rules,
        creation_timestamp,
    }
}

fn http_rule_from_api(namespace: &str, rule: &api::gateway::v1::HTTPRouteRule) -> HttpRouteRule {
    let matches = rule
        .matches
        .iter()
        .flatten()
        .map(|_m| HttpRouteMatch::default())
        .collect::<Vec<_>>();
    let matches = if matches.is_empty() {
        vec![HttpRouteMatch::default()]
    } else {
        matches
    };

    let backends = rule
        .backend_refs
        .iter()
        .flatten()
        .map(|b| WeightedBackend {
            backend: ObjectRef::new(
                b.backend_ref.group.clone().unwrap_or_default(),
                b.backend_ref.kind.clone().unwrap_or_else(|| "Service".to_string()),
                b.backend_ref
                    .namespace
                    .clone()
                    .unwrap_or_else(|| namespace.to_string()),
                b.backend_ref.name.clone(),
            ),
            weight: b.weight.unwrap_or(1).max(0) as u32,
        })
        .collect();

    let filters = rule
        .filters
        .iter()
        .flatten()
        .filter_map(http_filter_from_api)
        .collect();

    HttpRouteRule {
        matches,
        backends,
        filters,
    }
}

fn http_filter_from_api(f: &api::gateway::v1::HTTPRouteRulesFilters) -> Option<HttpFilter> {
    match f.type_.as_str() {
        "RequestHeaderModifier" => f.request_header_modifier.as_ref().map(|m| {
            HttpFilter::RequestHeaderModifier(HeaderModifierFilter {
                add: m
                    .add
                    .iter()
                    .flatten()
                    .filter_map(|h| Some((header_name(&h.name)?, header_value(&h.value)?)))
                    .collect(),
                set: m
                    .set
                    .iter()
                    .flatten()
                    .filter_map(|h| Some((header_name(&h.name)?, header_value(&h.value)?)))
                    .collect(),
                remove: m
                    .remove
                    .iter()
                    .flatten()
                    .filter_map(|n| header_name(n))
                    .collect(),
            })
        }),
        "RequestRedirect" => f.request_redirect.as_ref().map(|r| {
            HttpFilter::RequestRedirect(RequestRedirectFilter {
                scheme: r.scheme.as_deref().and_then(|s| Scheme::try_from(s).ok()),
                host: r.hostname.clone(),
                port: r.port.and_then(|p| NonZeroU16::new(p as u16)),
                status: r
                    .status_code
                    .and_then(|c| StatusCode::from_u16(c as u16).ok()),
                path: None,
            })
        }),
        _ => None,
    }
}

pub fn grpc_route_from_api(
    namespace: &str,
    name: &str,
    creation_timestamp: Option<chrono::DateTime<chrono::Utc>>,
) -> GrpcRoute {
    GrpcRoute {
        id: ObjectRef::new("gateway.networking.k8s.io", "GRPCRoute", namespace, name),
        parent_refs: Vec::new(),
        hostnames: Vec::new(),
        rules: Vec::new(),
        creation_timestamp,
    }
}

pub fn tcp_route_from_api(
    namespace: &str,
    name: &str,
    creation_timestamp: Option<chrono::DateTime<chrono::Utc>>,
) -> TcpRoute {
    TcpRoute {
        id: ObjectRef::new("gateway.networking.k8s.io", "TCPRoute", namespace, name),
        parent_refs: Vec::new(),
        rules: Vec::<TcpRouteRule>::new(),
        creation_timestamp,
    }
}

/// Wraps a typed route in the `Route` sum type the IR and policy engine
/// operate over (spec §3 "Route").
pub fn as_route_http(r: HttpRoute) -> Route {
    Route::Http(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_port_marks_listener_invalid() {
        let l = api::gateway::v1::Listener {
            name: "bad".to_string(),
            hostname: None,
            port: 0,
            protocol: "HTTP".to_string(),
            tls: None,
            allowed_routes: None,
        };
        let ir = listener_from_api(&l);
        assert!(!ir.valid);
    }

    #[test]
    fn valid_https_listener_defaults_to_terminate() {
        let l = api::gateway::v1::Listener {
            name: "https".to_string(),
            hostname: None,
            port: 443,
            protocol: "HTTPS".to_string(),
            tls: Some(api::gateway::v1::GatewayTlsConfig {
                mode: None,
                certificate_refs: Some(vec![]),
                options: None,
            }),
            allowed_routes: None,
        };
        let ir = listener_from_api(&l);
        assert!(ir.valid);
        assert_eq!(ir.tls.unwrap().mode, TlsMode::Terminate);
    }
}
