//! Route IR: HTTP/TCP/TLS/GRPC variants, each a set of rules with match
//! predicates and weighted backends (spec §3).

use crate::{
    resource::ObjectRef,
    route_match::{DirectResponseFilter, GrpcRouteMatch, HeaderModifierFilter, HttpRouteMatch,
        RequestRedirectFilter, UrlRewriteFilter},
};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Http(HttpRoute),
    Grpc(GrpcRoute),
    Tcp(TcpRoute),
    Tls(TlsRoute),
}

impl Route {
    pub fn id(&self) -> &ObjectRef {
        match self {
            Route::Http(r) => &r.id,
            Route::Grpc(r) => &r.id,
            Route::Tcp(r) => &r.id,
            Route::Tls(r) => &r.id,
        }
    }

    pub fn parent_refs(&self) -> &[ParentRef] {
        match self {
            Route::Http(r) => &r.parent_refs,
            Route::Grpc(r) => &r.parent_refs,
            Route::Tcp(r) => &r.parent_refs,
            Route::Tls(r) => &r.parent_refs,
        }
    }

    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Route::Http(r) => r.creation_timestamp,
            Route::Grpc(r) => r.creation_timestamp,
            Route::Tcp(r) => r.creation_timestamp,
            Route::Tls(r) => r.creation_timestamp,
        }
    }
}

/// A reference from a Route to the Gateway (and optionally a specific
/// listener, via `section_name`) it attaches to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParentRef {
    pub gateway: ObjectRef,
    pub section_name: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRoute {
    pub id: ObjectRef,
    pub parent_refs: Vec<ParentRef>,
    pub hostnames: Vec<String>,
    pub rules: Vec<HttpRouteRule>,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRouteRule {
    pub matches: Vec<HttpRouteMatch>,
    pub backends: Vec<WeightedBackend>,
    pub filters: Vec<HttpFilter>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HttpFilter {
    RequestHeaderModifier(HeaderModifierFilter),
    ResponseHeaderModifier(HeaderModifierFilter),
    RequestRedirect(RequestRedirectFilter),
    UrlRewrite(UrlRewriteFilter),
    DirectResponse(DirectResponseFilter),
    ExtensionRef(ObjectRef),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrpcRoute {
    pub id: ObjectRef,
    pub parent_refs: Vec<ParentRef>,
    pub hostnames: Vec<String>,
    pub rules: Vec<GrpcRouteRule>,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrpcRouteRule {
    pub matches: Vec<GrpcRouteMatch>,
    pub backends: Vec<WeightedBackend>,
    pub filters: Vec<HttpFilter>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpRoute {
    pub id: ObjectRef,
    pub parent_refs: Vec<ParentRef>,
    pub rules: Vec<TcpRouteRule>,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpRouteRule {
    pub backends: Vec<WeightedBackend>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsRoute {
    pub id: ObjectRef,
    pub parent_refs: Vec<ParentRef>,
    pub hostnames: Vec<String>,
    pub rules: Vec<TcpRouteRule>,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// A backend destination with its relative weight within the owning rule.
/// Weight 0 means "never select, but keep the cluster" per Gateway API
/// semantics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightedBackend {
    pub backend: ObjectRef,
    pub weight: u32,
}
