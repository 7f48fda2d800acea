//! Match predicates shared by the HTTP and gRPC route kinds, and the
//! precedence rule used to order them within a translated virtual host
//! (spec §4.5: "exact > prefix > regex; longer prefix before shorter; more
//! header/query constraints before fewer; stable name order as final
//! tie-break").

use anyhow::Result;
pub use http::{
    header::{HeaderName, HeaderValue},
    uri::Scheme,
    Method, StatusCode,
};
use regex::Regex;
use std::{borrow::Cow, num::NonZeroU16};

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct GroupKindName {
    pub group: Cow<'static, str>,
    pub kind: Cow<'static, str>,
    pub name: Cow<'static, str>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct GroupKindNamespaceName {
    pub group: Cow<'static, str>,
    pub kind: Cow<'static, str>,
    pub namespace: Cow<'static, str>,
    pub name: Cow<'static, str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostMatch {
    Exact(String),
    Suffix { reverse_labels: Vec<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderModifierFilter {
    pub add: Vec<(HeaderName, HeaderValue)>,
    pub set: Vec<(HeaderName, HeaderValue)>,
    pub remove: Vec<HeaderName>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestRedirectFilter {
    pub scheme: Option<Scheme>,
    pub host: Option<String>,
    pub path: Option<PathModifier>,
    pub port: Option<NonZeroU16>,
    pub status: Option<StatusCode>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlRewriteFilter {
    pub host: Option<String>,
    pub path: Option<PathModifier>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectResponseFilter {
    pub status: StatusCode,
    pub body: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathModifier {
    Full(String),
    Prefix(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ratio {
    pub numerator: u32,
    pub denominator: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRouteMatch {
    pub path: Option<PathMatch>,
    pub headers: Vec<HeaderMatch>,
    pub query_params: Vec<QueryParamMatch>,
    pub method: Option<Method>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrpcRouteMatch {
    pub service: Option<String>,
    pub method: Option<String>,
    pub headers: Vec<HeaderMatch>,
}

#[derive(Clone, Debug)]
pub enum PathMatch {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

#[derive(Clone, Debug)]
pub enum HeaderMatch {
    Exact(HeaderName, HeaderValue),
    Regex(HeaderName, Regex),
}

#[derive(Clone, Debug)]
pub enum QueryParamMatch {
    Exact(String, String),
    Regex(String, Regex),
}

/// A match's position in the stable, deterministic ordering a virtual
/// host's routes are emitted in. Lower sorts first. Computed once per
/// match during translation and used as a sort key alongside the route's
/// declared weight when `weightedRoutePrecedence` is enabled (spec §4.5).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchPrecedence {
    /// 0 = exact path, 1 = prefix, 2 = regex/none. Lower is more specific.
    path_kind: u8,
    /// For prefix matches, the negated length so that longer prefixes sort
    /// before shorter ones once `path_kind` is tied.
    neg_prefix_len: i64,
    /// Negated count of header/query constraints so "more constraints"
    /// sorts before "fewer".
    neg_constraint_count: i64,
    /// Final deterministic tie-break.
    name: String,
}

impl HttpRouteMatch {
    /// Computes this match's precedence key. `name` must be a stable,
    /// unique identifier for the match's owning rule (e.g.
    /// `{route-ref}/{rule-index}/{match-index}`) and is only consulted
    /// once every other field ties.
    pub fn precedence(&self, name: impl Into<String>) -> MatchPrecedence {
        let (path_kind, neg_prefix_len) = match &self.path {
            Some(PathMatch::Exact(_)) => (0u8, 0i64),
            Some(PathMatch::Prefix(p)) => (1u8, -(p.len() as i64)),
            Some(PathMatch::Regex(_)) | None => (2u8, 0),
        };
        let constraints = self.headers.len() + self.query_params.len();
        MatchPrecedence {
            path_kind,
            neg_prefix_len,
            neg_constraint_count: -(constraints as i64),
            name: name.into(),
        }
    }
}

// === impl GroupKindName ===

impl Ord for GroupKindName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name).then(
            self.group
                .cmp(&other.group)
                .then(self.kind.cmp(&other.kind)),
        )
    }
}

impl PartialOrd for GroupKindName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl GroupKindName {
    pub fn eq_ignore_ascii_case(&self, other: &Self) -> bool {
        self.group.eq_ignore_ascii_case(&other.group)
            && self.kind.eq_ignore_ascii_case(&other.kind)
            && self.name.eq_ignore_ascii_case(&other.name)
    }

    pub fn namespaced(self, namespace: String) -> GroupKindNamespaceName {
        GroupKindNamespaceName {
            group: self.group,
            kind: self.kind,
            namespace: namespace.into(),
            name: self.name,
        }
    }
}

// === impl HttpRouteMatch ===

impl Default for HttpRouteMatch {
    fn default() -> Self {
        Self {
            method: None,
            headers: Default::default(),
            query_params: Default::default(),
            path: Some(PathMatch::Prefix("/".to_string())),
        }
    }
}

// === impl PathMatch ===

impl PartialEq for PathMatch {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(l0), Self::Exact(r0)) => l0 == r0,
            (Self::Prefix(l0), Self::Prefix(r0)) => l0 == r0,
            (Self::Regex(l0), Self::Regex(r0)) => l0.as_str() == r0.as_str(),
            _ => false,
        }
    }
}

impl Eq for PathMatch {}

impl PathMatch {
    pub fn regex(s: &str) -> Result<Self> {
        Ok(Self::Regex(Regex::new(s)?))
    }
}

// === impl HeaderMatch ===

impl PartialEq for HeaderMatch {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(n0, v0), Self::Exact(n1, v1)) => n0 == n1 && v0 == v1,
            (Self::Regex(n0, r0), Self::Regex(n1, r1)) => n0 == n1 && r0.as_str() == r1.as_str(),
            _ => false,
        }
    }
}

impl Eq for HeaderMatch {}

// === impl QueryParamMatch ===

impl PartialEq for QueryParamMatch {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(n0, v0), Self::Exact(n1, v1)) => n0 == n1 && v0 == v1,
            (Self::Regex(n0, r0), Self::Regex(n1, r1)) => n0 == n1 && r0.as_str() == r1.as_str(),
            _ => false,
        }
    }
}

impl Eq for QueryParamMatch {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_beats_prefix_beats_regex() {
        let exact = HttpRouteMatch {
            path: Some(PathMatch::Exact("/api".into())),
            ..Default::default()
        };
        let prefix = HttpRouteMatch {
            path: Some(PathMatch::Prefix("/api".into())),
            ..Default::default()
        };
        let regex = HttpRouteMatch {
            path: Some(PathMatch::regex("/api.*").unwrap()),
            ..Default::default()
        };
        assert!(exact.precedence("a") < prefix.precedence("b"));
        assert!(prefix.precedence("a") < regex.precedence("b"));
    }

    #[test]
    fn longer_prefix_sorts_first() {
        let short = HttpRouteMatch {
            path: Some(PathMatch::Prefix("/api".into())),
            ..Default::default()
        };
        let long = HttpRouteMatch {
            path: Some(PathMatch::Prefix("/api/v2".into())),
            ..Default::default()
        };
        assert!(long.precedence("a") < short.precedence("b"));
    }

    #[test]
    fn more_constraints_sort_first_when_path_ties() {
        let bare = HttpRouteMatch {
            path: Some(PathMatch::Prefix("/api".into())),
            ..Default::default()
        };
        let with_header = HttpRouteMatch {
            path: Some(PathMatch::Prefix("/api".into())),
            headers: vec![HeaderMatch::Exact(
                HeaderName::from_static("x-env"),
                HeaderValue::from_static("canary"),
            )],
            ..Default::default()
        };
        assert!(with_header.precedence("a") < bare.precedence("b"));
    }

    #[test]
    fn name_is_final_tiebreak() {
        let a = HttpRouteMatch::default();
        let b = HttpRouteMatch::default();
        assert!(a.precedence("a") < b.precedence("b"));
    }
}
