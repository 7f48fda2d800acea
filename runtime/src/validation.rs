//! Policy/route validation (spec §4.11): `standard` and `strict` modes.
//! Both modes always reject invalid path prefixes/regexes, header regex
//! compile failures, dangling `extensionRef`s, disallowed `targetRef`
//! kinds, and a retry policy targeting a Gateway without a
//! `sectionName`. `strict` additionally rejects malformed templates and
//! structural policy errors. A rejection is attached to the offending
//! policy and never blocks sibling policies.

use gwctl_core::{error::ValidationMode, policy::TargetRef};
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

const ALLOWED_TARGET_KINDS: &[&str] = &[
    "Gateway",
    "GatewayClass",
    "HTTPRoute",
    "GRPCRoute",
    "TCPRoute",
    "TLSRoute",
    "XListenerSet",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("path prefix must start with '/': {0:?}")]
    InvalidPathPrefix(String),
    #[error("path regex failed to compile: {0}")]
    InvalidPathRegex(String),
    #[error("header regex failed to compile: {0}")]
    InvalidHeaderRegex(String),
    #[error("extensionRef {0} does not name a known GatewayExtension")]
    UnknownExtensionRef(String),
    #[error("targetRef kind {0:?} is not allowed")]
    DisallowedTargetKind(String),
    #[error("retry policy targeting a Gateway must set sectionName")]
    RetryMissingSectionName,
    #[error("malformed template: {0}")]
    MalformedTemplate(String),
    #[error("structural policy error: {0}")]
    StructuralError(String),
}

pub struct Validator {
    mode: ValidationMode,
}

impl Validator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self.mode, ValidationMode::Strict)
    }

    pub fn validate_path_prefix(&self, prefix: &str) -> Result<(), RejectionReason> {
        if !prefix.starts_with('/') {
            return Err(RejectionReason::InvalidPathPrefix(prefix.to_string()));
        }
        Ok(())
    }

    pub fn validate_path_regex(&self, pattern: &str) -> Result<Regex, RejectionReason> {
        Regex::new(pattern).map_err(|e| RejectionReason::InvalidPathRegex(e.to_string()))
    }

    pub fn validate_header_regex(&self, pattern: &str) -> Result<Regex, RejectionReason> {
        Regex::new(pattern).map_err(|e| RejectionReason::InvalidHeaderRegex(e.to_string()))
    }

    pub fn validate_extension_ref(
        &self,
        name: &str,
        known_extensions: &HashSet<String>,
    ) -> Result<(), RejectionReason> {
        if known_extensions.contains(name) {
            Ok(())
        } else {
            Err(RejectionReason::UnknownExtensionRef(name.to_string()))
        }
    }

    pub fn validate_target_kind(&self, kind: &str) -> Result<(), RejectionReason> {
        if ALLOWED_TARGET_KINDS.contains(&kind) {
            Ok(())
        } else {
            Err(RejectionReason::DisallowedTargetKind(kind.to_string()))
        }
    }

    /// A retry policy's `targetRef` must carry `sectionName` when it
    /// targets a Gateway (there being no other way to scope a retry
    /// policy to one listener).
    pub fn validate_retry_target(&self, target: &TargetRef, has_retry_field: bool) -> Result<(), RejectionReason> {
        if has_retry_field && target.kind == "Gateway" && target.section_name.is_none() {
            return Err(RejectionReason::RetryMissingSectionName);
        }
        Ok(())
    }

    /// `strict`-only: rejects a request/response body or header template
    /// with unbalanced `{{ }}` placeholders. `standard` mode never calls
    /// this check (spec §4.11: "strict additionally rejects malformed
    /// body/header templates").
    pub fn validate_template(&self, template: &str) -> Result<(), RejectionReason> {
        if !self.is_strict() {
            return Ok(());
        }
        let opens = template.matches("{{").count();
        let closes = template.matches("}}").count();
        if opens != closes {
            return Err(RejectionReason::MalformedTemplate(template.to_string()));
        }
        Ok(())
    }

    /// `strict`-only: structural checks beyond the always-on set, e.g. a
    /// weight of zero on every backend in a rule.
    pub fn validate_backend_weights(&self, weights: &[u32]) -> Result<(), RejectionReason> {
        if !self.is_strict() {
            return Ok(());
        }
        if !weights.is_empty() && weights.iter().all(|w| *w == 0) {
            return Err(RejectionReason::StructuralError(
                "all backend weights are zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_ref(kind: &str, section_name: Option<&str>) -> TargetRef {
        TargetRef {
            group: "gateway.networking.k8s.io".to_string(),
            kind: kind.to_string(),
            name: "gw-1".to_string(),
            namespace: None,
            section_name: section_name.map(str::to_string),
        }
    }

    #[test]
    fn path_prefix_must_start_with_slash() {
        let v = Validator::new(ValidationMode::Standard);
        assert!(v.validate_path_prefix("/api").is_ok());
        assert!(v.validate_path_prefix("api").is_err());
    }

    #[test]
    fn invalid_regex_is_rejected_in_both_modes() {
        for mode in [ValidationMode::Standard, ValidationMode::Strict] {
            let v = Validator::new(mode);
            assert!(v.validate_path_regex("(unclosed").is_err());
            assert!(v.validate_header_regex("[a-").is_err());
        }
    }

    #[test]
    fn retry_without_section_name_on_gateway_is_rejected() {
        let v = Validator::new(ValidationMode::Standard);
        assert!(v
            .validate_retry_target(&target_ref("Gateway", None), true)
            .is_err());
        assert!(v
            .validate_retry_target(&target_ref("Gateway", Some("https")), true)
            .is_ok());
        assert!(v
            .validate_retry_target(&target_ref("HTTPRoute", None), true)
            .is_ok());
    }

    #[test]
    fn disallowed_target_kind_is_rejected() {
        let v = Validator::new(ValidationMode::Standard);
        assert!(v.validate_target_kind("Pod").is_err());
        assert!(v.validate_target_kind("Gateway").is_ok());
    }

    #[test]
    fn templates_only_validated_in_strict_mode() {
        let standard = Validator::new(ValidationMode::Standard);
        assert!(standard.validate_template("{{ missing close").is_ok());

        let strict = Validator::new(ValidationMode::Strict);
        assert!(strict.validate_template("{{ ok }}").is_ok());
        assert!(strict.validate_template("{{ missing close").is_err());
    }

    #[test]
    fn unknown_extension_ref_is_rejected() {
        let v = Validator::new(ValidationMode::Standard);
        let known: HashSet<String> = ["ext-a".to_string()].into_iter().collect();
        assert!(v.validate_extension_ref("ext-a", &known).is_ok());
        assert!(v.validate_extension_ref("ext-b", &known).is_err());
    }
}
