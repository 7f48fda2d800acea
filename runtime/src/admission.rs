//! Admission webhook (spec §6, "Supplemented features"): applies the C11
//! target-kind checks to policy CRDs before they're persisted, so a
//! malformed `targetRef` is rejected up front instead of surfacing only
//! as a dropped policy at translation time.

use crate::validation::Validator;
use anyhow::{anyhow, bail, Result};
use bytes::{Buf, Bytes};
use gwctl_core::error::ValidationMode;
use gwctl_k8s_api::policy::{
    BackendConfigPolicySpec, HttpListenerPolicySpec, ListenerPolicySpec, LocalTargetRef,
    TargetSelector, TrafficPolicySpec,
};
use http_body_util::{BodyExt, Full};
use hyper::{body::Incoming, service::Service, Method, Request, Response, StatusCode};
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;
use std::{future::Future, pin::Pin, task};
use thiserror::Error;
use tracing::{debug, warn};

type Review = kube::core::admission::AdmissionReview<DynamicObject>;
type AdmissionRequest = kube::core::admission::AdmissionRequest<DynamicObject>;
type AdmissionResponse = kube::core::admission::AdmissionResponse;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Body(#[from] hyper::Error),
    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct AdmissionService {
    mode: ValidationMode,
}

impl AdmissionService {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }
}

impl Service<Request<Incoming>> for AdmissionService {
    type Response = Response<Full<Bytes>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> task::Poll<Result<(), Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Incoming>) -> Self::Future {
        if req.method() != Method::POST || req.uri().path() != "/" {
            return Box::pin(async {
                Ok(Response::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Full::new(Bytes::new()))
                    .expect("not found response must be valid"))
            });
        }

        let validator = Validator::new(self.mode);
        Box::pin(async move {
            let body = req.into_body().collect().await?.to_bytes();
            let review: Review = match serde_json::from_reader(body.reader()) {
                Ok(review) => review,
                Err(error) => {
                    warn!(%error, "failed to parse admission review body");
                    return json_response(AdmissionResponse::invalid(error).into_review());
                }
            };

            let response = review
                .try_into()
                .map_err(anyhow::Error::from)
                .and_then(|req| {
                    debug!(?req);
                    admit(req, &validator)
                })
                .unwrap_or_else(|error| {
                    warn!(%error, "denied");
                    AdmissionResponse::invalid(error)
                });

            json_response(response.into_review())
        })
    }
}

fn json_response(review: Review) -> Result<Response<Full<Bytes>>, Error> {
    let bytes = serde_json::to_vec(&review)?;
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(hyper::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .expect("admission review response must be valid"))
}

fn admit(req: AdmissionRequest, validator: &Validator) -> Result<AdmissionResponse> {
    let kind = req.kind.kind.clone();
    match kind.as_str() {
        "TrafficPolicy" => admit_refs::<TrafficPolicySpec>(req, validator, |s| {
            (s.target_refs.clone(), s.target_selectors.clone())
        }),
        "HttpListenerPolicy" => admit_refs::<HttpListenerPolicySpec>(req, validator, |s| {
            (s.target_refs.clone(), None)
        }),
        "ListenerPolicy" => admit_refs::<ListenerPolicySpec>(req, validator, |s| {
            (s.target_refs.clone(), s.target_selectors.clone())
        }),
        "BackendConfigPolicy" => admit_refs::<BackendConfigPolicySpec>(req, validator, |s| {
            (s.target_refs.clone(), None)
        }),
        _ => bail!("unsupported resource kind: {kind}"),
    }
}

fn admit_refs<T: DeserializeOwned>(
    req: AdmissionRequest,
    validator: &Validator,
    refs: impl FnOnce(&T) -> (Option<Vec<LocalTargetRef>>, Option<Vec<TargetSelector>>),
) -> Result<AdmissionResponse> {
    let response = AdmissionResponse::from(&req);
    let spec = parse_spec::<T>(req)?;
    let (target_refs, target_selectors) = refs(&spec);

    for target in target_refs.into_iter().flatten() {
        if let Err(reason) = validator.validate_target_kind(&target.kind) {
            return Ok(response.deny(reason));
        }
    }
    for selector in target_selectors.into_iter().flatten() {
        if let Err(reason) = validator.validate_target_kind(&selector.kind) {
            return Ok(response.deny(reason));
        }
    }

    Ok(response)
}

fn parse_spec<T: DeserializeOwned>(req: AdmissionRequest) -> Result<T> {
    let obj = req
        .object
        .ok_or_else(|| anyhow!("admission request missing 'object'"))?;
    let data = obj
        .data
        .get("spec")
        .cloned()
        .ok_or_else(|| anyhow!("admission request missing 'spec'"))?;
    Ok(serde_json::from_value(data)?)
}
