//! Leader election (spec §5: "leader-only runnables" — the status
//! writer, bootstrap controller, and JWKS fetcher run only while this
//! process holds the lease).

use anyhow::Result;
use k8s_openapi::api::{apps::v1::Deployment, coordination::v1 as coordv1};
use kube::{api::PatchParams, Api, Resource, ResourceExt};
use std::sync::Arc;
use tokio::{sync::watch, time};

const LEASE_DURATION: time::Duration = time::Duration::from_secs(30);
const LEASE_NAME: &str = "gwctl-write";
const RENEW_GRACE_PERIOD: time::Duration = time::Duration::from_secs(1);

/// Claims (or creates, on first run) the write lease, owned by the
/// controller Deployment so it's garbage-collected alongside it.
pub async fn init<T>(
    runtime: &kubert::Runtime<T>,
    namespace: &str,
    deployment_name: &str,
    identity: &str,
) -> Result<watch::Receiver<Arc<kubert::lease::Claim>>> {
    let deployments = Api::<Deployment>::namespaced(runtime.client(), namespace);
    let deployment = deployments.get(deployment_name).await?;

    let lease = coordv1::Lease {
        metadata: kube::api::ObjectMeta {
            name: Some(LEASE_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("0".to_string()),
            owner_references: Some(vec![deployment.controller_owner_ref(&()).unwrap()]),
            ..Default::default()
        },
        spec: None,
    };

    let leases = Api::<coordv1::Lease>::namespaced(runtime.client(), namespace);
    match leases
        .patch(
            LEASE_NAME,
            &PatchParams {
                field_manager: Some("gwctl".to_string()),
                ..Default::default()
            },
            &kube::api::Patch::Apply(lease),
        )
        .await
    {
        Ok(_) => tracing::info!(%namespace, "created write lease"),
        Err(kube::Error::Api(_)) => tracing::debug!("write lease already exists"),
        Err(error) => return Err(error.into()),
    }

    let params = kubert::lease::ClaimParams {
        lease_duration: LEASE_DURATION,
        renew_grace_period: RENEW_GRACE_PERIOD,
    };
    let (claims, _task) = kubert::lease::LeaseManager::init(leases, LEASE_NAME)
        .await?
        .spawn(identity, params)
        .await?;
    Ok(claims)
}
