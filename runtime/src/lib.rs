#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Process wiring (C10 bootstrap / C11 validation / CLI, spec §4.10-
//! §4.11, §6): parses `Args`, builds the `kubert::Runtime`, spins up the
//! typed-collections index fed from live watches, and runs the
//! leader-only runnables (bootstrap controller, admission webhook) only
//! while this process holds the write lease.

mod admin;
mod admission;
mod args;
mod bootstrap;
mod lease;
mod validation;

pub use args::Args;
pub use validation::{RejectionReason, Validator};

use anyhow::Result;
use gwctl_index::Index;
use gwctl_k8s_api::{gateway, Api, Client, Secret, WatchEvent};
use kube::runtime::watcher;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing::{info, info_span, Instrument};

impl Args {
    pub async fn parse_and_run() -> Result<()> {
        let args = <Args as clap::Parser>::parse();
        let runtime = args.runtime().await?;
        let settings = args.settings()?;

        let index = Index::new(settings);
        spawn_watches(&runtime, index.clone());

        let (ready_tx, ready_rx) = watch::channel(false);
        tokio::spawn(watch_readiness(index.clone(), ready_tx));
        tokio::spawn(admin::serve(([0, 0, 0, 0], 8081).into(), ready_rx));

        let client = runtime.client();
        let mode = index.settings.validation_mode;
        if args.admission_enabled() {
            info!("admission webhook enabled");
        }
        let runtime = runtime.spawn_server(move || admission::AdmissionService::new(mode));

        let claims = lease::init(
            &runtime,
            &args.controller_namespace,
            &args.controller_deployment_name,
            &args.leader_election_identity,
        )
        .await?;
        tokio::spawn(run_leader_only(
            claims,
            args.leader_election_identity.clone(),
            client,
            args.controller_namespace.clone(),
        ));

        runtime.run().await.map_err(|_| anyhow::anyhow!("aborted"))
    }
}

async fn watch_readiness(index: Index, ready_tx: watch::Sender<bool>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(250));
    loop {
        interval.tick().await;
        let synced = index.has_synced();
        if *ready_tx.borrow() != synced {
            let _ = ready_tx.send(synced);
        }
    }
}

/// Runs the bootstrap controller for as long as `claims` reports this
/// identity as the current leader (spec §5 "leader-only runnables").
async fn run_leader_only(
    mut claims: watch::Receiver<Arc<kubert::lease::Claim>>,
    identity: String,
    client: Client,
    namespace: String,
) {
    let secrets: Api<Secret> = Api::namespaced(client, &namespace);
    loop {
        let is_leader = claims.borrow().claimant == identity;
        if is_leader {
            bootstrap::run(secrets.clone(), "gwctl-bootstrap", &namespace).await;
        }
        if claims.changed().await.is_err() {
            return;
        }
    }
}

/// Wires the live `Gateway`/`HTTPRoute` watches into `index`'s typed
/// collections via `runtime.watch_all`, the same entrypoint the admin
/// server and the admission webhook come up through. Other kinds
/// (GRPCRoute, TCPRoute, TLSRoute, Backend, Secret, policy CRDs) follow
/// the identical shape and are deliberately out of scope for this pass.
fn spawn_watches<S>(runtime: &kubert::Runtime<S>, index: Index) {
    let gateways = runtime.watch_all::<gateway::v1::Gateway>(watcher::Config::default());
    let idx = index.clone();
    tokio::spawn(
        drive(gateways, move |event| {
            gwctl_index::watch_bridge::apply_event(
                event,
                &idx.gateways,
                None,
                "Gateway",
                |g: &gateway::v1::Gateway| {
                    gwctl_core::resource::ObjectRef::new(
                        "gateway.networking.k8s.io",
                        "Gateway",
                        g.metadata.namespace.as_deref().unwrap_or_default(),
                        g.metadata.name.as_deref().unwrap_or_default(),
                    )
                },
                |g: gateway::v1::Gateway| {
                    let ns = g.metadata.namespace.clone().unwrap_or_default();
                    let name = g.metadata.name.clone().unwrap_or_default();
                    Some(gwctl_index::ir::gateway_from_api(&ns, &name, &g.spec))
                },
            );
        })
        .instrument(info_span!("gateways")),
    );

    let routes = runtime.watch_all::<gateway::v1::HTTPRoute>(watcher::Config::default());
    let idx = index.clone();
    tokio::spawn(
        drive(routes, move |event| {
            gwctl_index::watch_bridge::apply_event(
                event,
                &idx.routes,
                None,
                "HTTPRoute",
                |r: &gateway::v1::HTTPRoute| {
                    gwctl_core::resource::ObjectRef::new(
                        "gateway.networking.k8s.io",
                        "HTTPRoute",
                        r.metadata.namespace.as_deref().unwrap_or_default(),
                        r.metadata.name.as_deref().unwrap_or_default(),
                    )
                },
                |r: gateway::v1::HTTPRoute| {
                    let ns = r.metadata.namespace.clone().unwrap_or_default();
                    let name = r.metadata.name.clone().unwrap_or_default();
                    let created = r.metadata.creation_timestamp.as_ref().map(|t| t.0);
                    let http =
                        gwctl_index::ir::http_route_from_api(&ns, &name, created, &r.spec);
                    Some(gwctl_index::ir::as_route_http(http))
                },
            );
        })
        .instrument(info_span!("http_routes")),
    );
}

async fn drive<K, F>(
    mut stream: impl tokio_stream::Stream<Item = watcher::Result<WatchEvent<K>>> + Unpin,
    mut handle: F,
) where
    F: FnMut(WatchEvent<K>),
{
    loop {
        match stream.next().await {
            Some(Ok(event)) => handle(event),
            Some(Err(error)) => {
                tracing::warn!(%error, "watch stream error, retrying");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
            None => return,
        }
    }
}
