//! Bootstrap controller (spec §4.10): on leader gain, ensures a known
//! singleton Secret exists with cryptographically random, fixed-length
//! content. Runs with exponential backoff and unbounded retries.

use k8s_openapi::{api::core::v1::Secret, ByteString};
use kube::{
    api::{Patch, PatchParams},
    Api,
};
use rand::RngCore;
use std::{collections::BTreeMap, time::Duration};

const SECRET_CONTENT_LEN: usize = 32;
const SECRET_KEY: &str = "token";
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const FIELD_MANAGER: &str = "gwctl";

/// Reconciles `name` in `namespace` until it exists, retrying forever
/// with exponential backoff on failure. Intended to run only while this
/// process holds the write lease (spec §5 "leader-only runnables").
pub async fn run(api: Api<Secret>, name: &str, namespace: &str) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match reconcile_once(&api, name, namespace).await {
            Ok(()) => {
                tracing::debug!(%name, %namespace, "bootstrap secret present");
                return;
            }
            Err(error) => {
                tracing::warn!(%name, %namespace, %error, ?backoff, "bootstrap reconcile failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

async fn reconcile_once(api: &Api<Secret>, name: &str, namespace: &str) -> Result<(), kube::Error> {
    if api.get_opt(name).await?.is_some() {
        return Ok(());
    }

    let mut data = BTreeMap::new();
    data.insert(SECRET_KEY.to_string(), ByteString(random_bytes()));

    let secret = Secret {
        metadata: kube::api::ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    };

    api.patch(
        name,
        &PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            force: true,
            ..Default::default()
        },
        &Patch::Apply(secret),
    )
    .await?;
    Ok(())
}

fn random_bytes() -> Vec<u8> {
    let mut buf = vec![0u8; SECRET_CONTENT_LEN];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_are_the_fixed_length_and_vary() {
        let a = random_bytes();
        let b = random_bytes();
        assert_eq!(a.len(), SECRET_CONTENT_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = INITIAL_BACKOFF;
        for _ in 0..10 {
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
        assert_eq!(backoff, MAX_BACKOFF);
    }
}
