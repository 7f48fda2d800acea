//! Optimistic-concurrency status writes (spec §4.7 step 3): write with
//! the `resourceVersion` the object was read at; on conflict re-enqueue
//! rather than retry inline, on not-found drop the write silently.

use kube::{api::PostParams, core::Resource, Api};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("kube api error: {0}")]
    Kube(#[from] kube::Error),
    #[error("failed to encode status: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The status subresource was updated.
    Written,
    /// The object's `resourceVersion` had moved; the caller should
    /// re-enqueue a reconcile rather than retry with stale data.
    Conflict,
    /// The object no longer exists.
    NotFound,
}

/// Writes `obj`'s current in-memory status (including the
/// `resourceVersion` it was read at) to the cluster. `obj` must already
/// have the merged status set by the caller.
pub async fn write_status<K>(api: &Api<K>, name: &str, obj: &K) -> Result<WriteOutcome, WriteError>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
{
    let body = serde_json::to_vec(obj)?;
    match api.replace_status(name, &PostParams::default(), body).await {
        Ok(_) => Ok(WriteOutcome::Written),
        Err(kube::Error::Api(e)) if e.code == 409 => Ok(WriteOutcome::Conflict),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(WriteOutcome::NotFound),
        Err(error) => Err(error.into()),
    }
}
