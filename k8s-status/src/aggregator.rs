//! Drives the full C7 reconcile step for one object: merge the fresh,
//! self-computed ancestor entries into the live status, then write with
//! optimistic concurrency. Writes across objects are capped by a bounded
//! worker pool (spec §5: "the status aggregator has its own worker pool
//! (bounded, default ≈ 100) to parallelize writes across objects").

use crate::{
    merge::merge,
    report::ParentStatus,
    writer::{write_status, WriteError, WriteOutcome},
};
use kube::{core::Resource, Api};
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Debug, sync::Arc};
use tokio::sync::Semaphore;

const DEFAULT_CONCURRENCY: usize = 100;

pub struct Aggregator {
    controller_name: String,
    concurrency: Arc<Semaphore>,
}

impl Aggregator {
    pub fn new(controller_name: impl Into<String>) -> Self {
        Self {
            controller_name: controller_name.into(),
            concurrency: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
        }
    }

    pub fn with_concurrency(mut self, permits: usize) -> Self {
        self.concurrency = Arc::new(Semaphore::new(permits));
        self
    }

    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    /// Merges `existing`/`fresh_self` and writes the result onto `obj`
    /// via `apply_status`, honoring the worker-pool concurrency cap.
    /// `obj` must already carry the `resourceVersion` it was read at.
    pub async fn reconcile<K>(
        &self,
        api: &Api<K>,
        name: &str,
        mut obj: K,
        existing: &[ParentStatus],
        fresh_self: &[ParentStatus],
        apply_status: impl FnOnce(&mut K, Vec<ParentStatus>),
    ) -> Result<WriteOutcome, WriteError>
    where
        K: Resource + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
    {
        let _permit = self
            .concurrency
            .acquire()
            .await
            .expect("semaphore is never closed");

        let merged = merge(&self.controller_name, existing, fresh_self);
        apply_status(&mut obj, merged);
        write_status(api, name, &obj).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Exercises only the concurrency gate (the real `reconcile` needs a
    // live API server); this confirms the semaphore actually admits no
    // more than the configured number of permits at once.
    #[tokio::test]
    async fn concurrency_cap_limits_in_flight_work() {
        let gate = Arc::new(Semaphore::new(2));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let in_flight = in_flight.clone();
            let max_observed = max_observed.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_observed.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(max_observed.load(Ordering::SeqCst) <= 2);
    }
}
