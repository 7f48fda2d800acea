//! Applies a `kube::runtime::watcher` event stream to a `Collection`
//! (spec §4.1 "Sourcing from watches", §5 "Relist and backoff"). The
//! runtime crate owns the `select!` loop across every watched kind; this
//! module only knows how to fold one event into one collection.

use crate::{collection::Collection, metrics::IndexMetrics};
use gwctl_k8s_api::WatchEvent;
use std::hash::Hash;

/// Feeds one `WatchEvent` into `collection`, converting the raw API
/// object with `convert` and keying it with `key_of`. `convert` returning
/// `None` drops the object from the collection just as if it had been
/// deleted — used for objects this control plane doesn't own (e.g. a
/// `Gateway` naming a foreign `gatewayClassName`).
pub fn apply_event<T, K, O>(
    event: WatchEvent<T>,
    collection: &Collection<K, O>,
    metrics: Option<&IndexMetrics>,
    kind: &'static str,
    key_of: impl Fn(&T) -> K,
    convert: impl Fn(T) -> Option<O>,
) where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    O: Clone + PartialEq + Send + Sync + 'static,
{
    match event {
        WatchEvent::Init => {
            if let Some(m) = metrics {
                m.record_reset(kind);
            }
        }
        WatchEvent::InitApply(obj) | WatchEvent::Apply(obj) => {
            let key = key_of(&obj);
            match convert(obj) {
                Some(value) => {
                    collection.apply(key, value);
                    if let Some(m) = metrics {
                        m.record_apply(kind);
                        m.set_size(kind, collection.list_keys().len());
                    }
                }
                None => collection.remove(&key),
            }
        }
        WatchEvent::Delete(obj) => {
            let key = key_of(&obj);
            collection.remove(&key);
            if let Some(m) = metrics {
                m.record_delete(kind);
                m.set_size(kind, collection.list_keys().len());
            }
        }
        WatchEvent::InitDone => {
            collection.mark_synced();
        }
    }
}
