//! The min-heap fetch scheduler (spec §4.8): one source per URL+TTL,
//! a single worker picks the earliest-due source, fetches it, dedups by
//! content hash, persists on change, and fans the new hash out to
//! subscribers. Failures back off at `5s * (attempt + 1)` for five
//! attempts before the source falls back to its regular TTL cadence.

use crate::{
    fetcher::JwksFetcher,
    store::{JwksStore, StoredEntry},
};
use sha2::{Digest, Sha256};
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use tokio::sync::{watch, Notify};

const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_UNIT: Duration = Duration::from_secs(5);

fn content_hash(body: &[u8]) -> String {
    format!("{:x}", Sha256::digest(body))
}

#[derive(Clone, Debug)]
struct Source {
    url: String,
    ttl: Duration,
}

struct PendingFetch {
    due: tokio::time::Instant,
    source: Source,
    attempt: u32,
}

impl PartialEq for PendingFetch {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due
    }
}
impl Eq for PendingFetch {}

// `BinaryHeap` is a max-heap; reverse the comparison so the earliest
// `due` instant is always the one popped.
impl Ord for PendingFetch {
    fn cmp(&self, other: &Self) -> Ordering {
        other.due.cmp(&self.due)
    }
}
impl PartialOrd for PendingFetch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Heap {
    items: BinaryHeap<PendingFetch>,
}

/// Tracks one fetched source's last-known content hash, independent of
/// whether that hash has changed since the previous fetch.
#[derive(Clone)]
struct CacheEntry {
    hash: String,
    value: Vec<u8>,
}

/// Schedules fetches for a set of JWKS sources, dedups by content hash,
/// persists changes, and republishes the current hash to subscribers.
///
/// A single `tokio` task drives the heap; all public methods only touch
/// locked shared state and a `Notify` to wake that task, matching the
/// single-threaded-by-design worker the spec calls for.
pub struct JwksCache<F, S> {
    fetcher: Arc<F>,
    store: Arc<S>,
    heap: parking_lot::Mutex<Heap>,
    cache: parking_lot::RwLock<HashMap<String, CacheEntry>>,
    tombstoned: parking_lot::RwLock<HashSet<String>>,
    subscribers: parking_lot::RwLock<HashMap<String, watch::Sender<Option<String>>>>,
    wake: Notify,
}

impl<F, S> JwksCache<F, S>
where
    F: JwksFetcher + 'static,
    S: JwksStore + 'static,
{
    pub fn new(fetcher: F, store: S) -> Arc<Self> {
        Arc::new(Self {
            fetcher: Arc::new(fetcher),
            store: Arc::new(store),
            heap: parking_lot::Mutex::new(Heap {
                items: BinaryHeap::new(),
            }),
            cache: parking_lot::RwLock::new(HashMap::new()),
            tombstoned: parking_lot::RwLock::new(HashSet::new()),
            subscribers: parking_lot::RwLock::new(HashMap::new()),
            wake: Notify::new(),
        })
    }

    /// Loads persisted entries into the in-memory cache so subscribers
    /// get a populated hash immediately after a restart, before the
    /// first live fetch completes (spec §8 scenario 4).
    pub async fn rehydrate(&self) -> Result<(), crate::store::StoreError> {
        let entries = self.store.load_all().await?;
        let mut cache = self.cache.write();
        for (url, entry) in entries {
            cache.insert(
                url,
                CacheEntry {
                    hash: entry.hash,
                    value: entry.value,
                },
            );
        }
        Ok(())
    }

    /// Registers a source for scheduling, or refreshes its TTL if it's
    /// already scheduled. Due immediately on first registration.
    pub fn add_source(&self, url: impl Into<String>, ttl: Duration) {
        let url = url.into();
        self.tombstoned.write().remove(&url);
        let mut heap = self.heap.lock();
        heap.items.push(PendingFetch {
            due: tokio::time::Instant::now(),
            source: Source { url, ttl },
            attempt: 0,
        });
        self.wake.notify_one();
    }

    /// Removes a source. In-flight fetches for it are discarded on
    /// completion rather than cancelled out from under the worker.
    pub fn remove_source(&self, url: &str) {
        self.tombstoned.write().insert(url.to_string());
        self.subscribers.write().remove(url);
    }

    /// Current content hash for a URL, or `None` if nothing has been
    /// fetched (or persisted) yet.
    pub fn current_hash(&self, url: &str) -> Option<String> {
        self.cache.read().get(url).map(|e| e.hash.clone())
    }

    pub fn current_value(&self, url: &str) -> Option<Vec<u8>> {
        self.cache.read().get(url).map(|e| e.value.clone())
    }

    /// Subscribes to hash changes for `url`. The returned receiver
    /// coalesces updates: a lagging subscriber only ever observes the
    /// latest hash, never a backlog (spec §9 Subscriptions).
    pub fn subscribe(&self, url: &str) -> watch::Receiver<Option<String>> {
        let mut subs = self.subscribers.write();
        if let Some(tx) = subs.get(url) {
            return tx.subscribe();
        }
        let initial = self.current_hash(url);
        let (tx, rx) = watch::channel(initial);
        subs.insert(url.to_string(), tx);
        rx
    }

    /// Runs the scheduler loop until the returned future is dropped.
    /// Intended to be spawned once as a single `tokio` task.
    pub async fn run(self: Arc<Self>) {
        loop {
            let next_due = {
                let heap = self.heap.lock();
                heap.items.peek().map(|p| p.due)
            };

            match next_due {
                None => self.wake.notified().await,
                Some(due) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(due) => {}
                        _ = self.wake.notified() => continue,
                    }
                }
            }

            let pending = {
                let mut heap = self.heap.lock();
                match heap.items.peek() {
                    Some(p) if p.due <= tokio::time::Instant::now() => heap.items.pop(),
                    _ => None,
                }
            };
            let Some(pending) = pending else { continue };

            if self.tombstoned.read().contains(&pending.source.url) {
                continue;
            }

            self.fire(pending).await;
        }
    }

    async fn fire(&self, pending: PendingFetch) {
        let PendingFetch {
            source, attempt, ..
        } = pending;

        match self.fetcher.fetch(&source.url).await {
            Ok(body) => {
                let hash = content_hash(&body);
                let changed = self
                    .cache
                    .read()
                    .get(&source.url)
                    .map(|e| e.hash != hash)
                    .unwrap_or(true);

                if changed {
                    if self.tombstoned.read().contains(&source.url) {
                        return;
                    }
                    let entry = StoredEntry {
                        hash: hash.clone(),
                        value: body.clone(),
                    };
                    if let Err(error) = self.store.save(&source.url, &entry).await {
                        tracing::warn!(url = %source.url, %error, "failed to persist jwks entry");
                    }
                    self.cache.write().insert(
                        source.url.clone(),
                        CacheEntry {
                            hash: hash.clone(),
                            value: body,
                        },
                    );
                    if let Some(tx) = self.subscribers.read().get(&source.url) {
                        tx.send_replace(Some(hash));
                    }
                }

                self.reschedule_after_success(source);
            }
            Err(error) => {
                tracing::warn!(url = %source.url, %error, attempt, "jwks fetch failed");
                self.reschedule_after_failure(source, attempt);
            }
        }
    }

    fn reschedule_after_success(&self, source: Source) {
        let due = tokio::time::Instant::now() + source.ttl;
        self.heap.lock().items.push(PendingFetch {
            due,
            source,
            attempt: 0,
        });
    }

    fn reschedule_after_failure(&self, source: Source, attempt: u32) {
        let next_attempt = attempt + 1;
        let due = if next_attempt < MAX_ATTEMPTS {
            tokio::time::Instant::now() + BACKOFF_UNIT * next_attempt
        } else {
            tokio::time::Instant::now() + source.ttl
        };
        let attempt_for_next = if next_attempt < MAX_ATTEMPTS {
            next_attempt
        } else {
            0
        };
        self.heap.lock().items.push(PendingFetch {
            due,
            source,
            attempt: attempt_for_next,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fetcher::test_support::ScriptedFetcher, fetcher::FetchError, store::MemoryStore};

    fn cache_with(
        responses: Vec<Result<Vec<u8>, FetchError>>,
    ) -> Arc<JwksCache<ScriptedFetcher, MemoryStore>> {
        JwksCache::new(ScriptedFetcher::new(responses), MemoryStore::new())
    }

    #[tokio::test(start_paused = true)]
    async fn successful_fetch_persists_and_notifies_subscribers() {
        let cache = cache_with(vec![Ok(b"{\"keys\":[]}".to_vec())]);
        let mut rx = cache.subscribe("https://issuer.example/jwks.json");
        cache.add_source("https://issuer.example/jwks.json", Duration::from_secs(300));

        let handle = tokio::spawn(cache.clone().run());
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_some());
        assert_eq!(
            cache.current_hash("https://issuer.example/jwks.json"),
            rx.borrow().clone()
        );
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_content_does_not_renotify() {
        let body = b"{\"keys\":[]}".to_vec();
        let cache = cache_with(vec![Ok(body.clone()), Ok(body)]);
        let url = "https://issuer.example/jwks.json";
        cache.add_source(url, Duration::from_millis(10));
        let mut rx = cache.subscribe(url);

        let handle = tokio::spawn(cache.clone().run());
        rx.changed().await.unwrap();
        let first = rx.borrow().clone();

        tokio::time::sleep(Duration::from_millis(50)).await;
        // A second identical fetch must not mark the receiver changed again.
        assert!(rx.has_changed().is_ok() && !rx.has_changed().unwrap());
        assert_eq!(rx.borrow().clone(), first);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_backs_off_then_resumes_ttl_cadence() {
        let url = "https://issuer.example/jwks.json";
        let responses = vec![
            Err(FetchError::Status(503)),
            Err(FetchError::Status(503)),
            Ok(b"{}".to_vec()),
        ];
        let cache = cache_with(responses);
        cache.add_source(url, Duration::from_secs(300));
        let mut rx = cache.subscribe(url);

        let handle = tokio::spawn(cache.clone().run());

        // First attempt fires immediately and fails; backoff schedules
        // the retry at 5s * (0 + 1) = 5s.
        tokio::time::sleep(Duration::from_millis(1)).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        // Second attempt fails too; next backoff is 5s * (1 + 1) = 10s.
        tokio::time::advance(Duration::from_secs(11)).await;

        rx.changed().await.unwrap();
        assert!(rx.borrow().is_some());
        handle.abort();
    }

    #[tokio::test]
    async fn rehydrate_populates_cache_before_any_fetch() {
        let store = MemoryStore::new();
        store.seed(
            "https://issuer.example/jwks.json",
            StoredEntry {
                hash: "seeded".into(),
                value: b"{}".to_vec(),
            },
        );
        let cache = JwksCache::new(ScriptedFetcher::new(vec![]), store);
        cache.rehydrate().await.unwrap();
        assert_eq!(
            cache.current_hash("https://issuer.example/jwks.json"),
            Some("seeded".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tombstoned_source_is_skipped_on_fire() {
        let cache = cache_with(vec![Ok(b"{}".to_vec())]);
        let url = "https://issuer.example/jwks.json";
        cache.add_source(url, Duration::from_secs(300));
        cache.remove_source(url);

        let handle = tokio::spawn(cache.clone().run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.current_hash(url).is_none());
        handle.abort();
    }
}
