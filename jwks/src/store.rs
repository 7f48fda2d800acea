//! Durable write-through persistence for fetched JWKS documents (spec
//! §4.8, §6): opaque ConfigMaps keyed by a deterministic name, so a
//! restarting fetcher can rehydrate its cache before the first fetch
//! completes (spec §8 scenario 4).

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{api::PostParams, Api};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("kube api error: {0}")]
    Kube(#[from] kube::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    pub hash: String,
    pub value: Vec<u8>,
}

#[async_trait]
pub trait JwksStore: Send + Sync {
    async fn load_all(&self) -> Result<Vec<(String, StoredEntry)>, StoreError>;
    async fn save(&self, url: &str, entry: &StoredEntry) -> Result<(), StoreError>;
    async fn delete(&self, url: &str) -> Result<(), StoreError>;
}

/// Deterministic ConfigMap name for a source URL, so restarts find the
/// same object rather than accumulating orphans.
pub fn configmap_name(url: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(url.as_bytes());
    format!("jwks-cache-{:x}", digest)
}

pub struct ConfigMapStore {
    api: Api<ConfigMap>,
}

impl ConfigMapStore {
    pub fn new(api: Api<ConfigMap>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl JwksStore for ConfigMapStore {
    async fn load_all(&self) -> Result<Vec<(String, StoredEntry)>, StoreError> {
        let list = self.api.list(&Default::default()).await?;
        let mut out = Vec::new();
        for cm in list.items {
            let data = match cm.data {
                Some(d) => d,
                None => continue,
            };
            let (Some(url), Some(hash), Some(value)) =
                (data.get("url"), data.get("hash"), data.get("value"))
            else {
                continue;
            };
            out.push((
                url.clone(),
                StoredEntry {
                    hash: hash.clone(),
                    value: value.as_bytes().to_vec(),
                },
            ));
        }
        Ok(out)
    }

    async fn save(&self, url: &str, entry: &StoredEntry) -> Result<(), StoreError> {
        let name = configmap_name(url);
        let mut data = BTreeMap::new();
        data.insert("url".to_string(), url.to_string());
        data.insert("hash".to_string(), entry.hash.clone());
        data.insert(
            "value".to_string(),
            String::from_utf8_lossy(&entry.value).to_string(),
        );
        let cm = ConfigMap {
            metadata: kube::api::ObjectMeta {
                name: Some(name.clone()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        };
        match self.api.get(&name).await {
            Ok(_) => {
                self.api
                    .replace(&name, &PostParams::default(), &cm)
                    .await?;
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {
                self.api.create(&PostParams::default(), &cm).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        let name = configmap_name(url);
        match self.api.delete(&name, &Default::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store used by tests and by the `MemoryStore`-backed
/// rehydration test in `scheduler.rs`.
#[derive(Default)]
pub struct MemoryStore {
    entries: parking_lot::RwLock<std::collections::HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, url: impl Into<String>, entry: StoredEntry) {
        self.entries.write().insert(url.into(), entry);
    }
}

#[async_trait]
impl JwksStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<(String, StoredEntry)>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn save(&self, url: &str, entry: &StoredEntry) -> Result<(), StoreError> {
        self.entries.write().insert(url.to_string(), entry.clone());
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        self.entries.write().remove(url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryStore::new();
        let entry = StoredEntry {
            hash: "abc".into(),
            value: b"{}".to_vec(),
        };
        store.save("https://issuer.example/jwks.json", &entry).await.unwrap();
        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].1, entry);

        store.delete("https://issuer.example/jwks.json").await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }
}
