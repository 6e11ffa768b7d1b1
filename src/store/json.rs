use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{
    delete_in, insert_in, upsert_in, CollectionKind, CollectionStore, Placement, Upsert, SETTINGS,
};
use crate::error::StoreResult;
use crate::seed;

/// One pretty-printed `<name>.json` file per collection under a data directory.
pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes every read-modify-write cycle.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    async fn read_or_seed(&self, name: &str, seed: impl FnOnce() -> Value) -> StoreResult<Value> {
        let path = self.path(name);
        if !tokio::fs::try_exists(&path).await? {
            let value = seed();
            debug!("Seeding {}", path.display());
            self.write(name, &value).await?;
            return Ok(value);
        }
        let raw = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn read_list(&self, kind: CollectionKind) -> StoreResult<Vec<Value>> {
        let value = self
            .read_or_seed(kind.as_str(), || Value::Array(seed::collection(kind)))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn write(&self, name: &str, value: &Value) -> StoreResult<()> {
        let body = serde_json::to_vec_pretty(value)?;
        let dir = self.dir.clone();
        let target = self.path(name);
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &body)).await??;
        Ok(())
    }
}

fn write_atomically(dir: &Path, target: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(body)?;
    file.as_file().sync_all()?;
    file.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl CollectionStore for JsonFileStore {
    async fn install(&self) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        for kind in CollectionKind::ALL {
            self.read_list(kind).await?;
        }
        self.read_or_seed(SETTINGS, seed::settings).await?;
        info!("JSON store ready in {}", self.dir.display());
        Ok(())
    }

    async fn load(&self, kind: CollectionKind) -> StoreResult<Vec<Value>> {
        let _guard = self.lock.lock().await;
        self.read_list(kind).await
    }

    async fn replace(&self, kind: CollectionKind, records: Vec<Value>) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        self.write(kind.as_str(), &Value::Array(records)).await
    }

    async fn upsert(&self, kind: CollectionKind, record: Value) -> StoreResult<Upsert> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_list(kind).await?;
        let outcome = upsert_in(&mut records, record)?;
        self.write(kind.as_str(), &Value::Array(records)).await?;
        Ok(outcome)
    }

    async fn insert(
        &self,
        kind: CollectionKind,
        record: Value,
        placement: Placement,
    ) -> StoreResult<Value> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_list(kind).await?;
        let stored = insert_in(&mut records, record, placement)?;
        self.write(kind.as_str(), &Value::Array(records)).await?;
        Ok(stored)
    }

    async fn delete(&self, kind: CollectionKind, id: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_list(kind).await?;
        if !delete_in(&mut records, id) {
            return Ok(false);
        }
        self.write(kind.as_str(), &Value::Array(records)).await?;
        Ok(true)
    }

    async fn load_settings(&self) -> StoreResult<Option<Value>> {
        let _guard = self.lock.lock().await;
        let value = self.read_or_seed(SETTINGS, seed::settings).await?;
        // An empty object or array means nothing has been configured yet.
        let configured = match &value {
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => false,
        };
        Ok(configured.then_some(value))
    }

    async fn save_settings(&self, settings: Value) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        self.write(SETTINGS, &settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record_id;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn install_creates_seeded_files() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.install().await.unwrap();

        for name in ["products", "articles", "gallery", "reviews", "inquiries", "settings"] {
            assert!(dir.path().join(format!("{name}.json")).exists(), "{name}");
        }
        let raw = std::fs::read_to_string(dir.path().join("gallery.json")).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&raw).unwrap(), json!([]));
    }

    #[tokio::test]
    async fn writes_survive_reopening() {
        let dir = tempdir().unwrap();
        {
            let store = JsonFileStore::new(dir.path());
            store.install().await.unwrap();
            store
                .upsert(
                    CollectionKind::Products,
                    json!({ "id": "9", "name": { "ar": "فحم", "en": "Charcoal" } }),
                )
                .await
                .unwrap();
            assert!(store.delete(CollectionKind::Products, "1").await.unwrap());
        }

        let reopened = JsonFileStore::new(dir.path());
        let ids: Vec<String> = reopened
            .load(CollectionKind::Products)
            .await
            .unwrap()
            .iter()
            .filter_map(|r| record_id(r).map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["2".to_string(), "9".to_string()]);
    }

    #[tokio::test]
    async fn settings_round_trip_keeps_every_field() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.install().await.unwrap();

        let mut settings = seed::settings();
        settings["heroSub"]["en"] = json!("Changed");
        store.save_settings(settings.clone()).await.unwrap();

        assert_eq!(store.load_settings().await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn empty_settings_file_reads_as_unconfigured() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "[]").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert_eq!(store.load_settings().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_do_not_lose_records() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()));
        store.install().await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .upsert(CollectionKind::Products, json!({ "id": format!("c{i}") }))
                    .await
                    .map(|_| ())
            }));
        }
        for _ in 0..10 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .insert(CollectionKind::Products, json!({ "category": "Citrus" }), Placement::Back)
                    .await
                    .map(|_| ())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let reopened = JsonFileStore::new(dir.path());
        let ids: Vec<String> = reopened
            .load(CollectionKind::Products)
            .await
            .unwrap()
            .iter()
            .filter_map(|r| record_id(r).map(str::to_string))
            .collect();
        assert_eq!(ids.len(), 2 + 20 + 10);
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        for i in 0..20 {
            assert!(ids.contains(&format!("c{i}")), "c{i} missing");
        }
    }
}
