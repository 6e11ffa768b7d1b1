use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{delete_in, insert_in, upsert_in, CollectionKind, CollectionStore, Placement, Upsert};
use crate::error::StoreResult;
use crate::seed;

#[derive(Default)]
struct Tables {
    collections: HashMap<CollectionKind, Vec<Value>>,
    settings: Option<Value>,
}

/// Process-local store; contents vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn install(&self) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for kind in CollectionKind::ALL {
            tables
                .collections
                .entry(kind)
                .or_insert_with(|| seed::collection(kind));
        }
        if tables.settings.is_none() {
            tables.settings = Some(seed::settings());
        }
        debug!("Memory store seeded");
        Ok(())
    }

    async fn load(&self, kind: CollectionKind) -> StoreResult<Vec<Value>> {
        let tables = self.tables.read().await;
        Ok(tables.collections.get(&kind).cloned().unwrap_or_default())
    }

    async fn replace(&self, kind: CollectionKind, records: Vec<Value>) -> StoreResult<()> {
        self.tables.write().await.collections.insert(kind, records);
        Ok(())
    }

    async fn upsert(&self, kind: CollectionKind, record: Value) -> StoreResult<Upsert> {
        let mut tables = self.tables.write().await;
        upsert_in(tables.collections.entry(kind).or_default(), record)
    }

    async fn insert(
        &self,
        kind: CollectionKind,
        record: Value,
        placement: Placement,
    ) -> StoreResult<Value> {
        let mut tables = self.tables.write().await;
        insert_in(tables.collections.entry(kind).or_default(), record, placement)
    }

    async fn delete(&self, kind: CollectionKind, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .collections
            .get_mut(&kind)
            .map_or(false, |records| delete_in(records, id)))
    }

    async fn load_settings(&self) -> StoreResult<Option<Value>> {
        Ok(self.tables.read().await.settings.clone())
    }

    async fn save_settings(&self, settings: Value) -> StoreResult<()> {
        self.tables.write().await.settings = Some(settings);
        Ok(())
    }
}
