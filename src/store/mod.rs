//! Collection storage.
//!
//! Every collection is a list of JSON objects keyed by a string `id`. Backends
//! expose both the wholesale replace the original clients rely on and
//! per-record upsert/insert/delete so single edits never rewrite siblings.

mod json;
mod memory;
mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::info;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use mongo::MongoStore;

use crate::config::{AppConfig, StoreBackend};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Products,
    Articles,
    Gallery,
    Reviews,
    Inquiries,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 5] = [
        CollectionKind::Products,
        CollectionKind::Articles,
        CollectionKind::Gallery,
        CollectionKind::Reviews,
        CollectionKind::Inquiries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Products => "products",
            CollectionKind::Articles => "articles",
            CollectionKind::Gallery => "gallery",
            CollectionKind::Reviews => "reviews",
            CollectionKind::Inquiries => "inquiries",
        }
    }
}

/// Storage name of the site settings singleton.
pub const SETTINGS: &str = "settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Front,
    Back,
}

#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Creates whatever the backend needs and seeds absent collections.
    async fn install(&self) -> StoreResult<()>;

    async fn load(&self, kind: CollectionKind) -> StoreResult<Vec<Value>>;

    /// Full-replace write.
    async fn replace(&self, kind: CollectionKind, records: Vec<Value>) -> StoreResult<()>;

    async fn upsert(&self, kind: CollectionKind, record: Value) -> StoreResult<Upsert>;

    /// Stores `record` under a fresh id and returns it as stored.
    async fn insert(
        &self,
        kind: CollectionKind,
        record: Value,
        placement: Placement,
    ) -> StoreResult<Value>;

    async fn delete(&self, kind: CollectionKind, id: &str) -> StoreResult<bool>;

    async fn load_settings(&self) -> StoreResult<Option<Value>>;

    async fn save_settings(&self, settings: Value) -> StoreResult<()>;

    async fn find(&self, kind: CollectionKind, id: &str) -> StoreResult<Option<Value>> {
        let records = self.load(kind).await?;
        Ok(records.into_iter().find(|r| record_id(r) == Some(id)))
    }
}

pub type SharedStore = Arc<dyn CollectionStore>;

pub async fn open(config: &AppConfig) -> StoreResult<SharedStore> {
    let store: SharedStore = match config.store_backend {
        StoreBackend::Json => Arc::new(JsonFileStore::new(&config.data_dir)),
        StoreBackend::Mongo => {
            Arc::new(MongoStore::connect(&config.mongo_uri, &config.database_name).await?)
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    store.install().await?;
    info!("Collection store ready ({:?} backend)", config.store_backend);
    Ok(store)
}

pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn set_record_id(record: &mut Value, id: &str) -> StoreResult<()> {
    match record.as_object_mut() {
        Some(map) => {
            map.insert("id".to_string(), Value::String(id.to_string()));
            Ok(())
        }
        None => Err(StoreError::MissingId),
    }
}

/// Millisecond timestamp id, bumped until `taken` rejects it no longer.
pub fn fresh_id(taken: impl Fn(&str) -> bool) -> String {
    let mut candidate = Utc::now().timestamp_millis();
    loop {
        let id = candidate.to_string();
        if !taken(&id) {
            return id;
        }
        candidate += 1;
    }
}

pub(crate) fn upsert_in(records: &mut Vec<Value>, record: Value) -> StoreResult<Upsert> {
    let id = record_id(&record).ok_or(StoreError::MissingId)?;
    match records.iter().position(|r| record_id(r) == Some(id)) {
        Some(index) => {
            records[index] = record;
            Ok(Upsert::Updated)
        }
        None => {
            records.push(record);
            Ok(Upsert::Inserted)
        }
    }
}

pub(crate) fn insert_in(
    records: &mut Vec<Value>,
    mut record: Value,
    placement: Placement,
) -> StoreResult<Value> {
    let id = fresh_id(|candidate| records.iter().any(|r| record_id(r) == Some(candidate)));
    set_record_id(&mut record, &id)?;
    match placement {
        Placement::Front => records.insert(0, record.clone()),
        Placement::Back => records.push(record.clone()),
    }
    Ok(record)
}

pub(crate) fn delete_in(records: &mut Vec<Value>, id: &str) -> bool {
    match records.iter().position(|r| record_id(r) == Some(id)) {
        Some(index) => {
            records.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<Value> {
        vec![
            json!({ "id": "1", "name": "first" }),
            json!({ "id": "2", "name": "second" }),
        ]
    }

    #[test]
    fn upsert_replaces_in_place_or_appends() {
        let mut records = sample();
        let outcome = upsert_in(&mut records, json!({ "id": "1", "name": "changed" })).unwrap();
        assert_eq!(outcome, Upsert::Updated);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "changed");

        let outcome = upsert_in(&mut records, json!({ "id": "3", "name": "third" })).unwrap();
        assert_eq!(outcome, Upsert::Inserted);
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["id"], "3");
    }

    #[test]
    fn upsert_requires_string_id() {
        let mut records = sample();
        assert!(matches!(
            upsert_in(&mut records, json!({ "id": 7 })),
            Err(StoreError::MissingId)
        ));
    }

    #[test]
    fn delete_removes_exactly_one_record() {
        let mut records = sample();
        let untouched = records[1].clone();
        assert!(delete_in(&mut records, "1"));
        assert_eq!(records, vec![untouched]);
        assert!(!delete_in(&mut records, "1"));
    }

    #[test]
    fn insert_front_assigns_unique_id() {
        let mut records = sample();
        let first = insert_in(&mut records, json!({ "name": "a" }), Placement::Front).unwrap();
        let second = insert_in(&mut records, json!({ "name": "b" }), Placement::Front).unwrap();
        assert_ne!(record_id(&first), record_id(&second));
        assert_eq!(records[0], second);
        assert_eq!(records[1], first);
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn fresh_id_skips_taken_values() {
        let now = Utc::now().timestamp_millis();
        let id = fresh_id(|candidate| candidate.parse::<i64>().map_or(false, |n| n <= now + 2));
        assert!(id.parse::<i64>().unwrap() > now + 2);
    }
}
