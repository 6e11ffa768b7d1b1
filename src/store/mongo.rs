use std::future::Future;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneOptions, FindOptions, IndexOptions, ReplaceOptions},
    Client, Collection, Database, IndexModel,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{record_id, CollectionKind, CollectionStore, Placement, Upsert, SETTINGS};
use crate::error::{StoreError, StoreResult};
use crate::seed;

/// Hidden field that keeps the list order of a collection.
const POSITION: &str = "_pos";
const SETTINGS_KEY: &str = "site";
const DUPLICATE_KEY: i32 = 11000;
/// Upper bound on id candidates tried for one insert.
const MAX_ID_ATTEMPTS: usize = 64;

pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database_name: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database_name);
        info!("MongoDB connection established ({})", database_name);
        Ok(MongoStore { database })
    }

    fn collection(&self, kind: CollectionKind) -> Collection<Document> {
        self.database.collection(kind.as_str())
    }

    fn settings(&self) -> Collection<Document> {
        self.database.collection(SETTINGS)
    }

    /// Position just past either end of the collection.
    async fn edge_position(
        &self,
        collection: &Collection<Document>,
        placement: Placement,
    ) -> StoreResult<i64> {
        let (direction, step) = match placement {
            Placement::Front => (1, -1),
            Placement::Back => (-1, 1),
        };
        let options = FindOneOptions::builder()
            .sort(doc! { POSITION: direction })
            .build();
        let edge = collection.find_one(None, options).await?;
        Ok(edge
            .and_then(|d| position_of(&d))
            .map_or(0, |pos| pos + step))
    }

    async fn id_taken(&self, collection: &Collection<Document>, id: &str) -> StoreResult<bool> {
        Ok(collection.count_documents(doc! { "id": id }, None).await? > 0)
    }
}

fn position_of(document: &Document) -> Option<i64> {
    match document.get(POSITION) {
        Some(Bson::Int64(pos)) => Some(*pos),
        Some(Bson::Int32(pos)) => Some(i64::from(*pos)),
        _ => None,
    }
}

fn to_document(record: &Value, position: i64) -> StoreResult<Document> {
    let mut document = bson::to_document(record)?;
    document.insert(POSITION, position);
    Ok(document)
}

fn to_value(mut document: Document) -> Value {
    document.remove("_id");
    document.remove(POSITION);
    Bson::Document(document).into_relaxed_extjson()
}

fn settings_to_value(mut document: Document) -> Value {
    document.remove("key");
    to_value(document)
}

/// Maps a unique-index violation on `id` to `DuplicateId`.
fn claim_error(error: mongodb::error::Error, id: &str) -> StoreError {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            StoreError::DuplicateId(id.to_string())
        }
        _ => StoreError::Mongo(error),
    }
}

/// Runs `attempt` with timestamp ids counting up from `start` until one is
/// not rejected as `DuplicateId`.
async fn with_fresh_id<T, F, Fut>(start: i64, mut attempt: F) -> StoreResult<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut candidate = start;
    for _ in 0..MAX_ID_ATTEMPTS {
        match attempt(candidate.to_string()).await {
            Err(StoreError::DuplicateId(id)) => {
                debug!("Id {} already taken, trying the next one", id);
                candidate += 1;
            }
            other => return other,
        }
    }
    warn!("Gave up finding a free id after {} attempts", MAX_ID_ATTEMPTS);
    Err(StoreError::DuplicateId(candidate.to_string()))
}

#[async_trait]
impl CollectionStore for MongoStore {
    async fn install(&self) -> StoreResult<()> {
        for kind in CollectionKind::ALL {
            let collection = self.collection(kind);
            let index = IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build();
            collection.create_index(index, None).await?;

            if collection.count_documents(None, None).await? == 0 {
                let records = seed::collection(kind);
                if !records.is_empty() {
                    debug!("Seeding {} {}", records.len(), kind.as_str());
                    self.replace(kind, records).await?;
                }
            }
        }
        if self.load_settings().await?.is_none() {
            self.save_settings(seed::settings()).await?;
        }
        Ok(())
    }

    async fn load(&self, kind: CollectionKind) -> StoreResult<Vec<Value>> {
        let options = FindOptions::builder().sort(doc! { POSITION: 1 }).build();
        let mut cursor = self.collection(kind).find(None, options).await?;

        let mut records = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            records.push(to_value(document));
        }
        Ok(records)
    }

    async fn replace(&self, kind: CollectionKind, records: Vec<Value>) -> StoreResult<()> {
        let documents = records
            .iter()
            .zip(0i64..)
            .map(|(record, pos)| to_document(record, pos))
            .collect::<StoreResult<Vec<_>>>()?;

        let collection = self.collection(kind);
        collection.delete_many(doc! {}, None).await?;
        // insert_many rejects an empty batch
        if !documents.is_empty() {
            collection.insert_many(documents, None).await?;
        }
        Ok(())
    }

    async fn upsert(&self, kind: CollectionKind, record: Value) -> StoreResult<Upsert> {
        let id = record_id(&record).ok_or(StoreError::MissingId)?.to_string();
        let collection = self.collection(kind);

        let existing = collection.find_one(doc! { "id": &id }, None).await?;
        let (position, outcome) = match existing.as_ref().and_then(position_of) {
            Some(pos) => (pos, Upsert::Updated),
            None => (
                self.edge_position(&collection, Placement::Back).await?,
                Upsert::Inserted,
            ),
        };

        let options = ReplaceOptions::builder().upsert(true).build();
        collection
            .replace_one(doc! { "id": &id }, to_document(&record, position)?, options)
            .await?;
        Ok(outcome)
    }

    async fn insert(
        &self,
        kind: CollectionKind,
        record: Value,
        placement: Placement,
    ) -> StoreResult<Value> {
        if !record.is_object() {
            return Err(StoreError::MissingId);
        }
        let collection = &self.collection(kind);

        // The unique index settles races between concurrent inserts.
        with_fresh_id(chrono::Utc::now().timestamp_millis(), move |id| {
            let mut record = record.clone();
            async move {
                if self.id_taken(collection, &id).await? {
                    return Err(StoreError::DuplicateId(id));
                }
                if let Some(fields) = record.as_object_mut() {
                    fields.insert("id".to_string(), Value::String(id.clone()));
                }
                let position = self.edge_position(collection, placement).await?;
                collection
                    .insert_one(to_document(&record, position)?, None)
                    .await
                    .map_err(|e| claim_error(e, &id))?;
                Ok(record)
            }
        })
        .await
    }

    async fn delete(&self, kind: CollectionKind, id: &str) -> StoreResult<bool> {
        let result = self
            .collection(kind)
            .delete_one(doc! { "id": id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn load_settings(&self) -> StoreResult<Option<Value>> {
        let document = self
            .settings()
            .find_one(doc! { "key": SETTINGS_KEY }, None)
            .await?;
        Ok(document.map(settings_to_value))
    }

    async fn save_settings(&self, settings: Value) -> StoreResult<()> {
        let mut document = bson::to_document(&settings)?;
        document.insert("key", SETTINGS_KEY);
        let options = ReplaceOptions::builder().upsert(true).build();
        self.settings()
            .replace_one(doc! { "key": SETTINGS_KEY }, document, options)
            .await?;
        Ok(())
    }
}
