//! Document-store helpers over the MongoDB driver
//!
//! Every call resolves the collection in the configured database and runs
//! the driver operation under the configured per-call deadline.

use bson::{doc, Bson, Document as BsonDocument, RawDocumentBuf};
use futures::TryStreamExt;
use mongodb::{
    options::{ClientOptions, FindOneAndUpdateOptions, ReturnDocument},
    Client as MongoClient, Collection, Database,
};
use mongokit_common::{MongoKitError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::future::IntoFuture;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::object_id::new_object_id;
use crate::query::FindOptionsBuilder;
use crate::update::{set_and_inc, UpdateType};

/// Counts reported by an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}

/// MongoDB connection handle with timeout-wrapped helpers
#[derive(Debug, Clone)]
pub struct Client {
    database: Database,
    context_timeout: Duration,
}

impl Client {
    /// Connect to the configured server and verify it answers a ping
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.addr)
            .await
            .map_err(|e| MongoKitError::Connection(format!("invalid address: {}", e)))?;

        if let Some(max) = config.max_pool_size {
            options.max_pool_size = Some(max);
        }
        if let Some(app) = &config.app_name {
            options.app_name = Some(app.clone());
        }

        let client = MongoClient::with_options(options)
            .map_err(|e| MongoKitError::Connection(e.to_string()))?;
        let database = client.database(&config.db_name);

        let kit = Self {
            database,
            context_timeout: config.context_timeout(),
        };

        kit.ping().await.map_err(|e| match e {
            MongoKitError::MongoDB(msg) => {
                MongoKitError::Connection(format!("Ping failed: {}", msg))
            }
            other => other,
        })?;

        info!(database = %config.db_name, "Connected to MongoDB");
        Ok(kit)
    }

    /// Get a reference to the database
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Deadline applied to each call
    pub fn context_timeout(&self) -> Duration {
        self.context_timeout
    }

    /// Get a collection by name (untyped BsonDocument collection)
    pub fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }

    /// Get a typed collection
    pub fn typed_collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    /// Ping the server
    pub async fn ping(&self) -> Result<()> {
        self.timeout(self.database.run_command(doc! { "ping": 1 }))
            .await?;
        Ok(())
    }

    /// Find a single document matching the filter
    pub async fn find_one<T>(&self, collection: &str, filter: BsonDocument) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let coll = self.typed_collection::<T>(collection);
        self.timeout(coll.find_one(filter)).await
    }

    /// Find documents matching the filter, returned as raw BSON.
    ///
    /// Projection, sort, skip and limit come from `options`.
    pub async fn find_many(
        &self,
        collection: &str,
        filter: BsonDocument,
        options: &FindOptionsBuilder,
    ) -> Result<Vec<RawDocumentBuf>> {
        let coll = self.collection(collection);
        let find = coll.find(filter).with_options(options.build());

        self.timeout(async move {
            let mut cursor = find.await?;
            let mut docs = Vec::new();
            while cursor.advance().await? {
                docs.push(cursor.current().to_raw_document_buf());
            }
            Ok::<_, mongodb::error::Error>(docs)
        })
        .await
    }

    /// Count documents matching the filter
    pub async fn count(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        let coll = self.collection(collection);
        self.timeout(coll.count_documents(filter)).await
    }

    /// Estimated number of documents in the whole collection
    pub async fn estimated_count(&self, collection: &str) -> Result<u64> {
        let coll = self.collection(collection);
        self.timeout(coll.estimated_document_count()).await
    }

    /// One randomly sampled document, `None` if the collection is empty
    pub async fn random_one<T: DeserializeOwned>(&self, collection: &str) -> Result<Option<T>> {
        let coll = self.collection(collection);

        let sampled = self
            .timeout(async move {
                let mut cursor = coll.aggregate([doc! { "$sample": { "size": 1 } }]).await?;
                cursor.try_next().await
            })
            .await
            .inspect_err(|e| warn!(collection, error = %e, "Random sample failed"))?;

        match sampled {
            Some(doc) => Ok(Some(bson::from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Find a document by an element of an embedded array.
    ///
    /// See [`slice_filter`] for the filter built from the arguments.
    pub async fn find_slice<T>(
        &self,
        collection: &str,
        slice_name: &str,
        key: &str,
        value: &str,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.find_one(collection, slice_filter(slice_name, key, value))
            .await
    }

    /// Insert a single document, returning its `_id`
    pub async fn insert_one<T>(&self, collection: &str, value: &T) -> Result<Bson>
    where
        T: Serialize + Send + Sync,
    {
        let coll = self.typed_collection::<T>(collection);
        let result = self.timeout(coll.insert_one(value)).await?;
        Ok(result.inserted_id)
    }

    /// Insert a document, generating an ObjectId `_id` when it has none
    pub async fn insert_document(
        &self,
        collection: &str,
        mut document: BsonDocument,
    ) -> Result<Bson> {
        let id = ensure_object_id(&mut document);
        debug!(collection, id = %id, "Inserting document");
        self.insert_one(collection, &document).await?;
        Ok(id)
    }

    /// Insert several documents, returning their `_id`s in input order
    pub async fn insert_many<T>(&self, collection: &str, values: &[T]) -> Result<Vec<Bson>>
    where
        T: Serialize + Send + Sync,
    {
        let coll = self.typed_collection::<T>(collection);
        let result = self.timeout(coll.insert_many(values)).await?;

        let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        ids.sort_by_key(|(idx, _)| *idx);
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    /// Apply `update_type` with `updater` to the first matching document
    pub async fn update_one(
        &self,
        collection: &str,
        filter: BsonDocument,
        updater: BsonDocument,
        update_type: UpdateType,
    ) -> Result<UpdateOutcome> {
        let coll = self.collection(collection);
        let result = self
            .timeout(coll.update_one(filter, update_type.document(updater)))
            .await?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    /// Atomically update the first matching document and return it after
    /// the update.
    ///
    /// # Errors
    /// `MongoKitError::UpdateConditionsNotMet` if nothing matches `filter`.
    pub async fn find_and_update_one<T>(
        &self,
        collection: &str,
        filter: BsonDocument,
        updater: BsonDocument,
        update_type: UpdateType,
    ) -> Result<T>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.find_one_and_update(collection, filter, update_type.document(updater))
            .await
    }

    /// Like [`Client::find_and_update_one`], applying `$set` and `$inc` together
    pub async fn find_and_update_set_inc<T>(
        &self,
        collection: &str,
        filter: BsonDocument,
        set: BsonDocument,
        inc: BsonDocument,
    ) -> Result<T>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.find_one_and_update(collection, filter, set_and_inc(set, inc))
            .await
    }

    /// Delete the first matching document, returning the deleted count
    pub async fn delete_one(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        let coll = self.collection(collection);
        let result = self.timeout(coll.delete_one(filter)).await?;
        Ok(result.deleted_count)
    }

    /// Delete every matching document, returning the deleted count
    pub async fn delete_many(&self, collection: &str, filter: BsonDocument) -> Result<u64> {
        let coll = self.collection(collection);
        let result = self.timeout(coll.delete_many(filter)).await?;
        Ok(result.deleted_count)
    }

    /// Run an aggregation pipeline and collect its output
    pub async fn aggregate(
        &self,
        collection: &str,
        pipeline: Vec<BsonDocument>,
    ) -> Result<Vec<BsonDocument>> {
        let coll = self.collection(collection);

        self.timeout(async move {
            let cursor = coll.aggregate(pipeline).await?;
            cursor.try_collect::<Vec<BsonDocument>>().await
        })
        .await
        .inspect_err(|e| warn!(collection, error = %e, "Aggregation failed"))
    }

    async fn find_one_and_update<T>(
        &self,
        collection: &str,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<T>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let coll = self.typed_collection::<T>(collection);

        let mut options = FindOneAndUpdateOptions::default();
        options.return_document = Some(ReturnDocument::After);

        self.timeout(coll.find_one_and_update(filter, update).with_options(options))
            .await?
            .ok_or(MongoKitError::UpdateConditionsNotMet)
    }

    async fn timeout<F, T>(&self, operation: F) -> Result<T>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        let result = tokio::time::timeout(self.context_timeout, operation.into_future()).await?;
        Ok(result?)
    }
}

/// Filter for a document whose array `slice_name` holds `key`, or, when
/// `value` is non-empty, whose array elements have `key` equal to `value`.
pub fn slice_filter(slice_name: &str, key: &str, value: &str) -> BsonDocument {
    let mut filter = BsonDocument::new();
    if value.is_empty() {
        filter.insert(slice_name, key);
    } else {
        filter.insert(format!("{}.{}", slice_name, key), value);
    }
    filter
}

/// Make sure `document` has an `_id`, generating an ObjectId if absent.
///
/// Returns the document's `_id`.
pub fn ensure_object_id(document: &mut BsonDocument) -> Bson {
    if let Some(id) = document.get("_id") {
        return id.clone();
    }
    let id = Bson::ObjectId(new_object_id());
    document.insert("_id", id.clone());
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_id::{global, ObjectIdParts};

    #[test]
    fn test_slice_filter_without_value() {
        assert_eq!(slice_filter("tags", "rust", ""), doc! { "tags": "rust" });
    }

    #[test]
    fn test_slice_filter_with_value() {
        assert_eq!(
            slice_filter("items", "sku", "A-100"),
            doc! { "items.sku": "A-100" }
        );
    }

    #[test]
    fn test_ensure_object_id_generates() {
        let mut document = doc! { "name": "widget" };
        let id = ensure_object_id(&mut document);

        let oid = id.as_object_id().unwrap();
        assert_eq!(document.get_object_id("_id").unwrap(), oid);
        assert_eq!(ObjectIdParts::from(oid).machine, global().machine());
    }

    #[test]
    fn test_ensure_object_id_keeps_existing() {
        let mut document = doc! { "_id": "order-42", "total": 10 };
        let id = ensure_object_id(&mut document);

        assert_eq!(id, Bson::String("order-42".to_string()));
        assert_eq!(document.get_str("_id").unwrap(), "order-42");
    }

    #[tokio::test]
    async fn test_connect_invalid_address() {
        let config = ClientConfig::new("not-a-uri", "db");
        let err = Client::connect(&config).await.unwrap_err();
        assert!(matches!(err, MongoKitError::Connection(_)));
    }
}
