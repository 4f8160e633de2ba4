

use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, DateTime, Document, doc};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::{
    AggregateOptions, CountOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions,
    InsertManyOptions, InsertOneOptions, UpdateOptions,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::filter::FieldNames;
use super::pipeline::Pipeline;
use crate::core::config::SoftDeleteConfig;
use crate::core::error::{Result, SoftDeleteError};
use crate::db::{
    DocumentCollection, DocumentStream, IndexSpec, InsertManyOutcome,
    InsertOneOutcome, MongoCollection, UpdateOutcome,
};


/// Collection operations with soft-delete semantics: reads and updates skip
/// documents flagged deleted, deletes only flag.
#[async_trait]
pub trait SoftDeleteStore: Send + Sync {

    fn collection_name(&self) -> &str;


    fn field_names(&self) -> &FieldNames;


    async fn find(&self, filter: Option<Document>, options: Option<FindOptions>) -> Result<DocumentStream>;


    async fn find_one(&self, filter: Option<Document>, options: Option<FindOneOptions>) -> Result<Option<Document>>;


    async fn count_documents(&self, filter: Option<Document>, options: Option<CountOptions>) -> Result<u64>;


    async fn update_one(
        &self,
        filter: Option<Document>,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome>;


    async fn update_many(
        &self,
        filter: Option<Document>,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome>;

    /// Updates the document with `_id == id` unless it is soft-deleted.
    async fn update_by_id(&self, id: Bson, update: Document, options: Option<UpdateOptions>) -> Result<UpdateOutcome>;


    async fn find_one_and_update(
        &self,
        filter: Option<Document>,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> Result<Option<Document>>;


    async fn insert_one(&self, document: Document, options: Option<InsertOneOptions>) -> Result<InsertOneOutcome>;


    async fn insert_many(&self, documents: Vec<Document>, options: Option<InsertManyOptions>) -> Result<InsertManyOutcome>;

    /// Runs the pipeline behind a leading `$match` that drops deleted documents.
    async fn aggregate(&self, pipeline: Pipeline, options: Option<AggregateOptions>) -> Result<DocumentStream>;

    /// Flags the first document matching `filter`. Already-deleted documents
    /// are matched too and get re-stamped.
    async fn soft_delete_one(&self, filter: Document, deleted_by: Option<Bson>) -> Result<UpdateOutcome>;


    async fn soft_delete_many(&self, filter: Document, deleted_by: Option<Bson>) -> Result<UpdateOutcome>;


    async fn soft_delete_by_id(&self, id: Bson, deleted_by: Option<Bson>) -> Result<UpdateOutcome>;


    fn indexes(&self) -> IndexView<'_>;
}


/// Index introspection forwarded untouched to the wrapped collection.
pub struct IndexView<'a> {
    inner: &'a dyn DocumentCollection,
}

impl<'a> IndexView<'a> {
    pub fn new(inner: &'a dyn DocumentCollection) -> Self {
        Self { inner }
    }

    pub async fn list(&self) -> Result<Vec<IndexSpec>> {
        Ok(self.inner.list_indexes().await?)
    }

    pub async fn names(&self) -> Result<Vec<String>> {
        Ok(self.list().await?.into_iter().map(|index| index.name).collect())
    }

    pub async fn create(&self, index: IndexSpec) -> Result<String> {
        Ok(self.inner.create_index(index).await?)
    }

    pub async fn drop(&self, name: &str) -> Result<()> {
        Ok(self.inner.drop_index(name).await?)
    }
}


pub struct SoftDeleteCollection<C> {
    inner: C,
    fields: FieldNames,
}

impl<C: DocumentCollection> SoftDeleteCollection<C> {

    pub fn new(inner: C) -> Self {
        Self::with_fields(inner, FieldNames::default())
    }


    pub fn with_fields(inner: C, fields: FieldNames) -> Self {
        info!(
            "SoftDeleteCollection initialized: collection={}, flag={}",
            inner.name(),
            fields.deleted
        );
        Self { inner, fields }
    }

    /// The wrapped collection. Calls made through it bypass soft-delete filtering.
    pub fn inner(&self) -> &C {
        &self.inner
    }


    pub fn into_inner(self) -> C {
        self.inner
    }


    pub fn into_shared(self) -> Arc<dyn SoftDeleteStore>
    where
        C: 'static,
    {
        Arc::new(self)
    }


    pub async fn find_all(&self, filter: Option<Document>, options: Option<FindOptions>) -> Result<Vec<Document>> {
        let documents: Vec<Document> = self.find(filter, options).await?.try_collect().await?;
        Ok(documents)
    }


    pub async fn find_as<T: DeserializeOwned>(
        &self,
        filter: Option<Document>,
        options: Option<FindOptions>,
    ) -> Result<Vec<T>> {
        self.find_all(filter, options)
            .await?
            .into_iter()
            .map(|document| bson::from_document(document).map_err(SoftDeleteError::from))
            .collect()
    }


    pub async fn find_one_as<T: DeserializeOwned>(
        &self,
        filter: Option<Document>,
        options: Option<FindOneOptions>,
    ) -> Result<Option<T>> {
        match self.find_one(filter, options).await? {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Aggregates from a dynamically shaped value. Anything other than a stage
    /// document or an array of stages fails before reaching the database.
    pub async fn aggregate_value(&self, pipeline: Bson, options: Option<AggregateOptions>) -> Result<DocumentStream> {
        let pipeline = Pipeline::try_from(pipeline).inspect_err(|e| {
            warn!("Rejected pipeline for {}: {}", self.inner.name(), e);
        })?;
        self.aggregate(pipeline, options).await
    }

    fn deletion_stamp(&self, deleted_by: Option<Bson>) -> Document {
        self.fields
            .soft_delete_update(deleted_by, DateTime::from_chrono(Utc::now()))
    }
}

impl SoftDeleteCollection<MongoCollection> {

    pub async fn connect(config: &SoftDeleteConfig) -> Result<Self> {
        let inner = MongoCollection::connect(config).await?;
        Ok(Self::with_fields(inner, config.fields.clone()))
    }
}

#[async_trait]
impl<C: DocumentCollection> SoftDeleteStore for SoftDeleteCollection<C> {
    fn collection_name(&self) -> &str {
        self.inner.name()
    }

    fn field_names(&self) -> &FieldNames {
        &self.fields
    }

    async fn find(&self, filter: Option<Document>, options: Option<FindOptions>) -> Result<DocumentStream> {
        debug!("find on {} excluding deleted", self.inner.name());
        let filter = self.fields.exclude_deleted(filter);
        Ok(self.inner.find(Some(filter), options).await?)
    }

    async fn find_one(&self, filter: Option<Document>, options: Option<FindOneOptions>) -> Result<Option<Document>> {
        debug!("find_one on {} excluding deleted", self.inner.name());
        let filter = self.fields.exclude_deleted(filter);
        Ok(self.inner.find_one(Some(filter), options).await?)
    }

    async fn count_documents(&self, filter: Option<Document>, options: Option<CountOptions>) -> Result<u64> {
        debug!("count_documents on {} excluding deleted", self.inner.name());
        let filter = self.fields.exclude_deleted(filter);
        Ok(self.inner.count_documents(Some(filter), options).await?)
    }

    async fn update_one(
        &self,
        filter: Option<Document>,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome> {
        debug!("update_one on {} excluding deleted", self.inner.name());
        let filter = self.fields.exclude_deleted(filter);
        Ok(self.inner.update_one(filter, update, options).await?)
    }

    async fn update_many(
        &self,
        filter: Option<Document>,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome> {
        debug!("update_many on {} excluding deleted", self.inner.name());
        let filter = self.fields.exclude_deleted(filter);
        Ok(self.inner.update_many(filter, update, options).await?)
    }

    async fn update_by_id(&self, id: Bson, update: Document, options: Option<UpdateOptions>) -> Result<UpdateOutcome> {
        debug!("update_by_id {} on {}", id, self.inner.name());
        let filter = self.fields.active_by_id(id);
        Ok(self.inner.update_one(filter, update, options).await?)
    }

    async fn find_one_and_update(
        &self,
        filter: Option<Document>,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> Result<Option<Document>> {
        debug!("find_one_and_update on {} excluding deleted", self.inner.name());
        let filter = self.fields.exclude_deleted(filter);
        Ok(self.inner.find_one_and_update(filter, update, options).await?)
    }

    async fn insert_one(&self, document: Document, options: Option<InsertOneOptions>) -> Result<InsertOneOutcome> {
        Ok(self.inner.insert_one(document, options).await?)
    }

    async fn insert_many(&self, documents: Vec<Document>, options: Option<InsertManyOptions>) -> Result<InsertManyOutcome> {
        Ok(self.inner.insert_many(documents, options).await?)
    }

    async fn aggregate(&self, pipeline: Pipeline, options: Option<AggregateOptions>) -> Result<DocumentStream> {
        let stages = pipeline.prepend(self.fields.match_stage()).inspect_err(|e| {
            warn!("Rejected pipeline for {}: {}", self.inner.name(), e);
        })?;

        debug!("aggregate on {} with {} stages", self.inner.name(), stages.len());
        Ok(self.inner.aggregate(stages, options).await?)
    }

    async fn soft_delete_one(&self, filter: Document, deleted_by: Option<Bson>) -> Result<UpdateOutcome> {
        let update = self.deletion_stamp(deleted_by);
        let outcome = self.inner.update_one(filter, update, None).await?;
        info!(
            "Soft deleted {} document(s) in {}",
            outcome.modified_count,
            self.inner.name()
        );
        Ok(outcome)
    }

    async fn soft_delete_many(&self, filter: Document, deleted_by: Option<Bson>) -> Result<UpdateOutcome> {
        let update = self.deletion_stamp(deleted_by);
        let outcome = self.inner.update_many(filter, update, None).await?;
        info!(
            "Soft deleted {} document(s) in {}",
            outcome.modified_count,
            self.inner.name()
        );
        Ok(outcome)
    }

    async fn soft_delete_by_id(&self, id: Bson, deleted_by: Option<Bson>) -> Result<UpdateOutcome> {
        let update = self.deletion_stamp(deleted_by);
        let filter = doc! { "_id": id.clone() };
        let outcome = self.inner.update_one(filter, update, None).await?;
        if outcome.matched_count == 0 {
            debug!("soft_delete_by_id {} matched nothing in {}", id, self.inner.name());
        } else {
            info!("Soft deleted {} in {}", id, self.inner.name());
        }
        Ok(outcome)
    }

    fn indexes(&self) -> IndexView<'_> {
        IndexView::new(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CollectionError, MemoryCollection, Operation};
    use bson::{bson, oid::ObjectId};
    use serde::Deserialize;
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn store() -> SoftDeleteCollection<MemoryCollection> {
        SoftDeleteCollection::new(MemoryCollection::with_documents(
            "notes",
            vec![
                doc! { "_id": 1, "title": "alpha", "owner": "ada" },
                doc! { "_id": 2, "title": "beta", "owner": "ada", "deleted": false },
                doc! { "_id": 3, "title": "gamma", "owner": "bob", "deleted": true },
                doc! { "_id": 4, "title": "delta", "owner": "bob" },
            ],
        ))
    }

    fn ids(documents: &[Document]) -> Vec<i32> {
        documents.iter().map(|d| d.get_i32("_id").unwrap()).collect()
    }

    async fn collect(stream: DocumentStream) -> Vec<Document> {
        stream.try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_find_without_filter_returns_active_documents() {
        let store = store();
        let found = store.find_all(None, None).await.unwrap();
        assert_eq!(ids(&found), vec![1, 2, 4]);

        let call = store.inner().last_call().unwrap();
        assert_eq!(call.operation, Operation::Find);
        assert_eq!(call.filter, Some(doc! { "deleted": { "$ne": true } }));
    }

    #[tokio::test]
    async fn test_find_wraps_caller_filter() {
        let store = store();
        let found = store.find_all(Some(doc! { "owner": "bob" }), None).await.unwrap();
        assert_eq!(ids(&found), vec![4]);

        let call = store.inner().last_call().unwrap();
        assert_eq!(
            call.filter,
            Some(doc! { "$and": [{ "owner": "bob" }, { "deleted": { "$ne": true } }] })
        );
    }

    #[tokio::test]
    async fn test_caller_cannot_select_deleted_documents() {
        let store = store();
        let found = store.find_all(Some(doc! { "deleted": true }), None).await.unwrap();
        assert!(found.is_empty());

        let found = store
            .find_all(Some(doc! { "$or": [{ "_id": 3 }, { "_id": 4 }] }), None)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![4]);
    }

    #[tokio::test]
    async fn test_find_one_on_deleted_document_is_not_found() {
        let store = SoftDeleteCollection::new(MemoryCollection::with_documents(
            "notes",
            vec![doc! { "_id": 1, "deleted": true }],
        ));

        assert!(store.find_one(Some(doc! {}), None).await.unwrap().is_none());
        assert!(store.find_one(None, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_count_documents_excludes_deleted() {
        let store = store();
        assert_eq!(store.count_documents(None, None).await.unwrap(), 3);
        assert_eq!(store.count_documents(Some(doc! { "owner": "bob" }), None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete_one_without_actor() {
        let store = store();
        let before = DateTime::now();

        let outcome = store.soft_delete_one(doc! { "_id": 1 }, None).await.unwrap();
        assert_eq!((outcome.matched_count, outcome.modified_count), (1, 1));

        let call = store.inner().last_call().unwrap();
        assert_eq!(call.operation, Operation::UpdateOne);
        assert_eq!(call.filter, Some(doc! { "_id": 1 }));

        let stored = store.inner().get(1).unwrap();
        assert_eq!(stored.get_bool("deleted").unwrap(), true);
        assert!(*stored.get_datetime("deletedAt").unwrap() >= before);
        assert!(!stored.contains_key("deletedBy"));

        assert!(store.find_one(Some(doc! { "_id": 1 }), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_delete_many_records_actor() {
        let store = store();
        let actor = ObjectId::new();

        let outcome = store
            .soft_delete_many(doc! { "owner": "ada" }, Some(actor.into()))
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 2);

        for id in [1, 2] {
            let stored = store.inner().get(id).unwrap();
            assert_eq!(stored.get_bool("deleted").unwrap(), true);
            assert_eq!(stored.get_object_id("deletedBy").unwrap(), actor);
        }
        assert_eq!(ids(&store.find_all(None, None).await.unwrap()), vec![4]);
    }

    #[tokio::test]
    async fn test_soft_delete_filter_is_not_restricted_to_active_documents() {
        let store = store();
        let outcome = store.soft_delete_many(doc! { "owner": "bob" }, None).await.unwrap();
        assert_eq!(outcome.matched_count, 2);
        assert_eq!(
            store.inner().last_call().unwrap().filter,
            Some(doc! { "owner": "bob" })
        );
    }

    #[tokio::test]
    async fn test_soft_delete_twice_restamps() {
        let store = store();
        store.soft_delete_by_id(Bson::Int32(4), Some("ops".into())).await.unwrap();
        let first = *store.inner().get(4).unwrap().get_datetime("deletedAt").unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;

        let outcome = store.soft_delete_by_id(Bson::Int32(4), Some("audit".into())).await.unwrap();
        assert_eq!(outcome.matched_count, 1);

        let stored = store.inner().get(4).unwrap();
        assert_eq!(stored.get_bool("deleted").unwrap(), true);
        assert!(*stored.get_datetime("deletedAt").unwrap() > first);
        assert_eq!(stored.get_str("deletedBy").unwrap(), "audit");
    }

    #[tokio::test]
    async fn test_soft_delete_by_id_uses_plain_identifier_filter() {
        let store = store();
        let outcome = store.soft_delete_by_id(Bson::Int32(3), None).await.unwrap();
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(store.inner().last_call().unwrap().filter, Some(doc! { "_id": 3 }));
    }

    #[tokio::test]
    async fn test_update_by_id_skips_deleted_document() {
        let store = store();
        let update = doc! { "$set": { "title": "renamed" } };

        let outcome = store.update_by_id(Bson::Int32(3), update.clone(), None).await.unwrap();
        assert_eq!((outcome.matched_count, outcome.modified_count), (0, 0));
        assert_eq!(
            store.inner().last_call().unwrap().filter,
            Some(doc! { "_id": 3, "deleted": { "$ne": true } })
        );

        let outcome = store.update_by_id(Bson::Int32(4), update, None).await.unwrap();
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(store.inner().get(4).unwrap().get_str("title").unwrap(), "renamed");
    }

    #[tokio::test]
    async fn test_raw_update_bypasses_the_wrapper() {
        let store = store();
        let outcome = store
            .inner()
            .update_one(doc! { "_id": 3 }, doc! { "$set": { "title": "raw" } }, None)
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(store.inner().get(3).unwrap().get_str("title").unwrap(), "raw");
    }

    #[tokio::test]
    async fn test_update_one_and_many_leave_deleted_documents_alone() {
        let store = store();
        let update = doc! { "$set": { "archived": true } };

        let one = store.update_one(Some(doc! { "_id": 3 }), update.clone(), None).await.unwrap();
        assert_eq!(one.matched_count, 0);

        let many = store.update_many(None, update, None).await.unwrap();
        assert_eq!(many.matched_count, 3);
        assert!(!store.inner().get(3).unwrap().contains_key("archived"));
    }

    #[tokio::test]
    async fn test_overflowing_increment_is_an_error() {
        let store = SoftDeleteCollection::new(MemoryCollection::with_documents(
            "counters",
            vec![doc! { "_id": 1, "views": i64::MAX }],
        ));

        let err = store
            .update_one(Some(doc! { "_id": 1 }), doc! { "$inc": { "views": 1_i64 } }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SoftDeleteError::Collection(CollectionError::InvalidUpdate(_))), "{:?}", err);
        assert_eq!(store.inner().get(1).unwrap().get_i64("views").unwrap(), i64::MAX);
    }

    #[tokio::test]
    async fn test_find_one_and_update_skips_deleted() {
        let store = store();
        let update = doc! { "$set": { "seen": true } };

        let hit = store
            .find_one_and_update(Some(doc! { "owner": "bob" }), update.clone(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.get_i32("_id").unwrap(), 4);

        let miss = store
            .find_one_and_update(Some(doc! { "_id": 3 }), update, None)
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_aggregate_prepends_match_for_every_shape() {
        let store = store();
        let expected_head = doc! { "$match": { "deleted": { "$ne": true } } };
        let sort = doc! { "$sort": { "_id": -1 } };

        let shapes = vec![
            Pipeline::from(vec![sort.clone()]),
            Pipeline::from(sort.clone()),
            Pipeline::from(vec![Bson::Document(sort.clone())]),
        ];

        for shape in shapes {
            let results = collect(store.aggregate(shape, None).await.unwrap()).await;
            assert_eq!(ids(&results), vec![4, 2, 1]);

            let call = store.inner().last_call().unwrap();
            assert_eq!(call.pipeline, Some(vec![expected_head.clone(), sort.clone()]));
        }
    }

    #[tokio::test]
    async fn test_aggregate_value_accepts_document_and_array() {
        let store = store();

        let from_doc = collect(
            store
                .aggregate_value(bson!({ "$match": { "owner": "ada" } }), None)
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(ids(&from_doc), vec![1, 2]);

        let from_array = collect(
            store
                .aggregate_value(bson!([{ "$count": "active" }]), None)
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(from_array, vec![doc! { "active": 3 }]);
    }

    #[tokio::test]
    async fn test_malformed_pipeline_fails_before_any_call() {
        let store = store();

        let err = store.aggregate_value(Bson::String("nope".into()), None).await.err().unwrap();
        assert!(matches!(err, SoftDeleteError::UnsupportedPipeline(ref t) if t == "string"));

        let err = store
            .aggregate_value(bson!([{ "$limit": 1 }, true]), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SoftDeleteError::InvalidStage { index: 1, .. }));
        assert!(err.is_usage_error());

        assert!(store.inner().calls().is_empty());
    }

    #[tokio::test]
    async fn test_inserts_pass_through_unchanged() {
        let store = store();
        let outcome = assert_ok!(store.insert_one(doc! { "_id": 10, "title": "new" }, None).await);
        assert_eq!(outcome.inserted_id, Bson::Int32(10));
        assert_eq!(store.inner().get(10).unwrap(), doc! { "_id": 10, "title": "new" });

        let many = store
            .insert_many(vec![doc! { "_id": 11 }, doc! { "_id": 12 }], None)
            .await
            .unwrap();
        assert_eq!(many.inserted_ids.len(), 2);

        let operations: Vec<Operation> = store.inner().calls().iter().map(|c| c.operation).collect();
        assert_eq!(operations, vec![Operation::InsertOne, Operation::InsertMany]);
        assert!(store.inner().calls().iter().all(|c| c.filter.is_none()));
    }

    #[tokio::test]
    async fn test_index_view_passes_through() {
        let store = store();
        let indexes = store.indexes();

        assert_eq!(indexes.names().await.unwrap(), vec!["_id_"]);
        let name = indexes.create(IndexSpec::new(doc! { "owner": 1 })).await.unwrap();
        assert_eq!(name, "owner_1");
        assert_eq!(indexes.names().await.unwrap(), vec!["_id_", "owner_1"]);
        indexes.drop("owner_1").await.unwrap();
        assert_eq!(indexes.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_underlying_errors_propagate_unchanged() {
        let store = store();
        let err = store
            .update_one(Some(doc! { "_id": 1 }), doc! { "title": "replacement" }, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SoftDeleteError::Collection(CollectionError::InvalidUpdate(_))));
        assert!(!err.is_usage_error());

        let err = store.insert_one(doc! { "_id": 1 }, None).await.unwrap_err();
        assert!(matches!(err, SoftDeleteError::Collection(CollectionError::DuplicateKey(_))));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Note {
        #[serde(rename = "_id")]
        id: i32,
        title: String,
    }

    #[tokio::test]
    async fn test_typed_reads() {
        let store = store();
        let notes: Vec<Note> = store.find_as(Some(doc! { "owner": "ada" }), None).await.unwrap();
        assert_eq!(
            notes,
            vec![
                Note { id: 1, title: "alpha".into() },
                Note { id: 2, title: "beta".into() },
            ]
        );

        let missing: Option<Note> = store.find_one_as(Some(doc! { "_id": 3 }), None).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_custom_field_names_drive_every_rewrite() {
        let fields = FieldNames {
            deleted: "removed".to_string(),
            deleted_at: "removedAt".to_string(),
            deleted_by: "removedBy".to_string(),
        };
        let store = SoftDeleteCollection::with_fields(
            MemoryCollection::with_documents("notes", vec![doc! { "_id": 1 }, doc! { "_id": 2, "removed": true }]),
            fields,
        );

        assert_eq!(ids(&store.find_all(None, None).await.unwrap()), vec![1]);

        store.soft_delete_one(doc! { "_id": 1 }, Some("ops".into())).await.unwrap();
        let stored = store.inner().get(1).unwrap();
        assert_eq!(stored.get_bool("removed").unwrap(), true);
        assert!(stored.contains_key("removedAt"));
        assert_eq!(stored.get_str("removedBy").unwrap(), "ops");
        assert!(!stored.contains_key("deleted"));
    }

    #[tokio::test]
    async fn test_shared_trait_object() {
        let shared: Arc<dyn SoftDeleteStore> = store().into_shared();
        assert_eq!(shared.collection_name(), "notes");
        assert_eq!(shared.field_names(), &FieldNames::default());

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move { shared.count_documents(None, None).await.unwrap() })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), 3);
        }
    }

    #[tokio::test]
    async fn test_wraps_shared_collection_handle() {
        let memory: Arc<dyn DocumentCollection> = Arc::new(MemoryCollection::with_documents(
            "notes",
            vec![doc! { "_id": 1, "deleted": true }, doc! { "_id": 2 }],
        ));
        let store = SoftDeleteCollection::new(Arc::clone(&memory));

        assert_eq!(store.count_documents(None, None).await.unwrap(), 1);
        assert_eq!(memory.count_documents(None, None).await.unwrap(), 2);
    }
}
