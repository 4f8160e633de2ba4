

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use futures::stream::BoxStream;
use mongodb::options::{
    AggregateOptions, CountOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions,
    InsertManyOptions, InsertOneOptions, UpdateOptions,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;


#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Index not found: {0}")]
    IndexNotFound(String),
}


pub type DocumentStream = BoxStream<'static, Result<Document, CollectionError>>;


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<Bson>,
}

impl From<mongodb::results::UpdateResult> for UpdateOutcome {
    fn from(result: mongodb::results::UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneOutcome {
    pub inserted_id: Bson,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertManyOutcome {
    pub inserted_ids: HashMap<usize, Bson>,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Document,
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    /// Builds a spec named the way the server names unnamed indexes
    /// (`field_1_other_-1`).
    pub fn new(keys: Document) -> Self {
        let name = keys
            .iter()
            .map(|(field, direction)| format!("{}_{}", field, direction))
            .collect::<Vec<_>>()
            .join("_");

        Self { name, keys, unique: false }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}


/// Operation set of a document collection handle. Implemented by the MongoDB
/// driver adapter and the in-memory adapter.
#[async_trait]
pub trait DocumentCollection: Send + Sync {

    fn name(&self) -> &str;


    async fn find(
        &self,
        filter: Option<Document>,
        options: Option<FindOptions>,
    ) -> Result<DocumentStream, CollectionError>;


    async fn find_one(
        &self,
        filter: Option<Document>,
        options: Option<FindOneOptions>,
    ) -> Result<Option<Document>, CollectionError>;


    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, CollectionError>;


    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, CollectionError>;


    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> Result<Option<Document>, CollectionError>;


    async fn insert_one(
        &self,
        document: Document,
        options: Option<InsertOneOptions>,
    ) -> Result<InsertOneOutcome, CollectionError>;


    async fn insert_many(
        &self,
        documents: Vec<Document>,
        options: Option<InsertManyOptions>,
    ) -> Result<InsertManyOutcome, CollectionError>;


    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
    ) -> Result<DocumentStream, CollectionError>;


    async fn count_documents(
        &self,
        filter: Option<Document>,
        options: Option<CountOptions>,
    ) -> Result<u64, CollectionError>;


    async fn list_indexes(&self) -> Result<Vec<IndexSpec>, CollectionError>;


    async fn create_index(&self, index: IndexSpec) -> Result<String, CollectionError>;


    async fn drop_index(&self, name: &str) -> Result<(), CollectionError>;
}


#[async_trait]
impl DocumentCollection for Arc<dyn DocumentCollection> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn find(
        &self,
        filter: Option<Document>,
        options: Option<FindOptions>,
    ) -> Result<DocumentStream, CollectionError> {
        (**self).find(filter, options).await
    }

    async fn find_one(
        &self,
        filter: Option<Document>,
        options: Option<FindOneOptions>,
    ) -> Result<Option<Document>, CollectionError> {
        (**self).find_one(filter, options).await
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, CollectionError> {
        (**self).update_one(filter, update, options).await
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, CollectionError> {
        (**self).update_many(filter, update, options).await
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> Result<Option<Document>, CollectionError> {
        (**self).find_one_and_update(filter, update, options).await
    }

    async fn insert_one(
        &self,
        document: Document,
        options: Option<InsertOneOptions>,
    ) -> Result<InsertOneOutcome, CollectionError> {
        (**self).insert_one(document, options).await
    }

    async fn insert_many(
        &self,
        documents: Vec<Document>,
        options: Option<InsertManyOptions>,
    ) -> Result<InsertManyOutcome, CollectionError> {
        (**self).insert_many(documents, options).await
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
    ) -> Result<DocumentStream, CollectionError> {
        (**self).aggregate(pipeline, options).await
    }

    async fn count_documents(
        &self,
        filter: Option<Document>,
        options: Option<CountOptions>,
    ) -> Result<u64, CollectionError> {
        (**self).count_documents(filter, options).await
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSpec>, CollectionError> {
        (**self).list_indexes().await
    }

    async fn create_index(&self, index: IndexSpec) -> Result<String, CollectionError> {
        (**self).create_index(index).await
    }

    async fn drop_index(&self, name: &str) -> Result<(), CollectionError> {
        (**self).drop_index(name).await
    }
}
