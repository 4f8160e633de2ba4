

use async_trait::async_trait;
use bson::Document;
use futures::{StreamExt, TryStreamExt};
use mongodb::options::{
    AggregateOptions, ClientOptions, CountOptions, FindOneAndUpdateOptions, FindOneOptions,
    FindOptions, IndexOptions, InsertManyOptions, InsertOneOptions, UpdateOptions,
};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use super::collection::{
    CollectionError, DocumentCollection, DocumentStream, IndexSpec, InsertManyOutcome,
    InsertOneOutcome, UpdateOutcome,
};
use crate::core::config::SoftDeleteConfig;


/// `DocumentCollection` backed by the official MongoDB driver.
#[derive(Clone, Debug)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

impl MongoCollection {

    pub fn new(inner: Collection<Document>) -> Self {
        Self { inner }
    }


    pub async fn connect(config: &SoftDeleteConfig) -> Result<Self, CollectionError> {
        let mut options = ClientOptions::parse(&config.mongo_uri).await?;
        if config.app_name.is_some() {
            options.app_name = config.app_name.clone();
        }

        let client = Client::with_options(options)?;
        let inner = client
            .database(&config.database)
            .collection::<Document>(&config.collection);

        info!("MongoCollection ready for {}", config.namespace());

        Ok(Self { inner })
    }


    pub fn inner(&self) -> &Collection<Document> {
        &self.inner
    }
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find(
        &self,
        filter: Option<Document>,
        options: Option<FindOptions>,
    ) -> Result<DocumentStream, CollectionError> {
        let cursor = self.inner.find(filter, options).await?;
        Ok(cursor.map_err(CollectionError::from).boxed())
    }

    async fn find_one(
        &self,
        filter: Option<Document>,
        options: Option<FindOneOptions>,
    ) -> Result<Option<Document>, CollectionError> {
        Ok(self.inner.find_one(filter, options).await?)
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, CollectionError> {
        Ok(self.inner.update_one(filter, update, options).await?.into())
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, CollectionError> {
        Ok(self.inner.update_many(filter, update, options).await?.into())
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> Result<Option<Document>, CollectionError> {
        Ok(self.inner.find_one_and_update(filter, update, options).await?)
    }

    async fn insert_one(
        &self,
        document: Document,
        options: Option<InsertOneOptions>,
    ) -> Result<InsertOneOutcome, CollectionError> {
        let result = self.inner.insert_one(document, options).await?;
        Ok(InsertOneOutcome { inserted_id: result.inserted_id })
    }

    async fn insert_many(
        &self,
        documents: Vec<Document>,
        options: Option<InsertManyOptions>,
    ) -> Result<InsertManyOutcome, CollectionError> {
        let result = self.inner.insert_many(documents, options).await?;
        Ok(InsertManyOutcome { inserted_ids: result.inserted_ids })
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: Option<AggregateOptions>,
    ) -> Result<DocumentStream, CollectionError> {
        let cursor = self.inner.aggregate(pipeline, options).await?;
        Ok(cursor.map_err(CollectionError::from).boxed())
    }

    async fn count_documents(
        &self,
        filter: Option<Document>,
        options: Option<CountOptions>,
    ) -> Result<u64, CollectionError> {
        Ok(self.inner.count_documents(filter, options).await?)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSpec>, CollectionError> {
        let models: Vec<IndexModel> = self.inner.list_indexes(None).await?.try_collect().await?;

        Ok(models
            .into_iter()
            .map(|model| {
                let (name, unique) = model
                    .options
                    .map(|opts| (opts.name.unwrap_or_default(), opts.unique.unwrap_or(false)))
                    .unwrap_or_default();
                IndexSpec { name, keys: model.keys, unique }
            })
            .collect())
    }

    async fn create_index(&self, index: IndexSpec) -> Result<String, CollectionError> {
        debug!("Creating index {} on {}", index.name, self.inner.name());

        let options = IndexOptions::builder()
            .name(index.name)
            .unique(index.unique)
            .build();
        let model = IndexModel::builder().keys(index.keys).options(options).build();

        Ok(self.inner.create_index(model, None).await?.index_name)
    }

    async fn drop_index(&self, name: &str) -> Result<(), CollectionError> {
        debug!("Dropping index {} on {}", name, self.inner.name());
        Ok(self.inner.drop_index(name, None).await?)
    }
}
