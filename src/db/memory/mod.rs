//! In-process `DocumentCollection` used as a test double and by the demo
//! binary. Evaluates a subset of the MongoDB query language and records
//! every call it receives.

pub mod matcher;
pub mod stages;
pub mod update;

use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use futures::StreamExt;
use mongodb::options::{
    AggregateOptions, CountOptions, FindOneAndUpdateOptions, FindOneOptions, FindOptions,
    InsertManyOptions, InsertOneOptions, ReturnDocument, UpdateOptions,
};
use parking_lot::RwLock;
use strum::Display;
use tracing::debug;

use super::collection::{
    CollectionError, DocumentCollection, DocumentStream, IndexSpec, InsertManyOutcome,
    InsertOneOutcome, UpdateOutcome,
};
use matcher::matches;
use stages::{run_pipeline, sort_documents};
use update::apply_update;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Find,
    FindOne,
    UpdateOne,
    UpdateMany,
    FindOneAndUpdate,
    InsertOne,
    InsertMany,
    Aggregate,
    CountDocuments,
    ListIndexes,
    CreateIndex,
    DropIndex,
}


#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: Operation,
    pub filter: Option<Document>,
    pub update: Option<Document>,
    pub pipeline: Option<Vec<Document>>,
}

impl RecordedCall {
    fn new(operation: Operation) -> Self {
        Self { operation, filter: None, update: None, pipeline: None }
    }

    fn filter(mut self, filter: Option<&Document>) -> Self {
        self.filter = filter.cloned();
        self
    }

    fn update(mut self, update: &Document) -> Self {
        self.update = Some(update.clone());
        self
    }
}


pub struct MemoryCollection {
    name: String,
    documents: RwLock<Vec<Document>>,
    indexes: RwLock<Vec<IndexSpec>>,
    calls: RwLock<Vec<RecordedCall>>,
}

impl MemoryCollection {

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            documents: RwLock::new(Vec::new()),
            indexes: RwLock::new(vec![IndexSpec::new(doc! { "_id": 1 }).named("_id_")]),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Seeds the collection without recording calls. Documents without `_id`
    /// get a generated one.
    pub fn with_documents(name: &str, documents: impl IntoIterator<Item = Document>) -> Self {
        let collection = Self::new(name);
        {
            let mut stored = collection.documents.write();
            for document in documents {
                stored.push(with_id(document).0);
            }
        }
        collection
    }

    /// Raw snapshot of every stored document, deleted or not.
    pub fn documents(&self) -> Vec<Document> {
        self.documents.read().clone()
    }


    pub fn get(&self, id: impl Into<Bson>) -> Option<Document> {
        let id = id.into();
        self.documents
            .read()
            .iter()
            .find(|document| document.get("_id") == Some(&id))
            .cloned()
    }


    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().clone()
    }


    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.read().last().cloned()
    }


    pub fn clear_calls(&self) {
        self.calls.write().clear();
    }

    fn record(&self, call: RecordedCall) {
        debug!("{} {}", self.name, call.operation);
        self.calls.write().push(call);
    }

    fn select(&self, filter: Option<&Document>) -> Result<Vec<Document>, CollectionError> {
        let documents = self.documents.read();
        let mut selected = Vec::new();
        for document in documents.iter() {
            if filter.map_or(Ok(true), |f| matches(document, f))? {
                selected.push(document.clone());
            }
        }
        Ok(selected)
    }

    fn update_matching(
        &self,
        filter: &Document,
        update: &Document,
        options: Option<&UpdateOptions>,
        multi: bool,
    ) -> Result<UpdateOutcome, CollectionError> {
        reject_upsert(options.and_then(|o| o.upsert))?;

        let mut documents = self.documents.write();
        let mut outcome = UpdateOutcome::default();

        for document in documents.iter_mut() {
            if !matches(document, filter)? {
                continue;
            }
            outcome.matched_count += 1;
            if apply_update(document, update)? {
                outcome.modified_count += 1;
            }
            if !multi {
                break;
            }
        }

        Ok(outcome)
    }

    fn insert(&self, document: Document) -> Result<Bson, CollectionError> {
        let (document, id) = with_id(document);
        let mut documents = self.documents.write();

        if documents.iter().any(|existing| existing.get("_id") == Some(&id)) {
            return Err(CollectionError::DuplicateKey(format!("{} _id: {}", self.name, id)));
        }

        documents.push(document);
        Ok(id)
    }
}

fn with_id(document: Document) -> (Document, Bson) {
    if let Some(id) = document.get("_id") {
        let id = id.clone();
        return (document, id);
    }

    let id = Bson::ObjectId(ObjectId::new());
    let mut stamped = doc! { "_id": id.clone() };
    for (key, value) in document {
        stamped.insert(key, value);
    }
    (stamped, id)
}

fn reject_upsert(upsert: Option<bool>) -> Result<(), CollectionError> {
    if upsert == Some(true) {
        return Err(CollectionError::Unsupported("upsert".to_string()));
    }
    Ok(())
}

fn into_stream(documents: Vec<Document>) -> DocumentStream {
    futures::stream::iter(documents.into_iter().map(Ok)).boxed()
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(
        &self,
        filter: Option<Document>,
        options: Option<FindOptions>,
    ) -> Result<DocumentStream, CollectionError> {
        self.record(RecordedCall::new(Operation::Find).filter(filter.as_ref()));

        let mut selected = self.select(filter.as_ref())?;
        if let Some(options) = options {
            if let Some(sort) = options.sort.as_ref() {
                sort_documents(&mut selected, sort)?;
            }
            let skip = options.skip.unwrap_or(0) as usize;
            let limit = options.limit.map(|l| l.unsigned_abs() as usize).filter(|l| *l > 0);
            selected = selected
                .into_iter()
                .skip(skip)
                .take(limit.unwrap_or(usize::MAX))
                .collect();
        }

        Ok(into_stream(selected))
    }

    async fn find_one(
        &self,
        filter: Option<Document>,
        options: Option<FindOneOptions>,
    ) -> Result<Option<Document>, CollectionError> {
        self.record(RecordedCall::new(Operation::FindOne).filter(filter.as_ref()));

        let mut selected = self.select(filter.as_ref())?;
        let mut skip = 0;
        if let Some(options) = options {
            if let Some(sort) = options.sort.as_ref() {
                sort_documents(&mut selected, sort)?;
            }
            skip = options.skip.unwrap_or(0) as usize;
        }

        Ok(selected.into_iter().nth(skip))
    }

    async fn update_one(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, CollectionError> {
        self.record(RecordedCall::new(Operation::UpdateOne).filter(Some(&filter)).update(&update));
        self.update_matching(&filter, &update, options.as_ref(), false)
    }

    async fn update_many(
        &self,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateOutcome, CollectionError> {
        self.record(RecordedCall::new(Operation::UpdateMany).filter(Some(&filter)).update(&update));
        self.update_matching(&filter, &update, options.as_ref(), true)
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> Result<Option<Document>, CollectionError> {
        self.record(
            RecordedCall::new(Operation::FindOneAndUpdate)
                .filter(Some(&filter))
                .update(&update),
        );

        let options = options.unwrap_or_default();
        reject_upsert(options.upsert)?;
        let return_after = matches!(options.return_document, Some(ReturnDocument::After));

        let mut documents = self.documents.write();

        let mut candidates = Vec::new();
        for (position, document) in documents.iter().enumerate() {
            if matches(document, &filter)? {
                candidates.push((position, document.clone()));
            }
        }
        if let Some(sort) = options.sort.as_ref() {
            let mut ordered: Vec<Document> = candidates.iter().map(|(_, d)| d.clone()).collect();
            sort_documents(&mut ordered, sort)?;
            if let Some(first) = ordered.first() {
                candidates.retain(|(_, d)| d == first);
            }
        }

        let Some((position, before)) = candidates.into_iter().next() else {
            return Ok(None);
        };

        let target = &mut documents[position];
        apply_update(target, &update)?;

        Ok(Some(if return_after { target.clone() } else { before }))
    }

    async fn insert_one(
        &self,
        document: Document,
        _options: Option<InsertOneOptions>,
    ) -> Result<InsertOneOutcome, CollectionError> {
        self.record(RecordedCall::new(Operation::InsertOne));
        let inserted_id = self.insert(document)?;
        Ok(InsertOneOutcome { inserted_id })
    }

    async fn insert_many(
        &self,
        documents: Vec<Document>,
        _options: Option<InsertManyOptions>,
    ) -> Result<InsertManyOutcome, CollectionError> {
        self.record(RecordedCall::new(Operation::InsertMany));

        let mut inserted_ids = HashMap::with_capacity(documents.len());
        for (position, document) in documents.into_iter().enumerate() {
            inserted_ids.insert(position, self.insert(document)?);
        }

        Ok(InsertManyOutcome { inserted_ids })
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        _options: Option<AggregateOptions>,
    ) -> Result<DocumentStream, CollectionError> {
        let mut call = RecordedCall::new(Operation::Aggregate);
        call.pipeline = Some(pipeline.clone());
        self.record(call);

        let results = run_pipeline(self.documents(), &pipeline)?;
        Ok(into_stream(results))
    }

    async fn count_documents(
        &self,
        filter: Option<Document>,
        _options: Option<CountOptions>,
    ) -> Result<u64, CollectionError> {
        self.record(RecordedCall::new(Operation::CountDocuments).filter(filter.as_ref()));
        Ok(self.select(filter.as_ref())?.len() as u64)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSpec>, CollectionError> {
        self.record(RecordedCall::new(Operation::ListIndexes));
        Ok(self.indexes.read().clone())
    }

    async fn create_index(&self, index: IndexSpec) -> Result<String, CollectionError> {
        self.record(RecordedCall::new(Operation::CreateIndex));

        let mut indexes = self.indexes.write();
        if let Some(existing) = indexes.iter().find(|existing| existing.name == index.name) {
            if existing.keys != index.keys || existing.unique != index.unique {
                return Err(CollectionError::DuplicateKey(format!(
                    "index {} already exists with different options",
                    index.name
                )));
            }
            return Ok(index.name);
        }

        let name = index.name.clone();
        indexes.push(index);
        Ok(name)
    }

    async fn drop_index(&self, name: &str) -> Result<(), CollectionError> {
        self.record(RecordedCall::new(Operation::DropIndex));

        if name == "_id_" {
            return Err(CollectionError::Unsupported("cannot drop _id index".to_string()));
        }

        let mut indexes = self.indexes.write();
        let before = indexes.len();
        indexes.retain(|index| index.name != name);
        if indexes.len() == before {
            return Err(CollectionError::IndexNotFound(name.to_string()));
        }
        Ok(())
    }
}
