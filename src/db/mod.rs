

pub mod collection;
pub mod memory;
pub mod mongo;

pub use collection::{
    CollectionError, DocumentCollection, DocumentStream, IndexSpec, InsertManyOutcome,
    InsertOneOutcome, UpdateOutcome,
};
pub use memory::{MemoryCollection, Operation, RecordedCall};
pub use mongo::MongoCollection;
