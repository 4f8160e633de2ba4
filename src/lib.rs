

pub mod core;
pub mod db;
pub mod deletion;
pub mod utils;

pub use utils::bson_type_name;


pub use crate::core::config::SoftDeleteConfig;
pub use crate::core::error::{Result, SoftDeleteError};
pub use db::{CollectionError, DocumentCollection, MemoryCollection, MongoCollection};
pub use deletion::{FieldNames, IndexView, Pipeline, SoftDeleteCollection, SoftDeleteMarker, SoftDeleteStore};


pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";


pub const DEFAULT_DATABASE: &str = "app";


pub const DEFAULT_COLLECTION: &str = "documents";
