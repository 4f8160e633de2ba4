pub mod filter;
pub mod middleware;
pub mod models;
pub mod pipeline;


pub use filter::FieldNames;
pub use middleware::{IndexView, SoftDeleteCollection, SoftDeleteStore};
pub use models::SoftDeleteMarker;
pub use pipeline::Pipeline;
