

pub mod config;
pub mod error;

pub use self::config::SoftDeleteConfig;
pub use self::error::{Result, SoftDeleteError};
