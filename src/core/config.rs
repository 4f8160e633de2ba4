

use std::path::Path;

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};

use super::error::Result;
use crate::deletion::FieldNames;
use crate::{DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_MONGO_URI};


const ENV_PREFIX: &str = "SOFTDELETE";


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftDeleteConfig {

    pub mongo_uri: String,
    pub database: String,
    pub collection: String,
    pub app_name: Option<String>,


    pub fields: FieldNames,
}

impl SoftDeleteConfig {

    pub fn new(mongo_uri: &str, database: &str, collection: &str) -> Self {
        Self {
            mongo_uri: mongo_uri.to_string(),
            database: database.to_string(),
            collection: collection.to_string(),
            app_name: None,
            fields: FieldNames::default(),
        }
    }


    pub fn from_env() -> Self {
        let mut config = Self::new(
            &std::env::var("SOFTDELETE_MONGO_URI").unwrap_or_else(|_| DEFAULT_MONGO_URI.to_string()),
            &std::env::var("SOFTDELETE_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            &std::env::var("SOFTDELETE_COLLECTION").unwrap_or_else(|_| DEFAULT_COLLECTION.to_string()),
        );

        if let Ok(app_name) = std::env::var("SOFTDELETE_APP_NAME") {
            config.app_name = Some(app_name);
        }

        config
    }

    /// Layers defaults, an optional TOML file and `SOFTDELETE_*` environment
    /// variables. Nested keys use `__`, e.g. `SOFTDELETE_FIELDS__DELETED_AT`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }
        Self::finish(builder)
    }


    pub fn from_toml(contents: &str) -> Result<Self> {
        Self::finish(Config::builder().add_source(File::from_str(contents, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// `database.collection`, used in log lines.
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

impl Default for SoftDeleteConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MONGO_URI, DEFAULT_DATABASE, DEFAULT_COLLECTION)
    }
}
