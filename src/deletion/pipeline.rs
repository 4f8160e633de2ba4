use bson::{Array, Bson, Document};

use crate::core::error::{Result, SoftDeleteError};
use crate::utils::bson_type_name;

/// Aggregation pipeline in one of the accepted shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Pipeline {
    /// Sequence of stage documents.
    Stages(Vec<Document>),
    /// A lone stage document.
    Stage(Document),
    /// Explicit BSON array; every element must be a stage document.
    Array(Array),
}

impl Pipeline {
    pub fn into_stages(self) -> Result<Vec<Document>> {
        match self {
            Self::Stages(stages) => Ok(stages),
            Self::Stage(stage) => Ok(vec![stage]),
            Self::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Bson::Document(stage) => Ok(stage),
                    other => Err(SoftDeleteError::InvalidStage {
                        index,
                        actual: bson_type_name(&other).to_string(),
                    }),
                })
                .collect(),
        }
    }

    /// Stages with `first` in front of the caller's stages.
    pub fn prepend(self, first: Document) -> Result<Vec<Document>> {
        let stages = self.into_stages()?;
        let mut extended = Vec::with_capacity(stages.len() + 1);
        extended.push(first);
        extended.extend(stages);
        Ok(extended)
    }
}

impl From<Vec<Document>> for Pipeline {
    fn from(stages: Vec<Document>) -> Self {
        Self::Stages(stages)
    }
}

impl From<Document> for Pipeline {
    fn from(stage: Document) -> Self {
        Self::Stage(stage)
    }
}

impl From<Array> for Pipeline {
    fn from(items: Array) -> Self {
        Self::Array(items)
    }
}

impl TryFrom<Bson> for Pipeline {
    type Error = SoftDeleteError;

    fn try_from(value: Bson) -> Result<Self> {
        match value {
            Bson::Document(stage) => Ok(Self::Stage(stage)),
            Bson::Array(items) => Ok(Self::Array(items)),
            other => Err(SoftDeleteError::UnsupportedPipeline(bson_type_name(&other).to_string())),
        }
    }
}
