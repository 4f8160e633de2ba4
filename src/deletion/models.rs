use bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};

/// Soft-delete fields to embed in stored documents with `#[serde(flatten)]`.
/// Absent and `false` both mean the document is active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftDeleteMarker {
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<Bson>,
}

impl SoftDeleteMarker {
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
