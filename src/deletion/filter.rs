

use bson::{Bson, DateTime, Document, doc};
use serde::{Deserialize, Serialize};


/// Names of the soft-delete fields inside stored documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub deleted: String,
    pub deleted_at: String,
    pub deleted_by: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            deleted: "deleted".to_string(),
            deleted_at: "deletedAt".to_string(),
            deleted_by: "deletedBy".to_string(),
        }
    }
}

impl FieldNames {

    /// `{deleted: {$ne: true}}`. Matches documents where the flag is false or absent.
    pub fn not_deleted(&self) -> Document {
        let mut clause = Document::new();
        clause.insert(self.deleted.as_str(), doc! { "$ne": true });
        clause
    }

    /// AND of the caller's filter and [`Self::not_deleted`]. The caller's
    /// filter is wrapped whole, never inspected.
    pub fn exclude_deleted(&self, filter: Option<Document>) -> Document {
        match filter {
            None => self.not_deleted(),
            Some(filter) => doc! { "$and": [filter, self.not_deleted()] },
        }
    }

    /// Flat `{_id: id, deleted: {$ne: true}}`.
    pub fn active_by_id(&self, id: Bson) -> Document {
        let mut filter = doc! { "_id": id };
        filter.insert(self.deleted.as_str(), doc! { "$ne": true });
        filter
    }


    pub fn match_stage(&self) -> Document {
        doc! { "$match": self.not_deleted() }
    }

    /// `$set` payload flagging documents deleted at `at`, by `deleted_by` when given.
    /// A null or empty-string actor counts as absent.
    pub fn soft_delete_update(&self, deleted_by: Option<Bson>, at: DateTime) -> Document {
        let mut payload = Document::new();
        payload.insert(self.deleted.as_str(), true);
        payload.insert(self.deleted_at.as_str(), at);

        match deleted_by {
            None | Some(Bson::Null) => {}
            Some(Bson::String(actor)) if actor.is_empty() => {}
            Some(actor) => {
                payload.insert(self.deleted_by.as_str(), actor);
            }
        }

        doc! { "$set": payload }
    }
}
