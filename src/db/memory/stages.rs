

use std::cmp::Ordering;

use bson::{Bson, Document};

use super::matcher::{compare_values, lookup, matches};
use crate::db::CollectionError;
use crate::utils::{as_i64, bson_type_name};


pub fn run_pipeline(mut documents: Vec<Document>, pipeline: &[Document]) -> Result<Vec<Document>, CollectionError> {
    for stage in pipeline {
        let mut entries = stage.iter();
        let (name, spec) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(CollectionError::InvalidFilter(
                    "a pipeline stage specification object must contain exactly one field".to_string(),
                ));
            }
        };

        documents = match name.as_str() {
            "$match" => {
                let filter = stage_document(name, spec)?;
                let mut kept = Vec::with_capacity(documents.len());
                for document in documents {
                    if matches(&document, filter)? {
                        kept.push(document);
                    }
                }
                kept
            }
            "$skip" => {
                let count = stage_count(name, spec)?;
                documents.into_iter().skip(count).collect()
            }
            "$limit" => {
                let count = stage_count(name, spec)?;
                if count == 0 {
                    return Err(CollectionError::InvalidFilter("the limit must be positive".to_string()));
                }
                documents.into_iter().take(count).collect()
            }
            "$sort" => {
                sort_documents(&mut documents, stage_document(name, spec)?)?;
                documents
            }
            "$count" => {
                let Bson::String(field) = spec else {
                    return Err(CollectionError::InvalidFilter("$count needs a field name".to_string()));
                };
                if documents.is_empty() {
                    Vec::new()
                } else {
                    let mut counted = Document::new();
                    counted.insert(field.as_str(), documents.len() as i32);
                    vec![counted]
                }
            }
            other => return Err(CollectionError::Unsupported(format!("aggregation stage {}", other))),
        };
    }

    Ok(documents)
}


/// Sorts by a `{ field: 1 | -1 }` specification. Missing fields sort first.
pub fn sort_documents(documents: &mut [Document], spec: &Document) -> Result<(), CollectionError> {
    let mut keys = Vec::with_capacity(spec.len());
    for (field, direction) in spec {
        let descending = match as_i64(direction) {
            Some(1) => false,
            Some(-1) => true,
            _ => {
                return Err(CollectionError::InvalidFilter(format!(
                    "$sort key ordering for {} must be 1 or -1",
                    field
                )));
            }
        };
        keys.push((field.as_str(), descending));
    }

    documents.sort_by(|a, b| {
        for (field, descending) in &keys {
            let ordering = match (lookup(a, field), lookup(b, field)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            };
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    Ok(())
}

fn stage_document<'a>(name: &str, spec: &'a Bson) -> Result<&'a Document, CollectionError> {
    match spec {
        Bson::Document(inner) => Ok(inner),
        other => Err(CollectionError::InvalidFilter(format!(
            "{} needs an object, got {}",
            name,
            bson_type_name(other)
        ))),
    }
}

fn stage_count(name: &str, spec: &Bson) -> Result<usize, CollectionError> {
    as_i64(spec)
        .filter(|count| *count >= 0)
        .map(|count| count as usize)
        .ok_or_else(|| CollectionError::InvalidFilter(format!("{} needs a non-negative integer", name)))
}
