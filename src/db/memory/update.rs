

use bson::{Bson, Document};

use crate::db::CollectionError;
use crate::utils::bson_type_name;


/// Applies an operator-style update in place. Returns whether the document
/// changed; on error the document is left untouched.
pub fn apply_update(document: &mut Document, update: &Document) -> Result<bool, CollectionError> {
    if update.is_empty() {
        return Err(CollectionError::InvalidUpdate("update document must not be empty".to_string()));
    }

    let mut working = document.clone();

    for (operator, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(CollectionError::InvalidUpdate(format!(
                "{} needs an object, got {}",
                operator,
                bson_type_name(fields)
            )));
        };

        for (path, value) in fields {
            if path == "_id" || path.starts_with("_id.") {
                return Err(CollectionError::InvalidUpdate(
                    "performing an update on the path '_id' would modify the immutable field '_id'".to_string(),
                ));
            }

            match operator.as_str() {
                "$set" => set_path(&mut working, path, value.clone())?,
                "$unset" => unset_path(&mut working, path),
                "$inc" => increment_path(&mut working, path, value)?,
                other if other.starts_with('$') => {
                    return Err(CollectionError::Unsupported(format!("update operator {}", other)));
                }
                _ => {
                    return Err(CollectionError::InvalidUpdate(
                        "replacement documents are not accepted, use update operators".to_string(),
                    ));
                }
            }
        }
    }

    let modified = working != *document;
    *document = working;
    Ok(modified)
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> Result<(), CollectionError> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                other => Err(CollectionError::InvalidUpdate(format!(
                    "cannot create field '{}' in element of type {}",
                    rest,
                    other.map_or("missing", |v| bson_type_name(v))
                ))),
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = document.get_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}

fn increment_path(document: &mut Document, path: &str, delta: &Bson) -> Result<(), CollectionError> {
    let current = super::matcher::lookup(document, path).cloned();

    let next = match (current, delta) {
        (None, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => delta.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(i64::from(a) + i64::from(*b))),
        (Some(Bson::Int32(a)), Bson::Int64(b)) => Bson::Int64(checked_long(path, i64::from(a), *b)?),
        (Some(Bson::Int64(a)), Bson::Int32(b)) => Bson::Int64(checked_long(path, a, i64::from(*b))?),
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(checked_long(path, a, *b)?),
        (Some(current), delta) => match (crate::utils::as_f64(&current), crate::utils::as_f64(delta)) {
            (Some(a), Some(b)) => Bson::Double(a + b),
            _ => {
                return Err(CollectionError::InvalidUpdate(format!(
                    "cannot apply $inc of {} to {}",
                    bson_type_name(delta),
                    bson_type_name(&current)
                )));
            }
        },
        (None, other) => {
            return Err(CollectionError::InvalidUpdate(format!(
                "cannot increment with non-numeric argument of type {}",
                bson_type_name(other)
            )));
        }
    };

    set_path(document, path, next)
}

fn checked_long(path: &str, a: i64, b: i64) -> Result<i64, CollectionError> {
    a.checked_add(b).ok_or_else(|| {
        CollectionError::InvalidUpdate(format!("$inc on '{}' would overflow a 64-bit integer", path))
    })
}
