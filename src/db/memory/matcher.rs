//! Query-language subset evaluated by the in-memory collection.

use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::db::CollectionError;
use crate::utils::{as_f64, bson_type_name};


/// Resolves a dotted path (`address.city`) against a document.
pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }

    Some(current)
}


pub fn matches(document: &Document, filter: &Document) -> Result<bool, CollectionError> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => clauses(key, condition)?
                .iter()
                .map(|clause| matches(document, clause))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .all(|hit| hit),
            "$or" => clauses(key, condition)?
                .iter()
                .map(|clause| matches(document, clause))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .any(|hit| hit),
            "$nor" => !clauses(key, condition)?
                .iter()
                .map(|clause| matches(document, clause))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .any(|hit| hit),
            op if op.starts_with('$') => {
                return Err(CollectionError::InvalidFilter(format!("unknown top level operator: {}", op)));
            }
            field => matches_condition(lookup(document, field), condition)?,
        };

        if !satisfied {
            return Ok(false);
        }
    }

    Ok(true)
}

fn clauses<'a>(operator: &str, value: &'a Bson) -> Result<Vec<&'a Document>, CollectionError> {
    let items = match value {
        Bson::Array(items) if !items.is_empty() => items,
        other => {
            return Err(CollectionError::InvalidFilter(format!(
                "{} must be a nonempty array, got {}",
                operator,
                bson_type_name(other)
            )));
        }
    };

    items
        .iter()
        .map(|item| match item {
            Bson::Document(clause) => Ok(clause),
            other => Err(CollectionError::InvalidFilter(format!(
                "{} entries must be objects, got {}",
                operator,
                bson_type_name(other)
            ))),
        })
        .collect()
}

fn matches_condition(value: Option<&Bson>, condition: &Bson) -> Result<bool, CollectionError> {
    let operators = match condition {
        Bson::Document(inner) if inner.keys().next().is_some_and(|key| key.starts_with('$')) => inner,
        _ => return Ok(equals(value, condition)),
    };

    for (operator, operand) in operators {
        let satisfied = match operator.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compares(value, operand, |ord| ord == Ordering::Greater),
            "$gte" => compares(value, operand, |ord| ord != Ordering::Less),
            "$lt" => compares(value, operand, |ord| ord == Ordering::Less),
            "$lte" => compares(value, operand, |ord| ord != Ordering::Greater),
            "$in" => candidates(operator, operand)?.iter().any(|c| equals(value, c)),
            "$nin" => !candidates(operator, operand)?.iter().any(|c| equals(value, c)),
            "$exists" => value.is_some() == truthy(operand),
            "$not" => match operand {
                Bson::Document(_) => !matches_condition(value, operand)?,
                _ => return Err(CollectionError::InvalidFilter("$not needs a regex or a document".to_string())),
            },
            other => {
                return Err(CollectionError::InvalidFilter(format!("unknown operator: {}", other)));
            }
        };

        if !satisfied {
            return Ok(false);
        }
    }

    Ok(true)
}

fn candidates<'a>(operator: &str, operand: &'a Bson) -> Result<&'a Vec<Bson>, CollectionError> {
    match operand {
        Bson::Array(items) => Ok(items),
        other => Err(CollectionError::InvalidFilter(format!(
            "{} needs an array, got {}",
            operator,
            bson_type_name(other)
        ))),
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(flag) => *flag,
        Bson::Null | Bson::Undefined => false,
        other => as_f64(other).map_or(true, |n| n != 0.0),
    }
}

/// Missing fields compare equal to `null`; array fields match when any element does.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(actual) => {
            if scalar_eq(actual, expected) {
                return true;
            }
            match actual {
                Bson::Array(items) if !matches!(expected, Bson::Array(_)) => {
                    items.iter().any(|item| scalar_eq(item, expected))
                }
                _ => false,
            }
        }
    }
}

fn scalar_eq(actual: &Bson, expected: &Bson) -> bool {
    match (as_f64(actual), as_f64(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

fn compares(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(actual) = value else {
        return false;
    };

    match actual {
        Bson::Array(items) => items
            .iter()
            .any(|item| compare_values(item, operand).is_some_and(&accept)),
        _ => compare_values(actual, operand).is_some_and(accept),
    }
}

/// Ordering between two values of comparable BSON types; `None` across types.
pub fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
