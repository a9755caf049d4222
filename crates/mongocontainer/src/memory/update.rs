//! Update operators for the in-memory store

use bson::{Bson, Document as BsonDocument};
use mongocontainer_common::{ContainerError, Result};

use super::matcher::get_path;

/// Reject updates the driver would refuse for find-and-modify: empty
/// documents and replacement-style documents without `$` operators.
pub fn validate_update(update: &BsonDocument) -> Result<()> {
    if update.is_empty() {
        return Err(ContainerError::Validation(
            "Update document cannot be empty".to_string(),
        ));
    }
    if let Some(key) = update.keys().find(|k| !k.starts_with('$')) {
        return Err(ContainerError::Validation(format!(
            "Update document must contain only update operators, found '{}'",
            key
        )));
    }
    Ok(())
}

/// Apply `update` to `doc` in place.
///
/// `$setOnInsert` only takes effect when `inserting` is true.
pub fn apply_update(doc: &mut BsonDocument, update: &BsonDocument, inserting: bool) -> Result<()> {
    validate_update(update)?;

    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(ContainerError::Query(format!(
                "{} requires a document of fields",
                op
            )));
        };

        match op.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(doc, path, value.clone())?;
                }
            }
            "$setOnInsert" => {
                if inserting {
                    for (path, value) in fields {
                        set_path(doc, path, value.clone())?;
                    }
                }
            }
            "$unset" => {
                for (path, _) in fields {
                    unset_path(doc, path)?;
                }
            }
            "$inc" => {
                for (path, by) in fields {
                    inc_path(doc, path, by)?;
                }
            }
            "$push" => {
                for (path, value) in fields {
                    push_path(doc, path, value.clone())?;
                }
            }
            other => {
                return Err(ContainerError::Query(format!(
                    "Unsupported update operator: {}",
                    other
                )))
            }
        }
    }
    Ok(())
}

/// Walk to the parent document of `path`, creating intermediate documents
fn parent_mut<'a>(doc: &'a mut BsonDocument, path: &str) -> Result<(&'a mut BsonDocument, String)> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(ContainerError::Query(format!(
            "Invalid field path: '{}'",
            path
        )));
    }

    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments.pop().unwrap_or_default().to_string();

    let mut current = doc;
    for segment in segments {
        if !current.contains_key(segment) {
            current.insert(segment, BsonDocument::new());
        }
        current = match current.get_mut(segment) {
            Some(Bson::Document(inner)) => inner,
            _ => {
                return Err(ContainerError::Query(format!(
                    "Cannot create field '{}': '{}' is not a document",
                    path, segment
                )))
            }
        };
    }
    Ok((current, last))
}

pub(crate) fn set_path(doc: &mut BsonDocument, path: &str, value: Bson) -> Result<()> {
    let (parent, last) = parent_mut(doc, path)?;
    parent.insert(last, value);
    Ok(())
}

fn unset_path(doc: &mut BsonDocument, path: &str) -> Result<()> {
    // unsetting below a missing parent is a no-op, not an insert
    if let Some((parent_path, _)) = path.rsplit_once('.') {
        if !matches!(get_path(doc, parent_path), Some(Bson::Document(_))) {
            return Ok(());
        }
    }
    let (parent, last) = parent_mut(doc, path)?;
    parent.remove(&last);
    Ok(())
}

fn inc_path(doc: &mut BsonDocument, path: &str, by: &Bson) -> Result<()> {
    if !matches!(by, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) {
        return Err(ContainerError::Query(format!(
            "Cannot increment '{}' by a non-numeric value",
            path
        )));
    }

    let next = match get_path(doc, path) {
        None => by.clone(),
        Some(current) => add_numbers(current, by).ok_or_else(|| {
            ContainerError::Query(format!(
                "Cannot apply $inc to non-numeric field '{}'",
                path
            ))
        })??,
    };
    set_path(doc, path, next)
}

/// Add two numeric values, keeping integer types when both sides are integers.
/// Returns `None` when `current` is not numeric.
fn add_numbers(current: &Bson, by: &Bson) -> Option<Result<Bson>> {
    let overflow = || ContainerError::Query("Integer overflow in $inc".to_string());
    let sum = match (current, by) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Ok(Bson::Int32(sum)),
            None => Ok(Bson::Int64(i64::from(*a) + i64::from(*b))),
        },
        (Bson::Int32(a), Bson::Int64(b)) => i64::from(*a).checked_add(*b).map(Bson::Int64).ok_or_else(overflow),
        (Bson::Int64(a), Bson::Int32(b)) => a.checked_add(i64::from(*b)).map(Bson::Int64).ok_or_else(overflow),
        (Bson::Int64(a), Bson::Int64(b)) => a.checked_add(*b).map(Bson::Int64).ok_or_else(overflow),
        (Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_), _) => {
            Ok(Bson::Double(to_f64(current)? + to_f64(by)?))
        }
        _ => return None,
    };
    Some(sum)
}

fn to_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

fn push_path(doc: &mut BsonDocument, path: &str, value: Bson) -> Result<()> {
    let (parent, last) = parent_mut(doc, path)?;
    match parent.get_mut(&last) {
        None => {
            parent.insert(last, Bson::Array(vec![value]));
            Ok(())
        }
        Some(Bson::Array(items)) => {
            items.push(value);
            Ok(())
        }
        Some(_) => Err(ContainerError::Query(format!(
            "Cannot apply $push to non-array field '{}'",
            path
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_set_and_nested_set() {
        let mut d = doc! { "id": "1" };
        apply_update(&mut d, &doc! { "$set": { "name": "Alice", "profile.city": "Porto" } }, false).unwrap();
        assert_eq!(d, doc! { "id": "1", "name": "Alice", "profile": { "city": "Porto" } });
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut d = doc! { "profile": "flat" };
        let result = apply_update(&mut d, &doc! { "$set": { "profile.city": "Porto" } }, false);
        assert!(matches!(result, Err(ContainerError::Query(_))));
    }

    #[test]
    fn test_set_on_insert_only_when_inserting() {
        let update = doc! { "$setOnInsert": { "created": true } };

        let mut existing = doc! { "id": "1" };
        apply_update(&mut existing, &update, false).unwrap();
        assert!(!existing.contains_key("created"));

        let mut fresh = doc! { "id": "1" };
        apply_update(&mut fresh, &update, true).unwrap();
        assert!(fresh.get_bool("created").unwrap());
    }

    #[test]
    fn test_unset() {
        let mut d = doc! { "a": 1, "b": { "c": 2, "d": 3 } };
        apply_update(&mut d, &doc! { "$unset": { "a": "", "b.c": "", "x.y": "" } }, false).unwrap();
        assert_eq!(d, doc! { "b": { "d": 3 } });
    }

    #[test]
    fn test_inc_keeps_integer_types() {
        let mut d = doc! { "count": 1, "big": 10_i64 };
        apply_update(&mut d, &doc! { "$inc": { "count": 2, "big": 5, "fresh": 3 } }, false).unwrap();
        assert_eq!(d.get_i32("count").unwrap(), 3);
        assert_eq!(d.get_i64("big").unwrap(), 15);
        assert_eq!(d.get_i32("fresh").unwrap(), 3);
    }

    #[test]
    fn test_inc_promotes_on_overflow_and_double() {
        let mut d = doc! { "n": i32::MAX, "score": 1 };
        apply_update(&mut d, &doc! { "$inc": { "n": 1, "score": 0.5 } }, false).unwrap();
        assert_eq!(d.get_i64("n").unwrap(), i64::from(i32::MAX) + 1);
        assert_eq!(d.get_f64("score").unwrap(), 1.5);
    }

    #[test]
    fn test_inc_non_numeric_fails() {
        let mut d = doc! { "name": "Alice" };
        let result = apply_update(&mut d, &doc! { "$inc": { "name": 1 } }, false);
        assert!(matches!(result, Err(ContainerError::Query(_))));

        let result = apply_update(&mut d, &doc! { "$inc": { "count": "1" } }, false);
        assert!(matches!(result, Err(ContainerError::Query(_))));
    }

    #[test]
    fn test_push() {
        let mut d = doc! { "tags": ["a"] };
        apply_update(&mut d, &doc! { "$push": { "tags": "b", "log": 1 } }, false).unwrap();
        assert_eq!(d, doc! { "tags": ["a", "b"], "log": [1] });
    }

    #[test]
    fn test_replacement_document_rejected() {
        let mut d = doc! {};
        let result = apply_update(&mut d, &doc! { "name": "Alice" }, false);
        assert!(matches!(result, Err(ContainerError::Validation(_))));
    }

    #[test]
    fn test_empty_update_rejected() {
        assert!(matches!(
            validate_update(&doc! {}),
            Err(ContainerError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let mut d = doc! {};
        let result = apply_update(&mut d, &doc! { "$rename": { "a": "b" } }, false);
        assert!(matches!(result, Err(ContainerError::Query(_))));
    }

    #[test]
    fn test_invalid_path_rejected() {
        let mut d = doc! {};
        let result = apply_update(&mut d, &doc! { "$set": { "a..b": 1 } }, false);
        assert!(matches!(result, Err(ContainerError::Query(_))));
    }
}
