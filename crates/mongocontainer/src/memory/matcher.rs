//! Filter evaluation for the in-memory store
//!
//! Supports the common subset of MongoDB query syntax: implicit equality,
//! `$eq $ne $gt $gte $lt $lte $in $nin $exists` and the logical `$and $or
//! $nor`. Dotted paths descend into embedded documents and fan out across
//! arrays. Anything else is reported as a query error instead of silently
//! matching.

use bson::{Bson, Document as BsonDocument};
use mongocontainer_common::{ContainerError, Result};
use std::cmp::Ordering;

const MAX_PATH_DEPTH: usize = 32;

/// Returns true when `doc` satisfies `filter`
pub fn matches(doc: &BsonDocument, filter: &BsonDocument) -> Result<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for f in logical_branches(key, condition)? {
                    if !matches(doc, f)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for f in logical_branches(key, condition)? {
                    if matches(doc, f)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for f in logical_branches(key, condition)? {
                    if matches(doc, f)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            op if op.starts_with('$') => {
                return Err(ContainerError::Query(format!(
                    "Unsupported top-level operator: {}",
                    op
                )))
            }
            path => matches_field(&resolve_path(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn logical_branches<'a>(op: &str, condition: &'a Bson) -> Result<Vec<&'a BsonDocument>> {
    let Bson::Array(items) = condition else {
        return Err(ContainerError::Query(format!("{} requires an array", op)));
    };
    if items.is_empty() {
        return Err(ContainerError::Query(format!(
            "{} requires a non-empty array",
            op
        )));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Ok(d),
            _ => Err(ContainerError::Query(format!(
                "{} entries must be documents",
                op
            ))),
        })
        .collect()
}

/// True when the document is an operator expression such as `{ "$gt": 5 }`
pub(crate) fn is_operator_doc(doc: &BsonDocument) -> bool {
    doc.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn matches_field(values: &[&Bson], condition: &Bson) -> Result<bool> {
    match condition {
        Bson::Document(ops) if is_operator_doc(ops) => {
            for (op, operand) in ops {
                if !eval_operator(values, op, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        expected => Ok(equals_any(values, expected)),
    }
}

fn eval_operator(values: &[&Bson], op: &str, operand: &Bson) -> Result<bool> {
    let result = match op {
        "$eq" => equals_any(values, operand),
        "$ne" => !equals_any(values, operand),
        "$gt" => compare_any(values, operand, |o| o == Ordering::Greater),
        "$gte" => compare_any(values, operand, |o| o != Ordering::Less),
        "$lt" => compare_any(values, operand, |o| o == Ordering::Less),
        "$lte" => compare_any(values, operand, |o| o != Ordering::Greater),
        "$in" => in_set(values, op, operand)?,
        "$nin" => !in_set(values, op, operand)?,
        "$exists" => {
            let wanted = match operand {
                Bson::Boolean(b) => *b,
                Bson::Int32(i) => *i != 0,
                Bson::Int64(i) => *i != 0,
                _ => {
                    return Err(ContainerError::Query(
                        "$exists requires a boolean".to_string(),
                    ))
                }
            };
            values.is_empty() != wanted
        }
        other => {
            return Err(ContainerError::Query(format!(
                "Unsupported operator: {}",
                other
            )))
        }
    };
    Ok(result)
}

fn in_set(values: &[&Bson], op: &str, operand: &Bson) -> Result<bool> {
    let Bson::Array(candidates) = operand else {
        return Err(ContainerError::Query(format!("{} requires an array", op)));
    };
    Ok(candidates
        .iter()
        .any(|candidate| equals_any(values, candidate)))
}

/// Equality with MongoDB's array rule: an array field matches a scalar when
/// any element equals it. A missing field equals `null`.
fn equals_any(values: &[&Bson], expected: &Bson) -> bool {
    if values.is_empty() {
        return matches!(expected, Bson::Null);
    }
    values.iter().any(|v| match v {
        v if values_equal(v, expected) => true,
        Bson::Array(items) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    })
}

fn compare_any(values: &[&Bson], operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    values.iter().any(|v| match v {
        Bson::Array(items) if !matches!(operand, Bson::Array(_)) => items
            .iter()
            .any(|item| compare_bson(item, operand).is_some_and(&accept)),
        v => compare_bson(v, operand).is_some_and(&accept),
    })
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

pub(crate) fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Order two values of the same type class. Values of different classes do
/// not compare, so range operators never match across types.
fn compare_bson(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => Some((x.time, x.increment).cmp(&(y.time, y.increment))),
        _ => None,
    }
}

/// Resolve a dotted path such as `profile.address.city`
pub(crate) fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.').peekable();
    let mut current = doc;
    let mut depth = 0usize;
    while let Some(segment) = segments.next() {
        depth += 1;
        if depth > MAX_PATH_DEPTH {
            return None;
        }
        let value = current.get(segment)?;
        if segments.peek().is_none() {
            return Some(value);
        }
        match value {
            Bson::Document(inner) => current = inner,
            _ => return None,
        }
    }
    None
}

/// Resolve a dotted path for matching. Arrays along the way fan out: a
/// numeric segment indexes into the array, any other segment is looked up in
/// each embedded document. Every value reached is returned.
fn resolve_path<'a>(doc: &'a BsonDocument, path: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut found = Vec::new();
    if segments.len() <= MAX_PATH_DEPTH {
        resolve_in_doc(doc, &segments, &mut found);
    }
    found
}

fn resolve_in_doc<'a>(doc: &'a BsonDocument, segments: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if let Some(value) = doc.get(*head) {
        resolve_in_value(value, rest, found);
    }
}

fn resolve_in_value<'a>(value: &'a Bson, rest: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, tail)) = rest.split_first() else {
        found.push(value);
        return;
    };
    match value {
        Bson::Document(inner) => resolve_in_doc(inner, rest, found),
        Bson::Array(items) => {
            if let Ok(idx) = head.parse::<usize>() {
                if let Some(item) = items.get(idx) {
                    resolve_in_value(item, tail, found);
                }
            }
            for item in items {
                if let Bson::Document(inner) = item {
                    resolve_in_doc(inner, rest, found);
                }
            }
        }
        _ => {}
    }
}
