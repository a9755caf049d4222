//! In-memory [`DocumentStore`] for tests
//!
//! `MemoryStore` keeps named collections of BSON documents behind a mutex and
//! evaluates filters and updates with the subset of MongoDB semantics the
//! adapter's callers rely on. It follows the same lifecycle as
//! [`crate::MongoHandle`]: clones share state, operations honor the
//! [`OpContext`], and everything fails with `Closed` after disconnect.

pub mod matcher;
pub mod update;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document as BsonDocument};
use mongocontainer_common::{ContainerError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::context::OpContext;
use crate::result::SingleResult;
use crate::store::DocumentStore;
use crate::validation::ValidatedCollectionName;

use self::matcher::{is_operator_doc, matches, values_equal};
use self::update::{apply_update, set_path, validate_update};

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, Vec<BsonDocument>>,
    closed: bool,
}

/// Shared in-process document store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection directly, bypassing filters and updates.
    ///
    /// Documents without `_id` get a fresh ObjectId.
    pub fn insert(&self, collection: &str, document: BsonDocument) -> Result<()> {
        let name = ValidatedCollectionName::new(collection)?;
        let mut state = self.state.lock();
        if state.closed {
            return Err(ContainerError::Closed);
        }
        state
            .collections
            .entry(name.as_str().to_string())
            .or_default()
            .push(with_id(document));
        Ok(())
    }

    /// Number of documents currently stored in `collection`
    pub fn len(&self, collection: &str) -> usize {
        self.state
            .lock()
            .collections
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Run `f` against the collection map with the lock held.
    ///
    /// Checks happen in the same order as on the real handle: closed state,
    /// collection name, then the caller's context. `f` receives the validated
    /// name; collections only come into being when `f` inserts one.
    fn with_collections<T>(
        &self,
        ctx: &OpContext,
        operation: &str,
        collection: &str,
        f: impl FnOnce(&mut HashMap<String, Vec<BsonDocument>>, &str) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ContainerError::Closed);
        }
        let name = ValidatedCollectionName::new(collection)?;
        ctx.check(operation)?;
        f(&mut state.collections, name.as_str())
    }

    /// Number of collections that currently exist
    pub fn collection_count(&self) -> usize {
        self.state.lock().collections.len()
    }
}

/// Put an `_id` first if the document lacks one, like the server does on insert
fn with_id(document: BsonDocument) -> BsonDocument {
    if document.contains_key("_id") {
        return document;
    }
    let mut out = BsonDocument::new();
    out.insert("_id", ObjectId::new());
    for (key, value) in document {
        out.insert(key, value);
    }
    out
}

fn position(docs: &[BsonDocument], filter: &BsonDocument) -> Result<Option<usize>> {
    for (idx, doc) in docs.iter().enumerate() {
        if matches(doc, filter)? {
            return Ok(Some(idx));
        }
    }
    Ok(None)
}

/// Build the document an upsert starts from when nothing matched: the
/// filter's equality conditions, including `$eq` and `$and` branches.
fn seed_from_filter(filter: &BsonDocument) -> Result<BsonDocument> {
    let mut seed = BsonDocument::new();
    collect_equalities(filter, &mut seed)?;
    Ok(seed)
}

fn collect_equalities(filter: &BsonDocument, seed: &mut BsonDocument) -> Result<()> {
    for (key, condition) in filter {
        if key == "$and" {
            if let Bson::Array(branches) = condition {
                for branch in branches {
                    if let Bson::Document(branch) = branch {
                        collect_equalities(branch, seed)?;
                    }
                }
            }
            continue;
        }
        if key.starts_with('$') {
            continue;
        }
        match condition {
            Bson::Document(ops) if is_operator_doc(ops) => {
                if let Some(value) = ops.get("$eq") {
                    set_path(seed, key, value.clone())?;
                }
            }
            value => set_path(seed, key, value.clone())?,
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: BsonDocument,
    ) -> Result<SingleResult> {
        self.with_collections(ctx, "find_one", collection, |collections, name| {
            let found = match collections.get(name) {
                Some(docs) => position(docs, &filter)?.map(|idx| docs[idx].clone()),
                None => None,
            };
            debug!(collection, found = found.is_some(), "find_one completed");
            Ok(SingleResult::from(found))
        })
    }

    async fn upsert(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<SingleResult> {
        self.with_collections(ctx, "upsert", collection, |collections, name| {
            validate_update(&update)?;
            if let Some(docs) = collections.get_mut(name) {
                if let Some(idx) = position(docs, &filter)? {
                    let mut updated = docs[idx].clone();
                    apply_update(&mut updated, &update, false)?;
                    let id_changed = match (docs[idx].get("_id"), updated.get("_id")) {
                        (Some(before), Some(after)) => !values_equal(before, after),
                        (before, after) => before.is_some() != after.is_some(),
                    };
                    if id_changed {
                        return Err(ContainerError::Query(
                            "Performing an update on the path '_id' would modify the immutable field '_id'"
                                .to_string(),
                        ));
                    }
                    docs[idx] = updated.clone();
                    debug!(collection, inserted = false, "upsert completed");
                    return Ok(SingleResult::found(updated));
                }
            }

            let mut created = seed_from_filter(&filter)?;
            apply_update(&mut created, &update, true)?;
            let created = with_id(created);
            collections
                .entry(name.to_string())
                .or_default()
                .push(created.clone());
            debug!(collection, inserted = true, "upsert completed");
            Ok(SingleResult::found(created))
        })
    }

    async fn find_one_and_delete(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: BsonDocument,
    ) -> Result<SingleResult> {
        self.with_collections(ctx, "find_one_and_delete", collection, |collections, name| {
            let deleted = match collections.get_mut(name) {
                Some(docs) => position(docs, &filter)?.map(|idx| docs.remove(idx)),
                None => None,
            };
            debug!(collection, deleted = deleted.is_some(), "find_one_and_delete completed");
            Ok(SingleResult::from(deleted))
        })
    }

    async fn disconnect(&self, ctx: &OpContext) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
        }
        debug!("Memory store closed");
        // closed even when the caller's context has already run out
        ctx.check("disconnect")
            .map_err(|e| ContainerError::Disconnect(e.to_string()))
    }
}
