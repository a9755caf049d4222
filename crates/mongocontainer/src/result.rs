//! Single-document result handle

use bson::Document as BsonDocument;
use mongocontainer_common::{ContainerError, Result};
use serde::de::DeserializeOwned;

/// Outcome of a single-document operation: either a document or "not found".
///
/// Driver and context failures never end up here; they are returned as
/// `Err` by the operation itself. Decoding into a caller type is deferred to
/// [`SingleResult::decode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SingleResult {
    document: Option<BsonDocument>,
}

impl SingleResult {
    pub fn found(document: BsonDocument) -> Self {
        Self {
            document: Some(document),
        }
    }

    pub fn not_found() -> Self {
        Self { document: None }
    }

    pub fn is_found(&self) -> bool {
        self.document.is_some()
    }

    pub fn is_not_found(&self) -> bool {
        self.document.is_none()
    }

    /// Borrow the raw document, if any
    pub fn document(&self) -> Option<&BsonDocument> {
        self.document.as_ref()
    }

    pub fn into_document(self) -> Option<BsonDocument> {
        self.document
    }

    /// Take the document, treating "not found" as [`ContainerError::NoDocuments`]
    pub fn require(self) -> Result<BsonDocument> {
        self.document.ok_or(ContainerError::NoDocuments)
    }

    /// Decode the document into `T`. Returns `Ok(None)` when nothing matched.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.document {
            Some(doc) => bson::from_document(doc.clone())
                .map(Some)
                .map_err(|e| ContainerError::Deserialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Decode the document into `T`, failing with [`ContainerError::NoDocuments`]
    /// when nothing matched
    pub fn decode_required<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode()?.ok_or(ContainerError::NoDocuments)
    }
}

impl From<Option<BsonDocument>> for SingleResult {
    fn from(document: Option<BsonDocument>) -> Self {
        Self { document }
    }
}
