//! The capability interface shared by the real handle and the in-memory fake

use async_trait::async_trait;
use bson::Document as BsonDocument;
use mongocontainer_common::Result;

use crate::context::OpContext;
use crate::result::SingleResult;

/// Four document operations, nothing more.
///
/// Code that only needs these operations should depend on this trait
/// (usually as `Arc<dyn DocumentStore>`) so it can run against
/// [`crate::MemoryStore`] in tests and [`crate::MongoHandle`] in production.
///
/// All operations fail with [`mongocontainer_common::ContainerError::Closed`]
/// once [`DocumentStore::disconnect`] has been called.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find at most one document in `collection` matching `filter`.
    ///
    /// No ordering is applied when several documents match.
    async fn find_one(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: BsonDocument,
    ) -> Result<SingleResult>;

    /// Apply `update` to the first document matching `filter`, inserting a
    /// new document when nothing matches.
    ///
    /// Always returns the document as it exists after the write.
    async fn upsert(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<SingleResult>;

    /// Atomically remove at most one document matching `filter`, returning
    /// its content before deletion.
    async fn find_one_and_delete(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: BsonDocument,
    ) -> Result<SingleResult>;

    /// Release the underlying connection. Calling it again is a no-op.
    async fn disconnect(&self, ctx: &OpContext) -> Result<()>;
}
