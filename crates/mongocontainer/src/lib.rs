//! Narrow MongoDB adapter for mongocontainer
//!
//! Exposes four document operations through the [`DocumentStore`] trait:
//! find-one, upsert, find-one-and-delete and disconnect. [`MongoHandle`]
//! forwards them to the MongoDB driver; [`MemoryStore`] implements the same
//! trait in process so callers can be tested without a server.
//!
//! Every operation takes an [`OpContext`] carrying the caller's deadline and
//! cancellation token.
//!
//! ```ignore
//! use bson::doc;
//! use mongocontainer::{setup, DocumentStore, OpContext};
//!
//! let handle = setup("mongodb://localhost:27017", "app").await?;
//! let ctx = OpContext::with_timeout(std::time::Duration::from_secs(5));
//! let user = handle
//!     .upsert(&ctx, "users", doc! { "id": "1" }, doc! { "$set": { "name": "Alice" } })
//!     .await?;
//! handle.disconnect(&ctx).await?;
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod handle;
pub mod memory;
pub mod result;
pub mod store;
pub mod validation;

pub use config::ContainerConfig;
pub use connection::{setup, setup_with_config};
pub use context::OpContext;
pub use handle::MongoHandle;
pub use memory::MemoryStore;
pub use mongocontainer_common::{ContainerError, Result};
pub use result::SingleResult;
pub use store::DocumentStore;
pub use validation::{ValidatedCollectionName, ValidatedDatabaseName};
