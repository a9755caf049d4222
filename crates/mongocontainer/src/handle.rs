//! Driver-backed implementation of [`DocumentStore`]

use async_trait::async_trait;
use bson::{doc, Document as BsonDocument};
use mongocontainer_common::{ContainerError, Result};
use mongodb::{
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Client, Collection, Database,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::ContainerConfig;
use crate::connection;
use crate::context::OpContext;
use crate::result::SingleResult;
use crate::store::DocumentStore;
use crate::validation::ValidatedCollectionName;

struct Live {
    client: Client,
    database: Database,
}

/// Live client/database pair bound to one logical database.
///
/// Clones share the same connection: disconnecting through any clone closes
/// the handle for all of them. The driver client is safe for concurrent use,
/// so no extra synchronization is done around operations.
#[derive(Clone)]
pub struct MongoHandle {
    database_name: String,
    state: Arc<RwLock<Option<Live>>>,
}

impl std::fmt::Debug for MongoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoHandle")
            .field("database", &self.database_name)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl MongoHandle {
    pub(crate) fn from_parts(client: Client, database: Database) -> Self {
        Self {
            database_name: database.name().to_string(),
            state: Arc::new(RwLock::new(Some(Live { client, database }))),
        }
    }

    /// Connect with an explicit context and configuration.
    ///
    /// Same as [`connection::setup_with_config`].
    pub async fn connect(
        ctx: &OpContext,
        uri: &str,
        database: &str,
        config: &ContainerConfig,
    ) -> Result<Self> {
        connection::setup_with_config(ctx, uri, database, config).await
    }

    /// Get the bound database name
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// False once [`DocumentStore::disconnect`] has been called on any clone
    pub fn is_connected(&self) -> bool {
        self.state.read().is_some()
    }

    fn database(&self) -> Result<Database> {
        self.state
            .read()
            .as_ref()
            .map(|live| live.database.clone())
            .ok_or(ContainerError::Closed)
    }

    fn collection(&self, name: &str) -> Result<Collection<BsonDocument>> {
        let database = self.database()?;
        let name = ValidatedCollectionName::new(name)?;
        Ok(database.collection(name.as_str()))
    }

    /// Check that the server answers on the bound database
    #[instrument(skip(self, ctx))]
    pub async fn ping(&self, ctx: &OpContext) -> Result<()> {
        let database = self.database()?;
        ctx.run("ping", async move {
            database
                .run_command(doc! { "ping": 1 })
                .await
                .map(|_| ())
                .map_err(ContainerError::from)
        })
        .await
    }
}

fn upsert_options() -> FindOneAndUpdateOptions {
    let mut options = FindOneAndUpdateOptions::default();
    options.return_document = Some(ReturnDocument::After);
    options.upsert = Some(true);
    options
}

#[async_trait]
impl DocumentStore for MongoHandle {
    #[instrument(skip(self, ctx, filter), fields(collection = %collection))]
    async fn find_one(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: BsonDocument,
    ) -> Result<SingleResult> {
        let coll = self.collection(collection)?;
        let found = ctx
            .run("find_one", async move {
                coll.find_one(filter).await.map_err(ContainerError::from)
            })
            .await?;

        debug!(found = found.is_some(), "find_one completed");
        Ok(SingleResult::from(found))
    }

    #[instrument(skip(self, ctx, filter, update), fields(collection = %collection))]
    async fn upsert(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<SingleResult> {
        let coll = self.collection(collection)?;
        let written = ctx
            .run("upsert", async move {
                coll.find_one_and_update(filter, update)
                    .with_options(upsert_options())
                    .await
                    .map_err(ContainerError::from)
            })
            .await?;

        debug!(returned = written.is_some(), "upsert completed");
        Ok(SingleResult::from(written))
    }

    #[instrument(skip(self, ctx, filter), fields(collection = %collection))]
    async fn find_one_and_delete(
        &self,
        ctx: &OpContext,
        collection: &str,
        filter: BsonDocument,
    ) -> Result<SingleResult> {
        let coll = self.collection(collection)?;
        let deleted = ctx
            .run("find_one_and_delete", async move {
                coll.find_one_and_delete(filter)
                    .await
                    .map_err(ContainerError::from)
            })
            .await?;

        debug!(deleted = deleted.is_some(), "find_one_and_delete completed");
        Ok(SingleResult::from(deleted))
    }

    #[instrument(skip(self, ctx))]
    async fn disconnect(&self, ctx: &OpContext) -> Result<()> {
        let live = self.state.write().take();
        let Some(live) = live else {
            debug!("Handle already closed");
            return Ok(());
        };

        let result = ctx
            .run("disconnect", async move {
                live.client.shutdown().await;
                Ok(())
            })
            .await;

        match result {
            Ok(()) => {
                info!("Disconnected from MongoDB");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Client shutdown did not complete");
                Err(ContainerError::Disconnect(e.to_string()))
            }
        }
    }
}
