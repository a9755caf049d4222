//! Handle setup: connection string parsing, client construction and handshake

use bson::doc;
use mongocontainer_common::{ContainerError, Result};
use mongodb::{options::ClientOptions, Client};
use tracing::{debug, info, instrument, warn};

use crate::config::ContainerConfig;
use crate::context::OpContext;
use crate::handle::MongoHandle;
use crate::validation::ValidatedDatabaseName;

/// Connect to `uri` and bind the returned handle to `database`.
///
/// Uses [`ContainerConfig::default`]; the handshake is bounded by the driver's
/// server selection timeout only. Use [`setup_with_config`] to pass a deadline.
///
/// # Errors
///
/// Returns [`ContainerError::Validation`] for an invalid database name and
/// [`ContainerError::Connection`] when the URI cannot be parsed, the client
/// cannot be built, or the server does not answer the handshake.
pub async fn setup(uri: &str, database: &str) -> Result<MongoHandle> {
    setup_with_config(
        &OpContext::background(),
        uri,
        database,
        &ContainerConfig::default(),
    )
    .await
}

/// Connect with an explicit context and configuration.
///
/// Failures are always returned to the caller; setup never aborts the process.
#[instrument(skip(ctx, uri, config), fields(
    database = %database,
    verify = config.verify_on_setup
))]
pub async fn setup_with_config(
    ctx: &OpContext,
    uri: &str,
    database: &str,
    config: &ContainerConfig,
) -> Result<MongoHandle> {
    let database_name = ValidatedDatabaseName::new(database)?;

    info!("Connecting to MongoDB");
    let handle = ctx
        .run("setup", connect(uri, &database_name, config))
        .await?;
    info!("Connected to MongoDB");

    Ok(handle)
}

async fn connect(
    uri: &str,
    database_name: &ValidatedDatabaseName,
    config: &ContainerConfig,
) -> Result<MongoHandle> {
    let mut client_options = ClientOptions::parse(uri)
        .await
        .map_err(|e| ContainerError::Connection(format!("Invalid connection string: {}", e)))?;

    config.apply(&mut client_options);
    debug!(hosts = ?client_options.hosts, "Creating MongoDB client");

    let client = Client::with_options(client_options).map_err(|e| {
        ContainerError::Connection(format!("Error while creating mongo client: {}", e))
    })?;
    let database = client.database(database_name.as_str());

    if config.verify_on_setup {
        if let Err(e) = database.run_command(doc! { "ping": 1 }).await {
            warn!(error = %e, "Initial handshake failed");
            client.shutdown().await;
            return Err(ContainerError::Connection(format!(
                "Error while connecting to database: {}",
                e
            )));
        }
    }

    Ok(MongoHandle::from_parts(client, database))
}
