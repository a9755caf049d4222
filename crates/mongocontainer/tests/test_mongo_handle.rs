//! Integration tests for the driver-backed handle.
//!
//! Apart from the unreachable-server case, these tests require a MongoDB
//! server to be running.
//! Set MONGODB_URI (default: mongodb://localhost:27017) and run with --ignored.

use bson::{doc, oid::ObjectId};
use mongocontainer::{
    setup, setup_with_config, ContainerConfig, ContainerError, DocumentStore, MongoHandle,
    OpContext,
};
use std::time::Duration;
use tokio_test::assert_ok;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn mongodb_uri() -> String {
    std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

fn ctx() -> OpContext {
    OpContext::with_timeout(Duration::from_secs(10))
}

/// Unique collection per test so parallel runs don't collide
fn scratch_collection(prefix: &str) -> String {
    format!("{}_{}", prefix, ObjectId::new().to_hex())
}

async fn connect() -> MongoHandle {
    init_tracing();
    setup(&mongodb_uri(), "mongocontainer_test").await.unwrap()
}

#[tokio::test]
#[ignore] // Only run with --ignored flag when database is available
async fn test_setup_then_disconnect() {
    let handle = connect().await;
    assert!(handle.is_connected());
    assert_ok!(handle.ping(&ctx()).await);
    assert_ok!(handle.disconnect(&ctx()).await);
    assert!(!handle.is_connected());
}

#[tokio::test]
#[ignore]
async fn test_user_lifecycle_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let handle = connect().await;
    let users = scratch_collection("users");
    let ctx = ctx();

    let upserted = handle
        .upsert(&ctx, &users, doc! { "id": "1" }, doc! { "$set": { "name": "Alice" } })
        .await?
        .require()?;
    assert_eq!(upserted.get_str("id")?, "1");
    assert_eq!(upserted.get_str("name")?, "Alice");

    let found = handle
        .find_one(&ctx, &users, doc! { "id": "1" })
        .await?
        .require()?;
    assert_eq!(found, upserted);

    let deleted = handle
        .find_one_and_delete(&ctx, &users, doc! { "id": "1" })
        .await?
        .require()?;
    assert_eq!(deleted, upserted);

    let gone = handle.find_one(&ctx, &users, doc! { "id": "1" }).await?;
    assert!(gone.is_not_found());

    handle.disconnect(&ctx).await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_find_one_without_match_is_not_found() {
    let handle = connect().await;
    let result = handle
        .find_one(&ctx(), &scratch_collection("empty"), doc! { "id": "missing" })
        .await
        .unwrap();
    assert!(result.is_not_found());
    handle.disconnect(&ctx()).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_repeated_upsert_converges() {
    let handle = connect().await;
    let coll = scratch_collection("converge");
    let filter = doc! { "id": "1" };
    let update = doc! { "$set": { "name": "Alice" } };

    let first = handle
        .upsert(&ctx(), &coll, filter.clone(), update.clone())
        .await
        .unwrap();
    let second = handle.upsert(&ctx(), &coll, filter, update).await.unwrap();
    assert_eq!(first, second);

    handle
        .find_one_and_delete(&ctx(), &coll, doc! { "id": "1" })
        .await
        .unwrap();
    handle.disconnect(&ctx()).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_operations_after_disconnect_fail() {
    let handle = connect().await;
    handle.disconnect(&ctx()).await.unwrap();

    let result = handle.find_one(&ctx(), "users", doc! {}).await;
    assert!(matches!(result, Err(ContainerError::Closed)));
    assert_ok!(handle.disconnect(&ctx()).await);
}

// Needs no server: nothing listens on port 1
#[tokio::test]
async fn test_unreachable_server_fails_setup() {
    init_tracing();
    let config = ContainerConfig {
        server_selection_timeout_ms: Some(500),
        ..ContainerConfig::default()
    };
    let result = setup_with_config(
        &OpContext::with_timeout(Duration::from_secs(5)),
        "mongodb://127.0.0.1:1",
        "testdb",
        &config,
    )
    .await;
    assert!(matches!(result, Err(ContainerError::Connection(_))));
}
