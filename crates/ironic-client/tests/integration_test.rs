//! Integration tests for the Ironic client
//!
//! These tests require a running Ironic instance.
//! Set IRONIC_URL (and optionally IRONIC_NODE) environment variables to run.

use ironic_client::{IronicClient, IronicClientTrait, IronicError};

fn client() -> IronicClient {
    let url = std::env::var("IRONIC_URL")
        .unwrap_or_else(|_| "http://localhost:6385".to_string());
    IronicClient::new(url, None).expect("Failed to create client")
}

#[tokio::test]
#[ignore] // Requires running Ironic instance
async fn test_unknown_node_is_not_found() {
    let result = client().get_node("does-not-exist-7c1e").await;
    assert!(
        matches!(result, Err(IronicError::NotFound(_))),
        "expected NotFound, got {:?}",
        result
    );
}

#[tokio::test]
#[ignore]
async fn test_list_node_ports() {
    let node = std::env::var("IRONIC_NODE")
        .expect("IRONIC_NODE environment variable must be set");
    let client = client();

    let node = client.get_node(&node).await.expect("Failed to get node");
    let ports = client.list_node_ports(&node.uuid).await
        .expect("Failed to list ports");

    println!("Node {} has {} ports", node.uuid, ports.len());
    for port in ports {
        assert_eq!(port.node_uuid, node.uuid);
    }
}

#[tokio::test]
#[ignore]
async fn test_list_ports_by_unknown_address() {
    let ports = client().list_ports_by_address("02:00:00:00:00:00").await
        .expect("Failed to list ports");
    assert!(ports.is_empty());
}
