//! Ironic REST API Client
//!
//! A Rust client for the subset of the OpenStack Ironic bare metal API used
//! by the network controller: node enrollment and per-NIC port records.
//!
//! # Example
//!
//! ```no_run
//! use ironic_client::{CreatePortRequest, IronicClient, IronicClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = IronicClient::new("http://ironic:6385".to_string(), None)?;
//!
//! // List the ports of a node
//! let ports = client.list_node_ports("node-uuid").await?;
//!
//! // Create a PXE enabled port
//! if ports.is_empty() {
//!     let request = CreatePortRequest {
//!         node_uuid: "node-uuid".to_string(),
//!         address: "aa:bb:cc:dd:ee:ff".to_string(),
//!         pxe_enabled: true,
//!         local_link_connection: None,
//!         extra: None,
//!     };
//!     client.create_port(&request).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod ironic_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{BasicAuth, IronicClient};
pub use error::IronicError;
pub use models::*;
pub use ironic_trait::IronicClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockIronicClient;
