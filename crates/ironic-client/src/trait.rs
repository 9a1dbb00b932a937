//! IronicClient trait for mocking
//!
//! This trait abstracts the IronicClient so the controller can be unit
//! tested against an in-memory implementation.

use crate::error::IronicError;
use crate::models::*;

/// Trait for Ironic API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait IronicClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    // Node operations

    /// Create (enroll) a node. A concurrent registration surfaces as `IronicError::Conflict`.
    async fn create_node(&self, request: &CreateNodeRequest) -> Result<Node, IronicError>;
    /// Get a node by UUID or name
    async fn get_node(&self, ident: &str) -> Result<Node, IronicError>;
    /// Apply a JSON patch to a node
    async fn update_node(&self, ident: &str, patch: &[PatchOperation]) -> Result<Node, IronicError>;

    // Port operations

    /// List all ports of a node
    async fn list_node_ports(&self, node_uuid: &str) -> Result<Vec<Port>, IronicError>;
    /// List ports with the given MAC address, across all nodes
    async fn list_ports_by_address(&self, address: &str) -> Result<Vec<Port>, IronicError>;
    /// Create a port
    async fn create_port(&self, request: &CreatePortRequest) -> Result<Port, IronicError>;
    /// Apply a JSON patch to a port
    async fn update_port(&self, port_uuid: &str, patch: &[PatchOperation]) -> Result<Port, IronicError>;
}
