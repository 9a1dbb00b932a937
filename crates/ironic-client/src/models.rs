//! Ironic data models
//!
//! Request and response types for the `/v1/nodes` and `/v1/ports` endpoints.
//! Field names follow the Ironic wire format (snake_case).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Minimum API microversion providing every field used by this client
/// (port `pxe_enabled`, `local_link_connection`, node `network_interface`).
pub const API_VERSION: &str = "1.81";

/// Key under a port's `extra` map holding the switchport configuration
pub const SWITCHPORT_EXTRA_KEY: &str = "switchport";

/// Ironic node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Node UUID
    pub uuid: String,
    /// Unique node name
    #[serde(default)]
    pub name: Option<String>,
    /// Hardware driver (e.g. "ipmi", "redfish")
    #[serde(default)]
    pub driver: String,
    /// Driver-specific settings, including the BMC address and credentials
    #[serde(default)]
    pub driver_info: Map<String, Value>,
    /// Ironic provision state (e.g. "enroll", "manageable")
    #[serde(default)]
    pub provision_state: Option<String>,
    /// Last error recorded by Ironic
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Request body for `POST /v1/nodes`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateNodeRequest {
    /// Unique node name
    pub name: String,
    /// Hardware driver
    pub driver: String,
    /// Driver-specific settings
    pub driver_info: Map<String, Value>,
    /// Network interface implementation (e.g. "noop", "neutron")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_interface: Option<String>,
    /// Resource class used for scheduling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_class: Option<String>,
}

/// Ironic port (one per NIC)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Port {
    /// Port UUID
    pub uuid: String,
    /// MAC address of the NIC
    pub address: String,
    /// UUID of the owning node
    #[serde(default)]
    pub node_uuid: String,
    /// Whether the NIC may be used for network boot
    #[serde(default)]
    pub pxe_enabled: bool,
    /// Switch and port the NIC is cabled to
    #[serde(default)]
    pub local_link_connection: Map<String, Value>,
    /// Free-form metadata; `extra.switchport` carries the switchport config
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl Port {
    /// Stored switchport payload, if any
    pub fn switchport(&self) -> Option<&Value> {
        self.extra.get(SWITCHPORT_EXTRA_KEY)
    }

    /// True if the port already carries link-layer connection data
    pub fn has_local_link_connection(&self) -> bool {
        !self.local_link_connection.is_empty()
    }
}

/// Request body for `POST /v1/ports`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatePortRequest {
    /// UUID of the owning node
    pub node_uuid: String,
    /// MAC address of the NIC
    pub address: String,
    /// Whether the NIC may be used for network boot
    pub pxe_enabled: bool,
    /// Switch and port the NIC is cabled to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_link_connection: Option<Map<String, Value>>,
    /// Free-form metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

/// Response wrapper for port collections
#[derive(Debug, Clone, Deserialize)]
pub struct PortCollection {
    /// Ports in the collection
    pub ports: Vec<Port>,
}

/// A single RFC 6902 JSON patch operation, as accepted by Ironic `PATCH` calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Add a value (creates or replaces a map member)
    Add {
        /// JSON pointer, e.g. "/extra/switchport"
        path: String,
        /// New value
        value: Value,
    },
    /// Replace an existing value
    Replace {
        /// JSON pointer
        path: String,
        /// New value
        value: Value,
    },
    /// Remove a value
    Remove {
        /// JSON pointer
        path: String,
    },
}

impl PatchOperation {
    /// JSON pointer targeted by the operation
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Add { path, .. }
            | PatchOperation::Replace { path, .. }
            | PatchOperation::Remove { path } => path,
        }
    }
}
