//! BareMetalHost CRD (network subset)
//!
//! Only the fields read or written by the network controller are modelled.
//! The full host resource and its provisioning state machine are owned by
//! the bare-metal operator; unknown fields are ignored on deserialization
//! and status writes are merge patches, so the remaining fields are untouched.

use crate::conditions::Condition;
use crate::references::HostNetworkAttachmentRef;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "metal3.io",
    version = "v1alpha1",
    kind = "BareMetalHost",
    namespaced,
    status = "BareMetalHostStatus",
    shortname = "bmh"
)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalHostSpec {
    /// MAC address of the NIC used for provisioning (PXE)
    #[serde(rename = "bootMACAddress", default, skip_serializing_if = "Option::is_none")]
    pub boot_mac_address: Option<String>,

    /// Declared network interfaces and the attachments configuring them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_interfaces: Vec<NetworkInterface>,
}

/// One declared host interface.
///
/// Identified by `name` or, when no name is given, by `macAddress`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// Interface name as reported by inspection (e.g. "eth0")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Interface MAC address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,

    /// Attachment providing the switchport configuration
    pub host_network_attachment: HostNetworkAttachmentRef,
}

impl NetworkInterface {
    /// Key identifying the interface: the name if set, otherwise the MAC.
    pub fn key(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.mac_address.as_deref().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalHostStatus {
    /// Provisioning state and Ironic node identifier
    #[serde(default)]
    pub provisioning: ProvisionStatus,

    /// Hardware discovered by inspection; absent until inspection completes
    #[serde(rename = "hardware", default, skip_serializing_if = "Option::is_none")]
    pub hardware_details: Option<HardwareDetails>,

    /// Snapshot of `spec.networkInterfaces` at the last successful apply.
    ///
    /// `None` means nothing was ever applied, which differs from `Some(vec![])`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_network_interfaces: Option<Vec<NetworkInterface>>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionStatus {
    /// Current provisioning state (e.g. "available")
    #[serde(default)]
    pub state: String,

    /// Ironic node UUID, set once the host is registered
    #[serde(rename = "ID", default)]
    pub id: String,
}

impl ProvisionStatus {
    /// Parsed provisioning state
    pub fn provisioning_state(&self) -> ProvisioningState {
        ProvisioningState::parse(&self.state)
    }

    /// Ironic node UUID if the host has been registered
    pub fn node_id(&self) -> Option<&str> {
        (!self.id.is_empty()).then_some(self.id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HardwareDetails {
    /// NICs reported by inspection
    #[serde(default)]
    pub nics: Vec<Nic>,
}

/// A NIC reported by hardware inspection
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Nic {
    /// Interface name
    #[serde(default)]
    pub name: String,

    /// MAC address
    #[serde(default)]
    pub mac: String,

    /// IP address, if one was observed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,

    /// Whether the NIC is PXE capable
    #[serde(default)]
    pub pxe: bool,

    /// LLDP neighbour information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lldp: Option<Lldp>,
}

/// LLDP neighbour of a NIC
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub struct Lldp {
    /// Chassis ID of the switch
    #[serde(rename = "switchID", default, skip_serializing_if = "String::is_empty")]
    pub switch_id: String,

    /// Switch port the NIC is cabled to
    #[serde(rename = "portID", default, skip_serializing_if = "String::is_empty")]
    pub port_id: String,

    /// System name advertised by the switch
    #[serde(rename = "switchSystemName", default, skip_serializing_if = "String::is_empty")]
    pub switch_system_name: String,
}

/// Host provisioning states known to the network controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProvisioningState {
    /// No state recorded yet
    None,
    /// Not managed by the operator
    Unmanaged,
    /// Node being enrolled in Ironic
    Registering,
    /// Legacy profile matching
    MatchProfile,
    /// Node being cleaned and configured (manageable)
    Preparing,
    /// Host ready for provisioning
    Available,
    /// Image being deployed
    Provisioning,
    /// Image deployed
    Provisioned,
    /// Provisioned outside of the operator
    ExternallyProvisioned,
    /// Image being removed
    Deprovisioning,
    /// Hardware inspection running
    Inspecting,
    /// Powering off before delete
    PoweringOffBeforeDelete,
    /// Being deleted
    Deleting,
    /// Any state this controller does not model
    Unknown,
}

impl ProvisioningState {
    /// Parse the status string used by the host resource
    pub fn parse(value: &str) -> Self {
        match value {
            "" => Self::None,
            "unmanaged" => Self::Unmanaged,
            "registering" => Self::Registering,
            "match profile" => Self::MatchProfile,
            "preparing" => Self::Preparing,
            "available" | "ready" => Self::Available,
            "provisioning" => Self::Provisioning,
            "provisioned" => Self::Provisioned,
            "externally provisioned" => Self::ExternallyProvisioned,
            "deprovisioning" => Self::Deprovisioning,
            "inspecting" => Self::Inspecting,
            "powering off before delete" => Self::PoweringOffBeforeDelete,
            "deleting" => Self::Deleting,
            _ => Self::Unknown,
        }
    }
}

impl BareMetalHost {
    /// Namespace of the host, defaulting to "default"
    pub fn namespace_or_default(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or("default")
    }

    /// Stored hardware details, if inspection has completed
    pub fn hardware_details(&self) -> Option<&HardwareDetails> {
        self.status.as_ref().and_then(|s| s.hardware_details.as_ref())
    }
}
