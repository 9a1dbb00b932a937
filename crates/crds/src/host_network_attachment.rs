//! HostNetworkAttachment CRD
//!
//! Declarative switchport configuration for bare-metal host interfaces.
//! An attachment is referenced from `BareMetalHost.spec.networkInterfaces`
//! and translated into the `extra.switchport` payload of the matching
//! Ironic port. The spec is immutable while any host references it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "metal3.io",
    version = "v1alpha1",
    kind = "HostNetworkAttachment",
    namespaced,
    printcolumn = r#"{"name":"Mode","type":"string","jsonPath":".spec.mode"}"#,
    printcolumn = r#"{"name":"Native VLAN","type":"integer","jsonPath":".spec.nativeVLAN"}"#,
    printcolumn = r#"{"name":"MTU","type":"integer","jsonPath":".spec.mtu"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HostNetworkAttachmentSpec {
    /// Switchport mode of the interface
    #[serde(default)]
    pub mode: SwitchportMode,

    /// Untagged VLAN carried on the interface (1-4094)
    #[serde(rename = "nativeVLAN")]
    pub native_vlan: i32,

    /// Tagged VLANs allowed on trunk or hybrid ports.
    /// Order is preserved when pushed to Ironic.
    #[serde(rename = "allowedVLANs", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_vlans: Vec<i32>,

    /// MTU for the interface (68-9000); the network default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<i32>,
}

/// Switchport mode.
///
/// Unknown values deserialize into `Other` so that admission can report
/// them instead of failing to parse the object.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SwitchportMode {
    /// Single untagged VLAN
    #[default]
    Access,
    /// Multiple tagged VLANs
    Trunk,
    /// Native VLAN plus tagged VLANs
    Hybrid,
    /// Unrecognised mode string
    #[serde(untagged)]
    Other(String),
}

impl SwitchportMode {
    /// Wire representation of the mode
    pub fn as_str(&self) -> &str {
        match self {
            SwitchportMode::Access => "access",
            SwitchportMode::Trunk => "trunk",
            SwitchportMode::Hybrid => "hybrid",
            SwitchportMode::Other(value) => value,
        }
    }

    /// Parse a mode string, keeping unknown values as `Other`.
    pub fn parse(value: &str) -> Self {
        match value {
            "access" => SwitchportMode::Access,
            "trunk" => SwitchportMode::Trunk,
            "hybrid" => SwitchportMode::Hybrid,
            other => SwitchportMode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SwitchportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
