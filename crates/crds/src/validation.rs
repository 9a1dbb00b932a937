//! Field validation for `HostNetworkAttachment`
//!
//! The switchport check (mode plus VLANs) and the MTU check run independently
//! and both contribute to the result. Within the switchport check the first
//! failure wins, and the native VLAN is only checked once the mode and
//! allowed VLANs are acceptable.

use crate::host_network_attachment::{HostNetworkAttachmentSpec, SwitchportMode};

/// Lowest valid VLAN ID
pub const MIN_VLAN_ID: i32 = 1;
/// Highest valid VLAN ID
pub const MAX_VLAN_ID: i32 = 4094;
/// Smallest accepted MTU
pub const MIN_MTU: i32 = 68;
/// Largest accepted MTU
pub const MAX_MTU: i32 = 9000;

impl HostNetworkAttachmentSpec {
    /// Validate the attachment fields, returning every violation found.
    ///
    /// An empty result means the spec is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Err(e) = validate_switchport(self) {
            errors.push(e);
        }
        if let Err(e) = validate_mtu(self.mtu) {
            errors.push(e);
        }

        errors
    }
}

fn validate_switchport(spec: &HostNetworkAttachmentSpec) -> Result<(), String> {
    match &spec.mode {
        SwitchportMode::Access => {
            if !spec.allowed_vlans.is_empty() {
                return Err("allowedVlans cannot be specified for access mode".to_string());
            }
        }
        SwitchportMode::Trunk | SwitchportMode::Hybrid => {
            for vlan in &spec.allowed_vlans {
                validate_vlan_id(*vlan).map_err(|e| format!("invalid allowedVlans: {}", e))?;
            }
        }
        SwitchportMode::Other(mode) => {
            return Err(format!("invalid switchport mode: {}", mode));
        }
    }

    validate_vlan_id(spec.native_vlan).map_err(|e| format!("invalid nativeVlan: {}", e))
}

/// Check a single VLAN ID against the 802.1Q range.
pub fn validate_vlan_id(vlan: i32) -> Result<(), String> {
    if !(MIN_VLAN_ID..=MAX_VLAN_ID).contains(&vlan) {
        return Err(format!(
            "VLAN ID {} is out of range ({}-{})",
            vlan, MIN_VLAN_ID, MAX_VLAN_ID
        ));
    }
    Ok(())
}

fn validate_mtu(mtu: Option<i32>) -> Result<(), String> {
    match mtu {
        Some(mtu) if !(MIN_MTU..=MAX_MTU).contains(&mtu) => Err(format!(
            "MTU {} is out of range ({}-{})",
            mtu, MIN_MTU, MAX_MTU
        )),
        _ => Ok(()),
    }
}
