//! BareMetalHost network interface reconciliation.
//!
//! Validates the host's declared interfaces against inspected NICs, detects
//! drift between declared and applied interfaces, resolves attachments into
//! switch-port settings and hands them to the port provisioner.

use super::{Reconciler, guarded_status_patch};
use crate::cluster::ClusterStore;
use crate::error::ControllerError;
use crate::provisioner::{PortProvisioner, SwitchPortConfig};
use crds::{
    BareMetalHost, BareMetalHostSpec, BareMetalHostStatus, CONDITION_NETWORK_INTERFACES_VALID, Condition,
    ConditionStatus, Nic, ProvisioningState, find_condition, remove_condition, set_condition,
};
use serde_json::json;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

/// Condition reason when every declared interface exists on the host
pub const REASON_ALL_INTERFACES_VALID: &str = "AllInterfacesValid";
/// Condition reason when some declared interface does not exist
pub const REASON_INVALID_INTERFACE_NAMES: &str = "InvalidInterfaceNames";

/// Why the declared interfaces have to be (re)applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftReason {
    /// All interfaces were removed from the spec after being applied
    InterfacesRemoved,
    /// Nothing was applied yet
    InitialConfiguration,
    /// The declared interfaces differ from the applied ones
    SpecChanged,
}

impl DriftReason {
    /// Stable reason tag used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InterfacesRemoved => "NetworkInterfacesRemoved",
            Self::InitialConfiguration => "InitialConfiguration",
            Self::SpecChanged => "NetworkInterfaceSpecChanged",
        }
    }
}

/// Provisioning states in which the Ironic node accepts port updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortUpdatePolicy {
    allowed: BTreeSet<ProvisioningState>,
}

impl PortUpdatePolicy {
    /// Policy allowing exactly the given states
    pub fn from_states(states: impl IntoIterator<Item = ProvisioningState>) -> Self {
        Self {
            allowed: states.into_iter().collect(),
        }
    }

    /// Whether port updates may be pushed while the host is in `state`
    pub fn permits(&self, state: ProvisioningState) -> bool {
        self.allowed.contains(&state)
    }
}

impl Default for PortUpdatePolicy {
    /// registering (enroll), preparing (manageable), available and inspecting
    fn default() -> Self {
        Self::from_states([
            ProvisioningState::Registering,
            ProvisioningState::Preparing,
            ProvisioningState::Available,
            ProvisioningState::Inspecting,
        ])
    }
}

/// Update the interface validation condition. Returns true if the status changed.
///
/// The condition is removed while there is nothing to validate against:
/// no declared interfaces, or no hardware details yet.
pub fn validate_network_interfaces(spec: &BareMetalHostSpec, status: &mut BareMetalHostStatus) -> bool {
    let nics = match status.hardware_details.as_ref() {
        Some(hardware) if !spec.network_interfaces.is_empty() => &hardware.nics,
        _ => return remove_condition(&mut status.conditions, CONDITION_NETWORK_INTERFACES_VALID),
    };

    let available: HashSet<&str> = nics
        .iter()
        .flat_map(|nic| [nic.name.as_str(), nic.mac.as_str()])
        .filter(|key| !key.is_empty())
        .collect();

    let invalid: Vec<&str> = spec
        .network_interfaces
        .iter()
        .map(|iface| iface.key())
        .filter(|key| !available.contains(key))
        .collect();

    if invalid.is_empty() {
        return set_interface_validation(
            &mut status.conditions,
            ConditionStatus::True,
            REASON_ALL_INTERFACES_VALID,
            "All network interfaces are valid".to_string(),
        );
    }

    let names = available_nic_names(nics);
    let message = if names.is_empty() {
        format!(
            "Invalid interface names: {}. No network interfaces discovered on this host.",
            invalid.join(", ")
        )
    } else {
        format!(
            "Invalid interface names: {}. Available interfaces: {}",
            invalid.join(", "),
            names.join(", ")
        )
    };
    info!("Network interface validation failed: {}", message);
    set_interface_validation(
        &mut status.conditions,
        ConditionStatus::False,
        REASON_INVALID_INTERFACE_NAMES,
        message,
    )
}

fn available_nic_names(nics: &[Nic]) -> Vec<&str> {
    let mut names: Vec<&str> = nics
        .iter()
        .map(|nic| nic.name.as_str())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort_unstable();
    names
}

/// No-op when status and reason already match.
fn set_interface_validation(
    conditions: &mut Vec<Condition>,
    status: ConditionStatus,
    reason: &str,
    message: String,
) -> bool {
    if let Some(existing) = find_condition(conditions, CONDITION_NETWORK_INTERFACES_VALID) {
        if existing.status == status && existing.reason == reason {
            return false;
        }
    }
    set_condition(
        conditions,
        Condition::new(CONDITION_NETWORK_INTERFACES_VALID, status, reason, message),
    )
}

/// Whether the interface validation condition is present and True
pub fn interface_validation_passed(status: &BareMetalHostStatus) -> bool {
    find_condition(&status.conditions, CONDITION_NETWORK_INTERFACES_VALID)
        .is_some_and(|c| c.status == ConditionStatus::True)
}

/// Detect drift between declared and applied interfaces.
///
/// Declared interfaces are only applied once validation has passed.
pub fn needs_update(spec: &BareMetalHostSpec, status: &BareMetalHostStatus) -> Option<DriftReason> {
    if spec.network_interfaces.is_empty() {
        let applied = status.applied_network_interfaces.as_deref().unwrap_or_default();
        return (!applied.is_empty()).then_some(DriftReason::InterfacesRemoved);
    }
    if !interface_validation_passed(status) {
        return None;
    }
    match status.applied_network_interfaces.as_ref() {
        None => Some(DriftReason::InitialConfiguration),
        Some(applied) if *applied != spec.network_interfaces => Some(DriftReason::SpecChanged),
        Some(_) => None,
    }
}

/// Resolve each declared interface's attachment into switch-port settings.
///
/// Keys are interface keys (name, else MAC). Missing attachments are skipped;
/// any other read failure aborts the whole resolution.
pub async fn resolve_switch_port_configs(
    store: &dyn ClusterStore,
    host: &BareMetalHost,
) -> Result<HashMap<String, SwitchPortConfig>, ControllerError> {
    let host_namespace = host.namespace_or_default();
    let mut configs = HashMap::new();

    for iface in &host.spec.network_interfaces {
        let reference = &iface.host_network_attachment;
        let namespace = reference.effective_namespace(host_namespace);
        let attachment = store
            .get_attachment(namespace, &reference.name)
            .await
            .map_err(|e| ControllerError::AttachmentLookup {
                key: reference.index_key(host_namespace),
                source: Box::new(e),
            })?;

        match attachment {
            Some(attachment) => {
                configs.insert(iface.key().to_string(), SwitchPortConfig::from(&attachment.spec));
            }
            None => {
                info!(
                    "Network attachment {} not found, skipping interface {}",
                    reference.index_key(host_namespace),
                    iface.key()
                );
            }
        }
    }

    Ok(configs)
}

impl Reconciler {
    /// Reconcile the network interfaces of a host.
    ///
    /// A changed validation condition is persisted on its own; the new
    /// condition brings the host back through the watch before ports are touched.
    pub async fn reconcile_host(&self, host: &BareMetalHost) -> Result<(), ControllerError> {
        let name = host
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("BareMetalHost has no name".to_string()))?;
        let namespace = host.namespace_or_default();
        let resource_version = host.metadata.resource_version.as_deref();
        debug!("Reconciling network interfaces of BareMetalHost {}/{}", namespace, name);

        let mut status = host.status.clone().unwrap_or_default();

        if validate_network_interfaces(&host.spec, &mut status) {
            let patch = guarded_status_patch(resource_version, json!({ "conditions": status.conditions }));
            self.store.patch_host_status(namespace, name, &patch).await?;
            info!("Updated network interface validation of BareMetalHost {}/{}", namespace, name);
            return Ok(());
        }

        let Some(reason) = needs_update(&host.spec, &status) else {
            debug!("Network interfaces of BareMetalHost {}/{} are up to date", namespace, name);
            return Ok(());
        };

        let state = status.provisioning.provisioning_state();
        if !self.port_update_policy.permits(state) {
            info!(
                "Pending port updates for BareMetalHost {}/{} ({}), waiting for node state, current state {:?}",
                namespace,
                name,
                reason.as_str(),
                state
            );
            return Ok(());
        }

        info!(
            "Applying network interfaces of BareMetalHost {}/{}: {}",
            namespace,
            name,
            reason.as_str()
        );

        let clearing = host.spec.network_interfaces.is_empty();
        let configs = if clearing {
            HashMap::new()
        } else {
            resolve_switch_port_configs(self.store.as_ref(), host).await?
        };

        let provisioner = PortProvisioner::new(self.ironic.as_ref(), host, configs);
        provisioner.ensure_ports(status.provisioning.node_id()).await?;

        let applied = (!clearing).then(|| host.spec.network_interfaces.clone());
        let patch = guarded_status_patch(resource_version, json!({ "appliedNetworkInterfaces": applied }));
        self.store.patch_host_status(namespace, name, &patch).await?;
        info!(
            "Applied {} network interface(s) to BareMetalHost {}/{}",
            host.spec.network_interfaces.len(),
            namespace,
            name
        );
        Ok(())
    }
}
