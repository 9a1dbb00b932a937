//! Per-NIC Ironic port reconciliation.
//!
//! Before inspection only the boot MAC is known, so a single PXE port is
//! created. Once hardware details exist every inspected NIC gets a port whose
//! PXE flag, switch-port settings and link-layer data are kept in line with
//! the desired state, patching only fields that diverge.

use super::{PortProvisioner, SwitchPortConfig};
use crate::error::ControllerError;
use crds::{HardwareDetails, Nic};
use ironic_client::{CreatePortRequest, IronicError, PatchOperation, Port, SWITCHPORT_EXTRA_KEY};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info};

/// Failures listed in the aggregate error message
const MAX_REPORTED_FAILURES: usize = 3;

const SWITCHPORT_PATH: &str = "/extra/switchport";

impl PortProvisioner<'_> {
    /// Bring the node's ports in line with the host's NICs.
    ///
    /// Fails with `NodeNotRegistered` when the host has no Ironic node id.
    /// NIC failures do not stop the remaining NICs; they are reported together.
    pub async fn ensure_ports(&self, node_id: Option<&str>) -> Result<(), ControllerError> {
        let node_uuid = node_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ControllerError::NodeNotRegistered(self.host_key.clone()))?;

        match self.hardware {
            Some(hardware) => self.ensure_nic_ports(node_uuid, hardware).await,
            None => self.ensure_pxe_port(node_uuid).await,
        }
    }

    /// Create a PXE port for the boot MAC when the node has no ports yet.
    ///
    /// Nothing is done when the node already has a port or the MAC is
    /// registered on any other port.
    pub async fn ensure_pxe_port(&self, node_uuid: &str) -> Result<(), ControllerError> {
        let Some(boot_mac) = self.boot_mac.as_deref() else {
            debug!("Host {} has no boot MAC, skipping PXE port", self.host_key);
            return Ok(());
        };

        let ports = self.ironic.list_node_ports(node_uuid).await?;
        if !ports.is_empty() {
            debug!("Node {} already has {} port(s)", node_uuid, ports.len());
            return Ok(());
        }

        let allocated = self.ironic.list_ports_by_address(boot_mac).await?;
        if !allocated.is_empty() {
            info!(
                "Boot MAC {} of host {} is already registered on another port",
                boot_mac, self.host_key
            );
            return Ok(());
        }

        let request = CreatePortRequest {
            node_uuid: node_uuid.to_string(),
            address: boot_mac.to_string(),
            pxe_enabled: true,
            local_link_connection: None,
            extra: self.config_for_key(boot_mac).map(switchport_extra),
        };
        let port = self.ironic.create_port(&request).await?;
        info!("Created PXE port {} ({}) for host {}", port.uuid, boot_mac, self.host_key);
        Ok(())
    }

    async fn ensure_nic_ports(
        &self,
        node_uuid: &str,
        hardware: &HardwareDetails,
    ) -> Result<(), ControllerError> {
        let nics = dedup_nics_by_mac(&hardware.nics);
        let existing: HashMap<String, Port> = self
            .ironic
            .list_node_ports(node_uuid)
            .await?
            .into_iter()
            .map(|port| (port.address.to_lowercase(), port))
            .collect();

        let mut failures = Vec::new();
        for nic in &nics {
            let pxe = nic.pxe
                || self
                    .boot_mac
                    .as_deref()
                    .is_some_and(|mac| mac.eq_ignore_ascii_case(&nic.mac));
            let config = self.config_for_nic(nic);
            let port = existing.get(&nic.mac.to_lowercase());

            if let Err(e) = self.ensure_port(node_uuid, nic, pxe, config, port).await {
                error!("Failed to ensure port {}({}) for host {}: {}", nic.name, nic.mac, self.host_key, e);
                failures.push(format!("{}({}): {}", nic.name, nic.mac, e));
            }
        }

        info!(
            "Ensured ports for host {}: {} attempted, {} succeeded, {} failed",
            self.host_key,
            nics.len(),
            nics.len() - failures.len(),
            failures.len()
        );

        if failures.is_empty() {
            return Ok(());
        }
        Err(ControllerError::PortReconciliation {
            failed: failures.len(),
            total: nics.len(),
            summary: failures
                .iter()
                .take(MAX_REPORTED_FAILURES)
                .cloned()
                .collect::<Vec<_>>()
                .join("; "),
        })
    }

    /// Create the port for `nic`, or patch the fields of `existing` that diverge.
    ///
    /// Link-layer data already recorded on a port is never overwritten.
    pub async fn ensure_port(
        &self,
        node_uuid: &str,
        nic: &Nic,
        pxe: bool,
        config: Option<&SwitchPortConfig>,
        existing: Option<&Port>,
    ) -> Result<(), IronicError> {
        let Some(port) = existing else {
            let request = CreatePortRequest {
                node_uuid: node_uuid.to_string(),
                address: nic.mac.clone(),
                pxe_enabled: pxe,
                local_link_connection: build_local_link_connection(nic),
                extra: config.map(switchport_extra),
            };
            let created = self.ironic.create_port(&request).await?;
            info!("Created port {} for NIC {}({})", created.uuid, nic.name, nic.mac);
            return Ok(());
        };

        let mut patch = Vec::new();
        if port.pxe_enabled != pxe {
            patch.push(PatchOperation::Replace {
                path: "/pxe_enabled".to_string(),
                value: Value::Bool(pxe),
            });
        }
        match config {
            Some(config) if !switchport_matches(port.switchport(), config) => {
                patch.push(PatchOperation::Add {
                    path: SWITCHPORT_PATH.to_string(),
                    value: config.to_switchport_value(),
                });
            }
            None if port.switchport().is_some() => {
                patch.push(PatchOperation::Remove {
                    path: SWITCHPORT_PATH.to_string(),
                });
            }
            _ => {}
        }
        if !port.has_local_link_connection() {
            if let Some(llc) = build_local_link_connection(nic) {
                patch.push(PatchOperation::Add {
                    path: "/local_link_connection".to_string(),
                    value: Value::Object(llc),
                });
            }
        }

        if patch.is_empty() {
            debug!("Port {} for NIC {} is up to date", port.uuid, nic.mac);
            return Ok(());
        }

        let paths: Vec<&str> = patch.iter().map(PatchOperation::path).collect();
        self.ironic.update_port(&port.uuid, &patch).await?;
        info!("Updated port {} for NIC {}({}): {}", port.uuid, nic.name, nic.mac, paths.join(", "));
        Ok(())
    }

    fn config_for_nic(&self, nic: &Nic) -> Option<&SwitchPortConfig> {
        let by_name = (!nic.name.is_empty())
            .then(|| self.config_for_key(&nic.name))
            .flatten();
        by_name.or_else(|| self.config_for_key(&nic.mac))
    }

    pub(super) fn config_for_key(&self, key: &str) -> Option<&SwitchPortConfig> {
        self.switch_port_configs.get(&key.to_lowercase())
    }
}

pub(super) fn switchport_extra(config: &SwitchPortConfig) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert(SWITCHPORT_EXTRA_KEY.to_string(), config.to_switchport_value());
    extra
}

/// Drop NICs that repeat an earlier MAC (case-insensitive). First seen wins.
/// NICs without a MAC cannot back a port and are skipped.
pub fn dedup_nics_by_mac(nics: &[Nic]) -> Vec<&Nic> {
    let mut seen = HashSet::new();
    nics.iter()
        .filter(|nic| {
            if nic.mac.is_empty() {
                debug!("Skipping NIC {} without MAC address", nic.name);
                return false;
            }
            seen.insert(nic.mac.to_lowercase())
        })
        .collect()
}

/// Link-layer connection data from the NIC's LLDP neighbour, if any was reported.
pub fn build_local_link_connection(nic: &Nic) -> Option<Map<String, Value>> {
    let lldp = nic.lldp.as_ref()?;
    let mut llc = Map::new();
    for (key, value) in [
        ("switch_id", &lldp.switch_id),
        ("port_id", &lldp.port_id),
        ("switch_info", &lldp.switch_system_name),
    ] {
        if !value.is_empty() {
            llc.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    (!llc.is_empty()).then_some(llc)
}

/// Typed view of a stored switch-port payload used for comparison.
#[derive(Debug, PartialEq, Eq)]
struct SwitchportPayload {
    mode: String,
    native_vlan: i64,
    allowed_vlans: Vec<i64>,
    mtu: Option<i64>,
}

impl SwitchportPayload {
    /// Parse a stored payload; `None` when any field has an unexpected shape.
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let mode = match map.get("mode") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(mode)) => mode.clone(),
            Some(_) => return None,
        };
        let native_vlan = match map.get("native_vlan") {
            None | Some(Value::Null) => 0,
            Some(v) => as_integer(v)?,
        };
        let allowed_vlans = match map.get("allowed_vlans") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(as_integer).collect::<Option<Vec<_>>>()?,
            Some(_) => return None,
        };
        let mtu = match map.get("mtu") {
            None | Some(Value::Null) => None,
            Some(v) => Some(as_integer(v)?),
        };
        Some(Self {
            mode,
            native_vlan,
            allowed_vlans,
            mtu,
        })
    }
}

impl From<&SwitchPortConfig> for SwitchportPayload {
    fn from(config: &SwitchPortConfig) -> Self {
        Self {
            mode: config.mode.as_str().to_string(),
            native_vlan: i64::from(config.native_vlan),
            allowed_vlans: config.allowed_vlans.iter().copied().map(i64::from).collect(),
            mtu: config.mtu.map(i64::from),
        }
    }
}

/// Integral JSON numbers, whether stored as integers or floats.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
            .map(|f| f as i64)
    })
}

/// Whether a stored `extra.switchport` value already matches `desired`.
///
/// Missing or non-object values never match. Numbers compare by value, so
/// `100.0` equals `100`; VLAN order is significant.
pub fn switchport_matches(existing: Option<&Value>, desired: &SwitchPortConfig) -> bool {
    existing
        .and_then(SwitchportPayload::from_value)
        .is_some_and(|stored| stored == SwitchportPayload::from(desired))
}
