//! Ironic node enrollment.
//!
//! A host is enrolled once under its node name. Later registrations audit the
//! node's ports and refresh the driver info when credentials or the BMC
//! address changed.

use super::PortProvisioner;
use crate::error::ControllerError;
use ironic_client::{CreateNodeRequest, CreatePortRequest, IronicError, PatchOperation};
use serde_json::{Map, Value};
use tracing::info;

/// Everything needed to enroll a host as an Ironic node.
#[derive(Debug, Clone)]
pub struct NodeRegistration {
    /// Node name, usually `namespace~host`
    pub name: String,
    /// Hardware driver
    pub driver: String,
    /// BMC access details
    pub driver_info: Map<String, Value>,
    /// Ironic network interface, when networking is enabled
    pub network_interface: Option<String>,
}

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The node exists in Ironic
    Registered {
        /// Node UUID
        node_uuid: String,
        /// Whether this call enrolled it
        created: bool,
    },
    /// Ironic answered 409 while enrolling; retry later
    Busy,
}

impl PortProvisioner<'_> {
    /// Enroll the host, or refresh an existing node.
    ///
    /// `credentials_changed` forces a driver-info update on an existing node.
    pub async fn register_node(
        &self,
        registration: &NodeRegistration,
        credentials_changed: bool,
    ) -> Result<RegisterOutcome, ControllerError> {
        let node = match self.ironic.get_node(&registration.name).await {
            Ok(node) => node,
            Err(IronicError::NotFound(_)) => return self.enroll_node(registration).await,
            Err(e) => return Err(e.into()),
        };

        self.ensure_ports(Some(&node.uuid)).await?;
        info!("Ensured all ports for existing node {}", node.uuid);

        if credentials_changed || !bmc_address_matches(&node.driver_info, &registration.driver_info) {
            info!("Updating driver info of node {}: credentials or BMC address changed", node.uuid);
            let patch = [PatchOperation::Replace {
                path: "/driver_info".to_string(),
                value: Value::Object(registration.driver_info.clone()),
            }];
            self.ironic.update_node(&node.uuid, &patch).await?;
        }

        Ok(RegisterOutcome::Registered {
            node_uuid: node.uuid,
            created: false,
        })
    }

    async fn enroll_node(&self, registration: &NodeRegistration) -> Result<RegisterOutcome, ControllerError> {
        info!("Registering host {} in Ironic as {}", self.host_key, registration.name);
        let request = CreateNodeRequest {
            name: registration.name.clone(),
            driver: registration.driver.clone(),
            driver_info: registration.driver_info.clone(),
            network_interface: registration.network_interface.clone(),
            resource_class: None,
        };
        let node = match self.ironic.create_node(&request).await {
            Ok(node) => node,
            Err(IronicError::Conflict(msg)) => {
                info!("Could not register host {} in Ironic, busy: {}", self.host_key, msg);
                return Ok(RegisterOutcome::Busy);
            }
            Err(e) => return Err(e.into()),
        };

        // Without a boot MAC the port is created after inspection
        if let Some(boot_mac) = self.boot_mac.as_deref() {
            let request = CreatePortRequest {
                node_uuid: node.uuid.clone(),
                address: boot_mac.to_string(),
                pxe_enabled: true,
                local_link_connection: None,
                extra: self.config_for_key(boot_mac).map(super::ports::switchport_extra),
            };
            self.ironic.create_port(&request).await?;
        }

        Ok(RegisterOutcome::Registered {
            node_uuid: node.uuid,
            created: true,
        })
    }
}

fn first_address_entry(driver_info: &Map<String, Value>) -> Option<(&String, &Value)> {
    driver_info.iter().find(|(key, _)| key.ends_with("_address"))
}

/// Whether the BMC address in Ironic's driver info equals the desired one.
///
/// Compares the first `*_address` entry of each side; two sides without any
/// such entry match.
pub fn bmc_address_matches(current: &Map<String, Value>, desired: &Map<String, Value>) -> bool {
    first_address_entry(current) == first_address_entry(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use ironic_client::MockIronicClient;
    use serde_json::json;
    use std::collections::HashMap;

    fn driver_info(address: &str) -> Map<String, Value> {
        let mut info = Map::new();
        info.insert("redfish_address".to_string(), json!(address));
        info.insert("redfish_username".to_string(), json!("admin"));
        info
    }

    fn registration(address: &str) -> NodeRegistration {
        NodeRegistration {
            name: "metal3~worker-0".to_string(),
            driver: "redfish".to_string(),
            driver_info: driver_info(address),
            network_interface: Some("neutron".to_string()),
        }
    }

    #[test]
    fn test_bmc_address_matches() {
        assert!(bmc_address_matches(&driver_info("https://10.0.0.1"), &driver_info("https://10.0.0.1")));
        assert!(!bmc_address_matches(&driver_info("https://10.0.0.1"), &driver_info("https://10.0.0.2")));
        assert!(bmc_address_matches(&Map::new(), &Map::new()));
        assert!(!bmc_address_matches(&Map::new(), &driver_info("https://10.0.0.1")));
    }

    #[tokio::test]
    async fn test_register_new_node_creates_pxe_port() {
        let mock = MockIronicClient::new("http://ironic:6385");
        let host = create_test_host("worker-0", "metal3", None, Some("AA:BB:CC:DD:EE:01"), vec![]);
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());

        let outcome = provisioner.register_node(&registration("https://10.0.0.1"), false).await.unwrap();

        let RegisterOutcome::Registered { node_uuid, created } = outcome else {
            panic!("expected registration");
        };
        assert!(created);
        let ports = mock.ports();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].node_uuid, node_uuid);
        assert!(ports[0].pxe_enabled);
    }

    #[tokio::test]
    async fn test_register_busy_on_conflict() {
        let mock = MockIronicClient::new("http://ironic:6385");
        mock.set_node_create_conflict(true);
        let host = create_test_host("worker-0", "metal3", None, None, vec![]);
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());

        let outcome = provisioner.register_node(&registration("https://10.0.0.1"), false).await.unwrap();
        assert_eq!(outcome, RegisterOutcome::Busy);
        assert!(mock.nodes().is_empty());
    }

    #[tokio::test]
    async fn test_existing_node_updates_driver_info_only_when_needed() {
        let mock = MockIronicClient::new("http://ironic:6385");
        let mut node = create_test_node("node-1", "metal3~worker-0");
        node.driver_info = driver_info("https://10.0.0.1");
        mock.add_node(node);
        let host = create_test_host("worker-0", "metal3", Some("node-1"), None, vec![]);
        let provisioner = PortProvisioner::new(&mock, &host, HashMap::new());

        provisioner.register_node(&registration("https://10.0.0.1"), false).await.unwrap();
        assert!(mock.node_patches().is_empty());

        provisioner.register_node(&registration("https://10.0.0.2"), false).await.unwrap();
        assert_eq!(mock.node_patches().len(), 1);

        provisioner.register_node(&registration("https://10.0.0.2"), true).await.unwrap();
        assert_eq!(mock.node_patches().len(), 2);
    }
}
