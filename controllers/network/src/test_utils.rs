//! Test utilities for unit testing reconcilers
//!
//! This module provides builders for test objects and an in-memory
//! `ClusterStore` that records writes.

use crate::cluster::ClusterStore;
use crate::error::ControllerError;
use async_trait::async_trait;
use crds::*;
use ironic_client::{Node, Port};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Helper to create a test BareMetalHost
///
/// Hardware details are only set when `nics` is non-empty.
pub fn create_test_host(
    name: &str,
    namespace: &str,
    node_id: Option<&str>,
    boot_mac: Option<&str>,
    nics: Vec<Nic>,
) -> BareMetalHost {
    BareMetalHost {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: BareMetalHostSpec {
            boot_mac_address: boot_mac.map(str::to_string),
            network_interfaces: vec![],
        },
        status: Some(BareMetalHostStatus {
            provisioning: ProvisionStatus {
                state: "available".to_string(),
                id: node_id.unwrap_or_default().to_string(),
            },
            hardware_details: (!nics.is_empty()).then_some(HardwareDetails { nics }),
            applied_network_interfaces: None,
            conditions: vec![],
        }),
    }
}

/// Helper to create a test NIC without LLDP data
pub fn create_test_nic(name: &str, mac: &str) -> Nic {
    Nic {
        name: name.to_string(),
        mac: mac.to_string(),
        ..Default::default()
    }
}

/// Helper to create a test NIC with an LLDP neighbour
pub fn create_test_nic_with_lldp(name: &str, mac: &str, switch_id: &str, port_id: &str) -> Nic {
    Nic {
        name: name.to_string(),
        mac: mac.to_string(),
        lldp: Some(Lldp {
            switch_id: switch_id.to_string(),
            port_id: port_id.to_string(),
            switch_system_name: String::new(),
        }),
        ..Default::default()
    }
}

/// Helper to create a host interface referencing an attachment in the host namespace
pub fn create_test_interface(name: &str, attachment: &str) -> NetworkInterface {
    NetworkInterface {
        name: Some(name.to_string()),
        mac_address: None,
        host_network_attachment: HostNetworkAttachmentRef::new(attachment),
    }
}

/// Helper to create a test HostNetworkAttachment
pub fn create_test_attachment(name: &str, namespace: &str, spec: HostNetworkAttachmentSpec) -> HostNetworkAttachment {
    HostNetworkAttachment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec,
    }
}

/// Access-mode attachment spec on the given VLAN
pub fn access_spec(vlan: i32) -> HostNetworkAttachmentSpec {
    HostNetworkAttachmentSpec {
        mode: SwitchportMode::Access,
        native_vlan: vlan,
        allowed_vlans: vec![],
        mtu: None,
    }
}

/// Helper to create a test BareMetalSwitch
pub fn create_test_switch(
    name: &str,
    namespace: &str,
    mac: &str,
    credential_type: SwitchCredentialType,
    secret_name: &str,
) -> BareMetalSwitch {
    BareMetalSwitch {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: BareMetalSwitchSpec {
            address: "192.0.2.10".to_string(),
            mac_address: mac.to_string(),
            driver: None,
            device_type: "netmiko_dell_os10".to_string(),
            credentials: SwitchCredentials {
                credential_type,
                secret_name: secret_name.to_string(),
            },
            port: None,
            disable_certificate_verification: None,
        },
    }
}

/// Helper to create a test Secret
pub fn create_test_secret(name: &str, namespace: &str, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

/// Helper to create a test Ironic node
pub fn create_test_node(uuid: &str, name: &str) -> Node {
    Node {
        uuid: uuid.to_string(),
        name: Some(name.to_string()),
        driver: "redfish".to_string(),
        driver_info: Map::new(),
        provision_state: Some("manageable".to_string()),
        last_error: None,
    }
}

/// Helper to create a test Ironic port
pub fn create_test_port(uuid: &str, node_uuid: &str, mac: &str, pxe: bool) -> Port {
    Port {
        uuid: uuid.to_string(),
        address: mac.to_string(),
        node_uuid: node_uuid.to_string(),
        pxe_enabled: pxe,
        local_link_connection: Map::new(),
        extra: Map::new(),
    }
}

/// AdmissionReview body for a HostNetworkAttachment request
pub fn admission_review_json(
    operation: &str,
    old: Option<&HostNetworkAttachment>,
    new: Option<&HostNetworkAttachment>,
) -> Value {
    let subject = new.or(old);
    let meta = |f: fn(&ObjectMeta) -> Option<&String>| {
        subject
            .and_then(|a| f(&a.metadata))
            .cloned()
            .unwrap_or_default()
    };
    serde_json::json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": {"group": "metal3.io", "version": "v1alpha1", "kind": "HostNetworkAttachment"},
            "resource": {"group": "metal3.io", "version": "v1alpha1", "resource": "hostnetworkattachments"},
            "name": meta(|m| m.name.as_ref()),
            "namespace": meta(|m| m.namespace.as_ref()),
            "operation": operation,
            "userInfo": {"username": "admin"},
            "object": new,
            "oldObject": old,
            "dryRun": false,
        }
    })
}

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// In-memory `ClusterStore` for reconciler tests
#[derive(Clone, Default)]
pub struct InMemoryClusterStore {
    attachments: Arc<Mutex<HashMap<Key, HostNetworkAttachment>>>,
    switches: Arc<Mutex<Vec<BareMetalSwitch>>>,
    secrets: Arc<Mutex<BTreeMap<Key, Secret>>>,
    failing_attachments: Arc<Mutex<Vec<Key>>>,
    secret_writes: Arc<Mutex<Vec<Key>>>,
    status_patches: Arc<Mutex<Vec<(Key, Value)>>>,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_attachment(&self, attachment: HostNetworkAttachment) {
        let k = key(
            attachment.metadata.namespace.as_deref().unwrap_or_default(),
            attachment.metadata.name.as_deref().unwrap_or_default(),
        );
        self.attachments.lock().unwrap().insert(k, attachment);
    }

    /// Make reads of this attachment fail with an API error
    pub fn fail_attachment(&self, namespace: &str, name: &str) {
        self.failing_attachments.lock().unwrap().push(key(namespace, name));
    }

    pub fn add_switch(&self, switch: BareMetalSwitch) {
        self.switches.lock().unwrap().push(switch);
    }

    pub fn add_secret(&self, secret: Secret) {
        let k = key(
            secret.metadata.namespace.as_deref().unwrap_or_default(),
            secret.metadata.name.as_deref().unwrap_or_default(),
        );
        self.secrets.lock().unwrap().insert(k, secret);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.secrets.lock().unwrap().get(&key(namespace, name)).cloned()
    }

    /// Data of a secret as UTF-8 strings
    pub fn secret_strings(&self, namespace: &str, name: &str) -> BTreeMap<String, String> {
        self.secret(namespace, name)
            .and_then(|s| s.data)
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, String::from_utf8_lossy(&v.0).into_owned()))
            .collect()
    }

    pub fn secret_write_count(&self) -> usize {
        self.secret_writes.lock().unwrap().len()
    }

    pub fn status_patches(&self) -> Vec<Value> {
        self.status_patches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, patch)| patch.clone())
            .collect()
    }
}

#[async_trait]
impl ClusterStore for InMemoryClusterStore {
    async fn get_attachment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<HostNetworkAttachment>, ControllerError> {
        let k = key(namespace, name);
        if self.failing_attachments.lock().unwrap().contains(&k) {
            return Err(ControllerError::Watch("injected attachment read failure".to_string()));
        }
        Ok(self.attachments.lock().unwrap().get(&k).cloned())
    }

    async fn list_switches(&self, namespace: &str) -> Result<Vec<BareMetalSwitch>, ControllerError> {
        Ok(self
            .switches
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ControllerError> {
        Ok(self.secret(namespace, name))
    }

    async fn replace_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ControllerError> {
        let name = secret.metadata.name.as_deref().unwrap_or_default();
        self.secret_writes.lock().unwrap().push(key(namespace, name));
        self.add_secret(secret.clone());
        Ok(())
    }

    async fn patch_host_status(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<(), ControllerError> {
        self.status_patches
            .lock()
            .unwrap()
            .push((key(namespace, name), patch.clone()));
        Ok(())
    }
}
