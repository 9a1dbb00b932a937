//! Mock IronicClient for unit testing
//!
//! Stores nodes and ports in memory, applies patches to them and records
//! every mutating call so tests can assert on what was sent.

use crate::error::IronicError;
use crate::ironic_trait::IronicClientTrait;
use crate::models::*;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Mock IronicClient for testing
#[derive(Clone, Debug)]
pub struct MockIronicClient {
    base_url: String,
    nodes: Arc<Mutex<HashMap<String, Node>>>,
    ports: Arc<Mutex<Vec<Port>>>,
    node_patches: Arc<Mutex<Vec<(String, Vec<PatchOperation>)>>>,
    port_patches: Arc<Mutex<Vec<(String, Vec<PatchOperation>)>>>,
    created_ports: Arc<Mutex<Vec<CreatePortRequest>>>,
    failing_addresses: Arc<Mutex<HashSet<String>>>,
    node_create_conflict: Arc<Mutex<bool>>,
    next_id: Arc<Mutex<u64>>,
}

impl MockIronicClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            nodes: Arc::new(Mutex::new(HashMap::new())),
            ports: Arc::new(Mutex::new(Vec::new())),
            node_patches: Arc::new(Mutex::new(Vec::new())),
            port_patches: Arc::new(Mutex::new(Vec::new())),
            created_ports: Arc::new(Mutex::new(Vec::new())),
            failing_addresses: Arc::new(Mutex::new(HashSet::new())),
            node_create_conflict: Arc::new(Mutex::new(false)),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    fn next_uuid(&self, prefix: &str) -> String {
        let mut id = self.next_id.lock().unwrap();
        let uuid = format!("{}-{:04}", prefix, *id);
        *id += 1;
        uuid
    }

    /// Add a node to the mock store
    pub fn add_node(&self, node: Node) {
        self.nodes.lock().unwrap().insert(node.uuid.clone(), node);
    }

    /// Add an existing port to the mock store
    pub fn add_port(&self, port: Port) {
        self.ports.lock().unwrap().push(port);
    }

    /// Make every create/update of a port with this MAC fail
    pub fn fail_port_operations_for(&self, address: &str) {
        self.failing_addresses
            .lock()
            .unwrap()
            .insert(address.to_lowercase());
    }

    /// Make node creation answer 409 Conflict
    pub fn set_node_create_conflict(&self, conflict: bool) {
        *self.node_create_conflict.lock().unwrap() = conflict;
    }

    /// Snapshot of all stored ports
    pub fn ports(&self) -> Vec<Port> {
        self.ports.lock().unwrap().clone()
    }

    /// Snapshot of all stored nodes
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.lock().unwrap().values().cloned().collect()
    }

    /// Port creation requests received, in order
    pub fn created_ports(&self) -> Vec<CreatePortRequest> {
        self.created_ports.lock().unwrap().clone()
    }

    /// Port patch calls received, in order
    pub fn port_patches(&self) -> Vec<(String, Vec<PatchOperation>)> {
        self.port_patches.lock().unwrap().clone()
    }

    /// Node patch calls received, in order
    pub fn node_patches(&self) -> Vec<(String, Vec<PatchOperation>)> {
        self.node_patches.lock().unwrap().clone()
    }

    fn check_failure(&self, address: &str) -> Result<(), IronicError> {
        if self
            .failing_addresses
            .lock()
            .unwrap()
            .contains(&address.to_lowercase())
        {
            return Err(IronicError::Api(format!("injected failure for {}", address)));
        }
        Ok(())
    }
}

fn apply_port_patch(port: &mut Port, patch: &[PatchOperation]) -> Result<(), IronicError> {
    for op in patch {
        let value = match op {
            PatchOperation::Add { value, .. } | PatchOperation::Replace { value, .. } => Some(value.clone()),
            PatchOperation::Remove { .. } => None,
        };
        match (op.path(), value) {
            ("/pxe_enabled", Some(Value::Bool(pxe))) => port.pxe_enabled = pxe,
            ("/local_link_connection", Some(Value::Object(map))) => port.local_link_connection = map,
            ("/local_link_connection", None) => port.local_link_connection.clear(),
            (path, value) if path.starts_with("/extra/") => {
                let key = path.trim_start_matches("/extra/").to_string();
                match value {
                    Some(value) => {
                        port.extra.insert(key, value);
                    }
                    None => {
                        port.extra.remove(&key);
                    }
                }
            }
            (path, _) => {
                return Err(IronicError::InvalidRequest(format!("unsupported patch path {}", path)));
            }
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl IronicClientTrait for MockIronicClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_node(&self, request: &CreateNodeRequest) -> Result<Node, IronicError> {
        if *self.node_create_conflict.lock().unwrap() {
            return Err(IronicError::Conflict(format!("node {} is locked", request.name)));
        }
        let node = Node {
            uuid: self.next_uuid("node"),
            name: Some(request.name.clone()),
            driver: request.driver.clone(),
            driver_info: request.driver_info.clone(),
            provision_state: Some("enroll".to_string()),
            last_error: None,
        };
        self.add_node(node.clone());
        Ok(node)
    }

    async fn get_node(&self, ident: &str) -> Result<Node, IronicError> {
        self.nodes
            .lock()
            .unwrap()
            .values()
            .find(|n| n.uuid == ident || n.name.as_deref() == Some(ident))
            .cloned()
            .ok_or_else(|| IronicError::NotFound(format!("Node {} not found", ident)))
    }

    async fn update_node(&self, ident: &str, patch: &[PatchOperation]) -> Result<Node, IronicError> {
        self.node_patches
            .lock()
            .unwrap()
            .push((ident.to_string(), patch.to_vec()));
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .values_mut()
            .find(|n| n.uuid == ident || n.name.as_deref() == Some(ident))
            .ok_or_else(|| IronicError::NotFound(format!("Node {} not found", ident)))?;
        for op in patch {
            if let PatchOperation::Add { path, value } | PatchOperation::Replace { path, value } = op {
                if path == "/driver_info" {
                    if let Value::Object(map) = value {
                        node.driver_info = map.clone();
                    }
                }
            }
        }
        Ok(node.clone())
    }

    async fn list_node_ports(&self, node_uuid: &str) -> Result<Vec<Port>, IronicError> {
        Ok(self
            .ports
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.node_uuid == node_uuid)
            .cloned()
            .collect())
    }

    async fn list_ports_by_address(&self, address: &str) -> Result<Vec<Port>, IronicError> {
        Ok(self
            .ports
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.address.eq_ignore_ascii_case(address))
            .cloned()
            .collect())
    }

    async fn create_port(&self, request: &CreatePortRequest) -> Result<Port, IronicError> {
        self.check_failure(&request.address)?;
        let mut ports = self.ports.lock().unwrap();
        if ports.iter().any(|p| p.address.eq_ignore_ascii_case(&request.address)) {
            return Err(IronicError::Conflict(format!(
                "A port with MAC address {} already exists",
                request.address
            )));
        }
        let port = Port {
            uuid: self.next_uuid("port"),
            address: request.address.clone(),
            node_uuid: request.node_uuid.clone(),
            pxe_enabled: request.pxe_enabled,
            local_link_connection: request.local_link_connection.clone().unwrap_or_default(),
            extra: request.extra.clone().unwrap_or_default(),
        };
        ports.push(port.clone());
        self.created_ports.lock().unwrap().push(request.clone());
        Ok(port)
    }

    async fn update_port(&self, port_uuid: &str, patch: &[PatchOperation]) -> Result<Port, IronicError> {
        let mut ports = self.ports.lock().unwrap();
        let port = ports
            .iter_mut()
            .find(|p| p.uuid == port_uuid)
            .ok_or_else(|| IronicError::NotFound(format!("Port {} not found", port_uuid)))?;
        self.check_failure(&port.address)?;
        self.port_patches
            .lock()
            .unwrap()
            .push((port_uuid.to_string(), patch.to_vec()));
        apply_port_patch(port, patch)?;
        Ok(port.clone())
    }
}
