//! Reverse index from HostNetworkAttachment to the host interfaces using it.
//!
//! Fed by a BareMetalHost watch stream. Until the initial list has been
//! applied the index refuses lookups, so callers fail closed instead of
//! mistaking an empty cache for "no references".

use crds::BareMetalHost;
use kube::ResourceExt;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::RwLock;
use thiserror::Error;

/// One host interface pointing at an attachment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceReference {
    /// Host namespace
    pub namespace: String,
    /// Host name
    pub host: String,
    /// Interface name (MAC when the interface has no name)
    pub interface: String,
}

impl fmt::Display for InterfaceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}[{}]", self.namespace, self.host, self.interface)
    }
}

/// Why a lookup could not be answered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Initial host list not yet received
    #[error("reference index has not finished its initial sync")]
    NotReady,

    /// A writer panicked while holding the index lock
    #[error("reference index lock poisoned")]
    Poisoned,
}

type HostKey = (String, String);

#[derive(Debug, Default)]
struct IndexState {
    ready: bool,
    /// attachment key -> references, per host
    hosts: HashMap<HostKey, Vec<(String, InterfaceReference)>>,
    attachments: HashMap<String, BTreeSet<InterfaceReference>>,
}

impl IndexState {
    fn remove(&mut self, host: &HostKey) {
        let Some(previous) = self.hosts.remove(host) else {
            return;
        };
        for (key, reference) in previous {
            if let Some(refs) = self.attachments.get_mut(&key) {
                refs.remove(&reference);
                if refs.is_empty() {
                    self.attachments.remove(&key);
                }
            }
        }
    }

    fn insert(&mut self, host: &BareMetalHost) {
        let key = host_key(host);
        self.remove(&key);

        let entries = host_references(host);
        if entries.is_empty() {
            return;
        }
        for (attachment, reference) in &entries {
            self.attachments
                .entry(attachment.clone())
                .or_default()
                .insert(reference.clone());
        }
        self.hosts.insert(key, entries);
    }
}

fn host_key(host: &BareMetalHost) -> HostKey {
    (host.namespace_or_default().to_string(), host.name_any())
}

/// Attachment keys and interface references declared by a host.
fn host_references(host: &BareMetalHost) -> Vec<(String, InterfaceReference)> {
    let namespace = host.namespace_or_default();
    host.spec
        .network_interfaces
        .iter()
        .filter(|iface| !iface.host_network_attachment.name.is_empty())
        .map(|iface| {
            (
                iface.host_network_attachment.index_key(namespace),
                InterfaceReference {
                    namespace: namespace.to_string(),
                    host: host.name_any(),
                    interface: iface.key().to_string(),
                },
            )
        })
        .collect()
}

/// Attachment to referencing interfaces, safe to share between the watch
/// task and request handlers.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    state: RwLock<IndexState>,
}

impl ReferenceIndex {
    /// Create an empty index that is not ready yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh the references of a host.
    pub fn apply_host(&self, host: &BareMetalHost) -> Result<(), IndexError> {
        self.state
            .write()
            .map_err(|_| IndexError::Poisoned)?
            .insert(host);
        Ok(())
    }

    /// Drop every reference of a deleted host.
    pub fn delete_host(&self, host: &BareMetalHost) -> Result<(), IndexError> {
        self.state
            .write()
            .map_err(|_| IndexError::Poisoned)?
            .remove(&host_key(host));
        Ok(())
    }

    /// Replace the whole index with a fresh listing and mark it ready.
    pub fn replace_all(&self, hosts: &[BareMetalHost]) -> Result<(), IndexError> {
        let mut state = self.state.write().map_err(|_| IndexError::Poisoned)?;
        state.hosts.clear();
        state.attachments.clear();
        for host in hosts {
            state.insert(host);
        }
        state.ready = true;
        Ok(())
    }

    /// Whether the initial listing has been applied.
    pub fn is_ready(&self) -> bool {
        self.state.read().map(|state| state.ready).unwrap_or(false)
    }

    /// Interfaces referencing `namespace/name`, sorted by host then interface.
    pub fn lookup(&self, namespace: &str, name: &str) -> Result<Vec<InterfaceReference>, IndexError> {
        let state = self.state.read().map_err(|_| IndexError::Poisoned)?;
        if !state.ready {
            return Err(IndexError::NotReady);
        }
        let key = format!("{}/{}", namespace, name);
        Ok(state
            .attachments
            .get(&key)
            .map(|refs| refs.iter().cloned().collect())
            .unwrap_or_default())
    }
}
