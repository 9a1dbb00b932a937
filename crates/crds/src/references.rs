//! Kubernetes object references between metal3.io CRDs
//!
//! Host interfaces point at `HostNetworkAttachment` resources by name and an
//! optional namespace. An omitted namespace means "the namespace of the host".

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference from a host interface to a `HostNetworkAttachment`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostNetworkAttachmentRef {
    /// Name of the HostNetworkAttachment resource
    #[serde(default)]
    pub name: String,

    /// Namespace of the HostNetworkAttachment (defaults to the host namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl HostNetworkAttachmentRef {
    /// Create a reference to an attachment in the host's own namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Create a reference to an attachment in another namespace
    pub fn with_namespace(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// Namespace the attachment lives in, falling back to the host namespace.
    ///
    /// An empty namespace string is treated the same as an omitted one.
    pub fn effective_namespace<'a>(&'a self, host_namespace: &'a str) -> &'a str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => host_namespace,
        }
    }

    /// Index key `"<namespace>/<name>"` identifying the referenced attachment.
    pub fn index_key(&self, host_namespace: &str) -> String {
        format!("{}/{}", self.effective_namespace(host_namespace), self.name)
    }
}
