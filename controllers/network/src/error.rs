//! Controller-specific error types.
//!
//! This module defines error types specific to the Network Controller
//! that are not covered by upstream library errors.

use ironic_client::IronicError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Network Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Ironic API error
    #[error("Ironic error: {0}")]
    Ironic(#[from] IronicError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The host has no Ironic node yet
    #[error("node not registered with Ironic for host {0}")]
    NodeNotRegistered(String),

    /// Some NICs could not be brought in line with their desired port state
    #[error("failed to ensure {failed}/{total} ports: {summary}")]
    PortReconciliation {
        /// Number of NICs that failed
        failed: usize,
        /// Number of NICs processed
        total: usize,
        /// First few failures, `name(mac): error` joined by "; "
        summary: String,
    },

    /// A referenced attachment could not be read
    #[error("failed to get network attachment {key}: {source}")]
    AttachmentLookup {
        /// `namespace/name` of the attachment
        key: String,
        /// Underlying error
        #[source]
        source: Box<ControllerError>,
    },

    /// Secret not found
    #[error("secret not found: {0}")]
    SecretNotFound(String),

    /// A credentials secret lacks a required key
    #[error("credentials secret {secret} missing '{key}' key")]
    MissingSecretKey {
        /// Secret name
        secret: String,
        /// Missing data key
        key: &'static str,
    },

    /// Rendering the configuration of one switch failed
    #[error("failed to generate config for switch {switch}: {source}")]
    SwitchConfig {
        /// Switch name
        switch: String,
        /// Underlying error
        #[source]
        source: Box<ControllerError>,
    },

    /// The host reference index is unusable
    #[error("Reference index error: {0}")]
    ReferenceIndex(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Admission webhook server failed
    #[error("Webhook server error: {0}")]
    Webhook(String),
}

impl ControllerError {
    /// Whether retrying the same reconciliation later may succeed.
    ///
    /// Configuration errors, missing credentials and Ironic rejections need
    /// a user change; everything else is retried with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidConfig(_) | Self::MissingSecretKey { .. } => false,
            Self::Ironic(e) => e.is_transient(),
            Self::SwitchConfig { source, .. } | Self::AttachmentLookup { source, .. } => {
                source.is_transient()
            }
            _ => true,
        }
    }
}
