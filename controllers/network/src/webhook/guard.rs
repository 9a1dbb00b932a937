//! Admission decisions for HostNetworkAttachment.
//!
//! Creates get field validation only. Spec changes and deletes are refused
//! while any host interface still references the attachment, and refused as
//! well when the reference index cannot answer.

use super::reference_index::{IndexError, InterfaceReference, ReferenceIndex};
use crds::HostNetworkAttachment;
use kube::ResourceExt;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, Operation};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Why an admission request was refused.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Field validation failed
    #[error("{}", aggregate(.0))]
    Invalid(Vec<String>),

    /// Spec change on a referenced attachment
    #[error("{}", immutable_message(.references, .validation_errors))]
    Immutable {
        /// Interfaces holding the attachment
        references: Vec<InterfaceReference>,
        /// Field errors found on the new spec
        validation_errors: Vec<String>,
    },

    /// Delete of a referenced attachment
    #[error(
        "hostnetworkattachments.metal3.io \"{name}\" is forbidden: cannot delete attachment while referenced by BMH interfaces: {}",
        join(.references)
    )]
    Forbidden {
        /// Attachment name
        name: String,
        /// Interfaces holding the attachment
        references: Vec<InterfaceReference>,
    },

    /// References could not be determined
    #[error("{context}: {source}")]
    LookupFailed {
        /// What was being checked
        context: &'static str,
        /// Index failure
        #[source]
        source: IndexError,
    },
}

fn join(references: &[InterfaceReference]) -> String {
    references
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A single message as is, several as `[a, b]`.
fn aggregate(messages: &[String]) -> String {
    match messages {
        [single] => single.clone(),
        _ => format!("[{}]", messages.join(", ")),
    }
}

fn immutable_message(references: &[InterfaceReference], validation_errors: &[String]) -> String {
    let mut messages = validation_errors.to_vec();
    messages.push(format!(
        "HostNetworkAttachment spec is immutable while referenced by BMH interfaces: {}",
        join(references)
    ));
    aggregate(&messages)
}

/// Validates HostNetworkAttachment admission requests.
#[derive(Debug, Clone)]
pub struct AttachmentGuard {
    index: Arc<ReferenceIndex>,
}

impl AttachmentGuard {
    /// Create a guard answering reference questions from `index`.
    pub fn new(index: Arc<ReferenceIndex>) -> Self {
        Self { index }
    }

    /// Whether reference lookups can be answered yet.
    pub fn is_ready(&self) -> bool {
        self.index.is_ready()
    }

    /// Validate a new attachment.
    pub fn validate_create(&self, attachment: &HostNetworkAttachment) -> Result<(), AdmissionError> {
        let errors = attachment.spec.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AdmissionError::Invalid(errors))
        }
    }

    /// Validate a change to an attachment.
    ///
    /// Unchanged specs are always allowed, even if they no longer validate.
    pub fn validate_update(
        &self,
        old: &HostNetworkAttachment,
        new: &HostNetworkAttachment,
    ) -> Result<(), AdmissionError> {
        if old.spec == new.spec {
            return Ok(());
        }
        let validation_errors = new.spec.validate();

        let namespace = old.namespace().unwrap_or_default();
        let references = self
            .index
            .lookup(&namespace, &old.name_any())
            .map_err(|source| AdmissionError::LookupFailed {
                context: "failed to check BMH references, cannot safely allow update",
                source,
            })?;

        if !references.is_empty() {
            return Err(AdmissionError::Immutable {
                references,
                validation_errors,
            });
        }
        if !validation_errors.is_empty() {
            return Err(AdmissionError::Invalid(validation_errors));
        }
        Ok(())
    }

    /// Validate the deletion of `namespace/name`.
    pub fn validate_delete(&self, namespace: &str, name: &str) -> Result<(), AdmissionError> {
        let references = self
            .index
            .lookup(namespace, name)
            .map_err(|source| AdmissionError::LookupFailed {
                context: "failed to check BMH references",
                source,
            })?;
        if references.is_empty() {
            return Ok(());
        }
        Err(AdmissionError::Forbidden {
            name: name.to_string(),
            references,
        })
    }

    /// Turn an admission request into an allow or deny response.
    pub fn review(&self, req: &AdmissionRequest<HostNetworkAttachment>) -> AdmissionResponse {
        let namespace = req.namespace.clone().unwrap_or_default();
        let outcome = match req.operation {
            Operation::Create => {
                info!("validate create {}/{}", namespace, req.name);
                match &req.object {
                    Some(attachment) => self.validate_create(attachment),
                    None => return missing_object(),
                }
            }
            Operation::Update => {
                info!("validate update {}/{}", namespace, req.name);
                match (&req.old_object, &req.object) {
                    (Some(old), Some(new)) => self.validate_update(old, new),
                    _ => return missing_object(),
                }
            }
            Operation::Delete => {
                info!("validate delete {}/{}", namespace, req.name);
                self.validate_delete(&namespace, &req.name)
            }
            Operation::Connect => Ok(()),
        };

        match outcome {
            Ok(()) => AdmissionResponse::from(req),
            Err(e) => {
                warn!("Denied {}/{}: {}", namespace, req.name, e);
                AdmissionResponse::from(req).deny(e.to_string())
            }
        }
    }
}

fn missing_object() -> AdmissionResponse {
    AdmissionResponse::invalid("expected a HostNetworkAttachment but got no object")
}
