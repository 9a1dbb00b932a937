//! Kubernetes object access used by the reconcilers.
//!
//! The reconcilers only need a handful of reads and writes; putting them
//! behind `ClusterStore` lets unit tests run against an in-memory cluster.

use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{BareMetalHost, BareMetalSwitch, HostNetworkAttachment};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Cluster reads and writes performed during reconciliation.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch an attachment; `None` when it does not exist.
    async fn get_attachment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<HostNetworkAttachment>, ControllerError>;

    /// List all switches of a namespace.
    async fn list_switches(&self, namespace: &str) -> Result<Vec<BareMetalSwitch>, ControllerError>;

    /// Fetch a secret; `None` when it does not exist.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ControllerError>;

    /// Replace a secret. The secret's resourceVersion guards against lost updates.
    async fn replace_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ControllerError>;

    /// Merge-patch the status subresource of a host.
    async fn patch_host_status(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), ControllerError>;
}

/// `ClusterStore` backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl KubeClusterStore {
    /// Wrap a Kubernetes client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn get_attachment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<HostNetworkAttachment>, ControllerError> {
        let api: Api<HostNetworkAttachment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn list_switches(&self, namespace: &str) -> Result<Vec<BareMetalSwitch>, ControllerError> {
        let api: Api<BareMetalSwitch> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&Default::default()).await?;
        Ok(list.items)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, ControllerError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn replace_secret(&self, namespace: &str, secret: &Secret) -> Result<(), ControllerError> {
        let name = secret
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("secret has no name".to_string()))?;
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.replace(name, &PostParams::default(), secret).await?;
        debug!("Replaced secret {}/{}", namespace, name);
        Ok(())
    }

    async fn patch_host_status(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), ControllerError> {
        let api: Api<BareMetalHost> = Api::namespaced(self.client.clone(), namespace);
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}
