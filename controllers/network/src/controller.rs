//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! and Ironic clients into the reconciler and runs:
//! - the BareMetalHost network reconciler
//! - the switch configuration reconciler
//! - the BareMetalHost reference index feeding the admission webhook
//! - the admission webhook and probe server

use crate::cluster::KubeClusterStore;
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use crate::webhook;
use crate::webhook::guard::AttachmentGuard;
use crate::webhook::reference_index::ReferenceIndex;
use crds::{BareMetalHost, BareMetalSwitch};
use ironic_client::IronicClient;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Main controller for bare-metal host networking.
pub struct Controller {
    host_watcher: JoinHandle<Result<(), ControllerError>>,
    switch_config_watcher: JoinHandle<Result<(), ControllerError>>,
    reference_index_watcher: JoinHandle<Result<(), ControllerError>>,
    webhook_server: JoinHandle<Result<(), ControllerError>>,
}

/// Namespaced API when a watch namespace is configured, cluster-wide otherwise.
fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

impl Controller {
    /// Creates a new controller instance and spawns its tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Network Controller");

        let kube_client = Client::try_default().await?;

        let ironic_client = IronicClient::new(config.ironic_url.clone(), config.ironic_auth.clone())
            .map_err(|e| {
                error!("Failed to create Ironic client for {}: {}", config.ironic_url, e);
                ControllerError::Ironic(e)
            })?;

        let namespace = config.namespace.as_deref();
        let host_api: Api<BareMetalHost> = scoped_api(&kube_client, namespace);
        let switch_api: Api<BareMetalSwitch> = scoped_api(&kube_client, namespace);
        let secret_api: Api<Secret> = scoped_api(&kube_client, namespace);

        let reconciler = Arc::new(Reconciler::new(
            Box::new(KubeClusterStore::new(kube_client.clone())),
            Box::new(ironic_client),
            config.switch_secrets.clone(),
        ));

        let index = Arc::new(ReferenceIndex::new());
        let guard = Arc::new(AttachmentGuard::new(index.clone()));

        let watcher_instance = Arc::new(Watcher::new(
            reconciler,
            host_api,
            switch_api,
            secret_api,
            index,
            config.max_concurrent_reconciles,
        ));

        let host_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_hosts().await })
        };
        let switch_config_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_switch_configs().await })
        };
        let reference_index_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_host_references().await })
        };
        let bind_address = config.webhook_bind_address;
        let webhook_server = tokio::spawn(async move { webhook::serve(bind_address, guard).await });

        Ok(Self {
            host_watcher,
            switch_config_watcher,
            reference_index_watcher,
            webhook_server,
        })
    }

    /// Runs until any task stops.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Network Controller running");

        tokio::select! {
            result = &mut self.host_watcher => {
                result
                    .map_err(|e| ControllerError::Watch(format!("BareMetalHost watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("BareMetalHost watcher error: {}", e)))?;
            }
            result = &mut self.switch_config_watcher => {
                result
                    .map_err(|e| ControllerError::Watch(format!("Switch config watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Switch config watcher error: {}", e)))?;
            }
            result = &mut self.reference_index_watcher => {
                result
                    .map_err(|e| ControllerError::Watch(format!("Reference index watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Reference index watcher error: {}", e)))?;
            }
            result = &mut self.webhook_server => {
                result
                    .map_err(|e| ControllerError::Webhook(format!("webhook server panicked: {}", e)))??;
            }
        }

        Ok(())
    }
}
