//! Kubernetes resource watchers.
//!
//! Hosts and switch configurations are reconciled through
//! `kube_runtime::Controller` via the generic `watch_resource()` helper,
//! which adds per-resource Fibonacci backoff on errors. The reference
//! index is fed by a plain watcher stream.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::reconciler::switch_config::switches_referencing_secret;
use crate::webhook::reference_index::ReferenceIndex;
use crds::{BareMetalHost, BareMetalSwitch};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, ResourceExt};
use kube_runtime::reflector::{self, ObjectRef};
use kube_runtime::{
    Controller, WatchStreamExt,
    controller::{Action, Config as ControllerConfig},
    watcher,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Backoff key of a resource: `Kind/namespace/name`.
fn resource_key<K: kube::Resource>(resource_name: &str, obj: &K) -> String {
    format!(
        "{}/{}/{}",
        resource_name,
        obj.namespace().unwrap_or_default(),
        obj.name_any()
    )
}

/// Drive a prepared `kube_runtime::Controller` until its stream ends.
///
/// Errors requeue with the per-resource backoff of the reconciler (the
/// longest delay for errors that need a user change); a success resets it.
async fn watch_resource<K, F>(
    controller: Controller<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
    concurrency: u16,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = resource_key(resource_name, &*obj);
        error!("Reconciliation error for {}: {}", key, error);
        Action::requeue(ctx.next_backoff(&key, error.is_transient()))
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let key = resource_key(resource_name, &*obj);
            debug!("Reconciling {}", key);
            let action = reconcile_fn(ctx.clone(), obj).await?;
            ctx.reset_backoff(&key);
            Ok::<Action, ControllerError>(action)
        }
    };

    // Debounce batches bursts of status updates into one reconcile
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(concurrency);

    controller
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {} {}", resource_name, obj.name),
                Err(e) => warn!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    Ok(())
}

/// Watches hosts, switches and secrets.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    host_api: Api<BareMetalHost>,
    switch_api: Api<BareMetalSwitch>,
    secret_api: Api<Secret>,
    index: Arc<ReferenceIndex>,
    configs_secret: String,
    concurrency: u16,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        reconciler: Arc<Reconciler>,
        host_api: Api<BareMetalHost>,
        switch_api: Api<BareMetalSwitch>,
        secret_api: Api<Secret>,
        index: Arc<ReferenceIndex>,
        concurrency: u16,
    ) -> Self {
        let configs_secret = reconciler.switch_secrets.configs_secret.clone();
        Self {
            reconciler,
            host_api,
            switch_api,
            secret_api,
            index,
            configs_secret,
            concurrency,
        }
    }

    /// Starts reconciling BareMetalHost network interfaces.
    pub async fn watch_hosts(&self) -> Result<(), ControllerError> {
        watch_resource(
            Controller::new(self.host_api.clone(), watcher::Config::default()),
            self.reconciler.clone(),
            |reconciler, host| {
                Box::pin(async move {
                    match reconciler.reconcile_host(&*host).await {
                        Ok(()) => Ok(Action::await_change()),
                        Err(e) => Err(e),
                    }
                })
            },
            "BareMetalHost",
            self.concurrency,
        )
        .await
    }

    /// Starts regenerating switch configuration secrets.
    ///
    /// The generated configs secret of each namespace is the reconcile root.
    /// Switch events, deletes included, and changes to credential secrets
    /// referenced by a switch are mapped onto it, so every pass rebuilds the
    /// full configuration of one namespace.
    pub async fn watch_switch_configs(&self) -> Result<(), ControllerError> {
        let (switches, writer) = reflector::store::<BareMetalSwitch>();
        let switch_cache = reflector::reflector(
            writer,
            watcher(self.switch_api.clone(), watcher::Config::default()),
        )
        .default_backoff()
        .touched_objects()
        .for_each(|res| async move {
            if let Err(e) = res {
                warn!("BareMetalSwitch cache watch error: {}", e);
            }
        });

        let configs_secret = self.configs_secret.clone();
        let root = move |namespace: Option<String>| {
            namespace.map(|ns| ObjectRef::<Secret>::new(&configs_secret).within(&ns))
        };
        let switch_root = root.clone();

        let controller = Controller::new(
            self.secret_api.clone(),
            watcher::Config::default().fields(&format!("metadata.name={}", self.configs_secret)),
        )
        .watches(
            self.switch_api.clone(),
            watcher::Config::default(),
            move |switch: BareMetalSwitch| switch_root(switch.namespace()),
        )
        .watches(
            self.secret_api.clone(),
            watcher::Config::default(),
            move |secret: Secret| {
                let namespace = secret.namespace()?;
                let cached = switches.state();
                let referencing = switches_referencing_secret(
                    cached.iter().map(|switch| &**switch),
                    &namespace,
                    &secret.name_any(),
                );
                if referencing.is_empty() {
                    return None;
                }
                debug!(
                    "Secret {}/{} changed, referenced by switches {:?}",
                    namespace,
                    secret.name_any(),
                    referencing
                );
                root(Some(namespace))
            },
        );

        let configs = watch_resource(
            controller,
            self.reconciler.clone(),
            |reconciler, secret| {
                Box::pin(async move {
                    let namespace = secret.namespace().unwrap_or_default();
                    match reconciler.reconcile_switch_configs(&namespace).await {
                        Ok(()) => Ok(Action::await_change()),
                        Err(e) => Err(e),
                    }
                })
            },
            "SwitchConfig",
            self.concurrency,
        );

        tokio::select! {
            () = switch_cache => Err(ControllerError::Watch("BareMetalSwitch cache stream ended".to_string())),
            result = configs => result,
        }
    }

    /// Keeps the attachment reference index in sync with BareMetalHosts.
    ///
    /// Hosts of an initial or re-list are buffered and swapped in at once,
    /// which is also when the index first becomes ready.
    pub async fn watch_host_references(&self) -> Result<(), ControllerError> {
        info!("Starting BareMetalHost reference index watcher");

        let index_error = |e: crate::webhook::reference_index::IndexError| {
            ControllerError::ReferenceIndex(e.to_string())
        };
        let mut stream = Box::pin(
            watcher(self.host_api.clone(), watcher::Config::default()).default_backoff(),
        );
        let mut initial = Vec::new();

        while let Some(result) = stream.next().await {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    warn!("BareMetalHost reference watch error: {}", e);
                    continue;
                }
            };
            match event {
                watcher::Event::Apply(host) => {
                    debug!("Indexing references of host {}/{}", host.namespace_or_default(), host.name_any());
                    self.index.apply_host(&host).map_err(index_error)?;
                }
                watcher::Event::Delete(host) => {
                    debug!("Dropping references of host {}/{}", host.namespace_or_default(), host.name_any());
                    self.index.delete_host(&host).map_err(index_error)?;
                }
                watcher::Event::Init => {
                    initial.clear();
                }
                watcher::Event::InitApply(host) => {
                    initial.push(host);
                }
                watcher::Event::InitDone => {
                    self.index.replace_all(&initial).map_err(index_error)?;
                    info!("Reference index synced with {} host(s)", initial.len());
                    initial.clear();
                }
            }
        }

        Ok(())
    }
}
