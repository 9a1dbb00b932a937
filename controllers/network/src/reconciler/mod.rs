//! Reconciliation logic for the network controller.
//!
//! - `host_network`: BareMetalHost interface validation and switch-port drift
//! - `switch_config`: BareMetalSwitch driver configuration secrets

pub mod host_network;
pub mod switch_config;


use crate::backoff::FibonacciBackoff;
use crate::cluster::ClusterStore;
use host_network::PortUpdatePolicy;
use ironic_client::IronicClientTrait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use switch_config::SwitchSecretSettings;
use tracing::{debug, warn};

/// Backoff state for a resource
#[derive(Debug, Clone, Default)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

/// Reconciles hosts and switches.
pub struct Reconciler {
    pub(crate) store: Box<dyn ClusterStore>,
    pub(crate) ironic: Box<dyn IronicClientTrait>,
    pub(crate) port_update_policy: PortUpdatePolicy,
    pub(crate) switch_secrets: SwitchSecretSettings,
    /// Error count tracking per resource (kind/namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    /// Creates a new reconciler with the default port update policy.
    pub fn new(
        store: Box<dyn ClusterStore>,
        ironic: Box<dyn IronicClientTrait>,
        switch_secrets: SwitchSecretSettings,
    ) -> Self {
        Self {
            store,
            ironic,
            port_update_policy: PortUpdatePolicy::default(),
            switch_secrets,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Next retry delay for a failing resource.
    ///
    /// Errors that need a user change jump straight to the longest delay.
    pub(crate) fn next_backoff(&self, key: &str, transient: bool) -> Duration {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(key.to_string()).or_default();
        state.error_count += 1;
        let delay = if transient {
            state.backoff.next_backoff()
        } else {
            state.backoff.max_backoff()
        };
        warn!(
            "{} failed {} time(s) in a row, retrying in {}s",
            key,
            state.error_count,
            delay.as_secs()
        );
        delay
    }

    /// Forget the failure history of a resource after a successful reconcile.
    pub(crate) fn reset_backoff(&self, key: &str) {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = states.remove(key) {
            debug!("{} recovered after {} error(s)", key, state.error_count);
        }
    }
}

/// Status merge patch guarded by the observed resourceVersion.
///
/// A stale resourceVersion makes the API server answer 409 Conflict,
/// which sends the object back through the retry path.
pub(crate) fn guarded_status_patch(
    resource_version: Option<&str>,
    status: serde_json::Value,
) -> serde_json::Value {
    match resource_version {
        Some(rv) => serde_json::json!({
            "metadata": { "resourceVersion": rv },
            "status": status,
        }),
        None => serde_json::json!({ "status": status }),
    }
}
