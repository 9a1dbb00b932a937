//! Controller configuration loaded from environment variables.

use crate::error::ControllerError;
use crate::reconciler::switch_config::SwitchSecretSettings;
use ironic_client::BasicAuth;
use std::net::SocketAddr;
use tracing::info;

const DEFAULT_IRONIC_URL: &str = "http://ironic:6385";
const DEFAULT_WEBHOOK_BIND_ADDRESS: &str = "0.0.0.0:9443";
const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 3;

/// Runtime configuration of the network controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Base URL of the Ironic API
    pub ironic_url: String,
    /// Optional HTTP basic auth for Ironic
    pub ironic_auth: Option<BasicAuth>,
    /// Namespace to watch; all namespaces when unset
    pub namespace: Option<String>,
    /// Names and mount path of the generated switch secrets
    pub switch_secrets: SwitchSecretSettings,
    /// Listen address of the admission webhook and probes.
    ///
    /// Plain HTTP. The API server requires HTTPS for webhooks, so TLS is
    /// terminated by a sidecar or the service mesh proxy in front of it.
    pub webhook_bind_address: SocketAddr,
    /// Reconcile concurrency per controller
    pub max_concurrent_reconciles: u16,
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ironic_auth = match (get("IRONIC_USERNAME"), get("IRONIC_PASSWORD")) {
            (Some(username), Some(password)) => Some(BasicAuth { username, password }),
            (None, None) => None,
            _ => {
                return Err(ControllerError::InvalidConfig(
                    "IRONIC_USERNAME and IRONIC_PASSWORD must be set together".to_string(),
                ));
            }
        };

        let bind = get("WEBHOOK_BIND_ADDRESS").unwrap_or_else(|| DEFAULT_WEBHOOK_BIND_ADDRESS.to_string());
        let webhook_bind_address = bind.parse::<SocketAddr>().map_err(|e| {
            ControllerError::InvalidConfig(format!("invalid WEBHOOK_BIND_ADDRESS {}: {}", bind, e))
        })?;

        let max_concurrent_reconciles = match get("MAX_CONCURRENT_RECONCILES") {
            Some(value) => match value.parse::<u16>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ControllerError::InvalidConfig(format!(
                        "MAX_CONCURRENT_RECONCILES must be a positive integer, got {}",
                        value
                    )));
                }
            },
            None => DEFAULT_MAX_CONCURRENT_RECONCILES,
        };

        let defaults = SwitchSecretSettings::default();
        Ok(Self {
            ironic_url: get("IRONIC_URL").unwrap_or_else(|| DEFAULT_IRONIC_URL.to_string()),
            ironic_auth,
            namespace: get("WATCH_NAMESPACE"),
            switch_secrets: SwitchSecretSettings {
                configs_secret: get("IRONIC_SWITCH_CONFIGS_SECRET").unwrap_or(defaults.configs_secret),
                credentials_secret: get("IRONIC_SWITCH_CREDENTIALS_SECRET")
                    .unwrap_or(defaults.credentials_secret),
                credentials_path: get("IRONIC_SWITCH_CREDENTIALS_PATH").unwrap_or(defaults.credentials_path),
            },
            webhook_bind_address,
            max_concurrent_reconciles,
        })
    }

    /// Log the effective configuration, without secrets.
    pub fn log_summary(&self) {
        info!("Configuration:");
        info!("  Ironic URL: {}", self.ironic_url);
        info!("  Ironic auth: {}", if self.ironic_auth.is_some() { "basic" } else { "none" });
        info!("  Namespace: {}", self.namespace.as_deref().unwrap_or("all namespaces"));
        info!("  Switch configs secret: {}", self.switch_secrets.configs_secret);
        info!("  Switch credentials secret: {}", self.switch_secrets.credentials_secret);
        info!("  Switch credentials path: {}", self.switch_secrets.credentials_path);
        info!("  Webhook address: {}", self.webhook_bind_address);
        info!("  Max concurrent reconciles: {}", self.max_concurrent_reconciles);
    }
}
