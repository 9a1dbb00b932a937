//! BareMetalSwitch driver configuration.
//!
//! Renders every switch of a namespace into an INI-style configuration blob
//! for the networking service and publishes it, together with the SSH keys of
//! publickey switches, into two pre-existing secrets. Secrets are only written
//! when their data actually changes.

use super::Reconciler;
use crate::cluster::ClusterStore;
use crate::error::ControllerError;
use crds::{BareMetalSwitch, SwitchCredentialType};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Data key of the rendered configuration in the configs secret
pub const SWITCH_CONFIG_KEY: &str = "switch-configs.conf";

/// First lines of every rendered configuration
pub const CONFIG_BANNER: &str = "# This file is managed by the Baremetal Operator\n\n";

/// Secrets the switch configuration is published to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchSecretSettings {
    /// Secret holding the rendered configuration
    pub configs_secret: String,
    /// Secret holding SSH private keys of publickey switches
    pub credentials_secret: String,
    /// Where the credentials secret is mounted for the networking service
    pub credentials_path: String,
}

impl Default for SwitchSecretSettings {
    fn default() -> Self {
        Self {
            configs_secret: "metal3-switch-configs".to_string(),
            credentials_secret: "metal3-switch-credentials".to_string(),
            credentials_path: "/etc/ironic/switch-credentials".to_string(),
        }
    }
}

/// Rendered configuration of all switches in a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchConfigSet {
    /// Config section per switch name
    pub entries: BTreeMap<String, Vec<u8>>,
    /// Private key per `<mac-with-dashes>.key` file name
    pub key_files: BTreeMap<String, Vec<u8>>,
}

impl SwitchConfigSet {
    /// Banner followed by every section, ordered by switch name.
    pub fn render(&self) -> Vec<u8> {
        let mut out = CONFIG_BANNER.as_bytes().to_vec();
        for entry in self.entries.values() {
            out.extend_from_slice(entry);
        }
        out
    }
}

/// How a switch authenticates, with the secret key it needs and the
/// configuration line it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwitchAuth {
    Password,
    PublicKey,
}

impl From<SwitchCredentialType> for SwitchAuth {
    fn from(credential_type: SwitchCredentialType) -> Self {
        match credential_type {
            SwitchCredentialType::Password => Self::Password,
            SwitchCredentialType::Publickey => Self::PublicKey,
        }
    }
}

impl SwitchAuth {
    fn required_key(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::PublicKey => "ssh-privatekey",
        }
    }

    fn render(
        self,
        switch: &BareMetalSwitch,
        credential: &[u8],
        credentials_path: &str,
        out: &mut Vec<u8>,
        key_files: &mut BTreeMap<String, Vec<u8>>,
    ) {
        match self {
            Self::Password => push_field(out, "password", credential),
            Self::PublicKey => {
                // colons are not valid in secret data keys
                let file_name = format!("{}.key", switch.spec.mac_address.replace(':', "-"));
                let path = key_file_path(credentials_path, &file_name);
                key_files.insert(file_name, credential.to_vec());
                push_field(out, "key_file", path.as_bytes());
            }
        }
    }
}

fn key_file_path(credentials_path: &str, file_name: &str) -> String {
    if credentials_path.is_empty() {
        return file_name.to_string();
    }
    format!("{}/{}", credentials_path.trim_end_matches('/'), file_name)
}

fn push_field(out: &mut Vec<u8>, key: &str, value: &[u8]) {
    out.extend_from_slice(key.as_bytes());
    out.push(b'=');
    out.extend_from_slice(value);
    out.push(b'\n');
}

/// Render the section of one switch into `set` using its credentials secret.
pub fn render_switch_entry(
    switch: &BareMetalSwitch,
    secret: &Secret,
    credentials_path: &str,
    set: &mut SwitchConfigSet,
) -> Result<(), ControllerError> {
    let spec = &switch.spec;
    let secret_name = &spec.credentials.secret_name;
    let lookup = |key: &'static str| {
        secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .map(|value| value.0.as_slice())
            .ok_or_else(|| ControllerError::MissingSecretKey {
                secret: secret_name.clone(),
                key,
            })
    };

    let username = lookup("username")?;
    let auth = SwitchAuth::from(spec.credentials.credential_type);
    let credential = lookup(auth.required_key())?;

    let name = switch.name_any();
    let mut out = format!("[switch:{}]\n", name).into_bytes();
    push_field(&mut out, "address", spec.address.as_bytes());
    push_field(&mut out, "mac_address", spec.mac_address.as_bytes());
    if let Some(port) = spec.port {
        push_field(&mut out, "port", port.to_string().as_bytes());
    }
    push_field(&mut out, "driver_type", spec.driver_or_default().as_bytes());
    push_field(&mut out, "device_type", spec.device_type.as_bytes());
    if let Some(insecure) = spec.disable_certificate_verification {
        push_field(&mut out, "insecure", insecure.to_string().as_bytes());
    }
    push_field(&mut out, "username", username);
    auth.render(switch, credential, credentials_path, &mut out, &mut set.key_files);
    out.push(b'\n');

    set.entries.insert(name, out);
    Ok(())
}

async fn render_switch(
    store: &dyn ClusterStore,
    namespace: &str,
    switch: &BareMetalSwitch,
    credentials_path: &str,
    set: &mut SwitchConfigSet,
) -> Result<(), ControllerError> {
    let secret_name = &switch.spec.credentials.secret_name;
    let secret = store
        .get_secret(namespace, secret_name)
        .await?
        .ok_or_else(|| ControllerError::SecretNotFound(format!("{}/{}", namespace, secret_name)))?;
    render_switch_entry(switch, &secret, credentials_path, set)
}

/// Render every switch of `namespace`. Any failing switch fails the whole set.
pub async fn generate_switch_config(
    store: &dyn ClusterStore,
    namespace: &str,
    credentials_path: &str,
) -> Result<SwitchConfigSet, ControllerError> {
    let mut set = SwitchConfigSet::default();
    for switch in store.list_switches(namespace).await? {
        render_switch(store, namespace, &switch, credentials_path, &mut set)
            .await
            .map_err(|e| ControllerError::SwitchConfig {
                switch: switch.name_any(),
                source: Box::new(e),
            })?;
    }
    Ok(set)
}

/// Whether a secret's current data equals `desired`. Absent and empty data are equal.
pub fn secret_data_equal(
    current: Option<&BTreeMap<String, ByteString>>,
    desired: &BTreeMap<String, Vec<u8>>,
) -> bool {
    if current.map_or(0, BTreeMap::len) != desired.len() {
        return false;
    }
    desired.iter().all(|(key, value)| {
        current
            .and_then(|data| data.get(key))
            .is_some_and(|existing| existing.0 == *value)
    })
}

/// Replace the data of an existing secret. Returns whether a write happened.
pub async fn update_secret_data(
    store: &dyn ClusterStore,
    namespace: &str,
    name: &str,
    data: BTreeMap<String, Vec<u8>>,
) -> Result<bool, ControllerError> {
    let mut secret = store
        .get_secret(namespace, name)
        .await?
        .ok_or_else(|| ControllerError::SecretNotFound(format!("{}/{}", namespace, name)))?;

    if secret_data_equal(secret.data.as_ref(), &data) {
        debug!("Secret {}/{} is up to date", namespace, name);
        return Ok(false);
    }

    secret.data = Some(data.into_iter().map(|(k, v)| (k, ByteString(v))).collect());
    store.replace_secret(namespace, &secret).await?;
    Ok(true)
}

/// Regenerate and publish the switch configuration of a namespace.
pub async fn publish_switch_config(
    store: &dyn ClusterStore,
    namespace: &str,
    settings: &SwitchSecretSettings,
) -> Result<bool, ControllerError> {
    let set = generate_switch_config(store, namespace, &settings.credentials_path).await?;

    let config = BTreeMap::from([(SWITCH_CONFIG_KEY.to_string(), set.render())]);
    let config_written = update_secret_data(store, namespace, &settings.configs_secret, config).await?;
    let keys_written =
        update_secret_data(store, namespace, &settings.credentials_secret, set.key_files).await?;

    Ok(config_written || keys_written)
}

/// Names of the switches in `namespace` whose credentials live in `secret_name`.
pub fn switches_referencing_secret<'a>(
    switches: impl IntoIterator<Item = &'a BareMetalSwitch>,
    namespace: &str,
    secret_name: &str,
) -> Vec<String> {
    switches
        .into_iter()
        .filter(|switch| switch.namespace().as_deref() == Some(namespace))
        .filter(|switch| switch.spec.credentials.secret_name == secret_name)
        .map(|switch| switch.name_any())
        .collect()
}

impl Reconciler {
    /// Reconcile the switch configuration of one namespace.
    pub async fn reconcile_switch_configs(&self, namespace: &str) -> Result<(), ControllerError> {
        debug!("Reconciling switch configuration in namespace {}", namespace);
        if publish_switch_config(self.store.as_ref(), namespace, &self.switch_secrets).await? {
            info!("Published switch configuration for namespace {}", namespace);
        }
        Ok(())
    }
}
