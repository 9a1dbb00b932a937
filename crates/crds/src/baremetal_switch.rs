//! BareMetalSwitch CRD
//!
//! A top-of-rack switch managed out-of-band by the Ironic networking agent.
//! The controller renders every switch in a namespace into the agent's
//! INI configuration file, reading login material from the referenced secret.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Driver used when a switch does not name one
pub const DEFAULT_SWITCH_DRIVER: &str = "generic-switch";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "metal3.io",
    version = "v1alpha1",
    kind = "BareMetalSwitch",
    namespaced,
    shortname = "bms",
    printcolumn = r#"{"name":"Driver","type":"string","jsonPath":".spec.driver"}"#,
    printcolumn = r#"{"name":"Device Type","type":"string","jsonPath":".spec.deviceType"}"#,
    printcolumn = r#"{"name":"Address","type":"string","jsonPath":".spec.address"}"#,
    printcolumn = r#"{"name":"Credential Type","type":"string","jsonPath":".spec.credentials.type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalSwitchSpec {
    /// Management address of the switch (IP or hostname)
    pub address: String,

    /// MAC address of the management interface, used to correlate LLDP data
    #[serde(rename = "macAddress")]
    pub mac_address: String,

    /// Switch driver; only "generic-switch" is currently supported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    /// Device type understood by the driver (e.g. "netmiko_cisco_ios")
    pub device_type: String,

    /// Secret holding the switch login material
    pub credentials: SwitchCredentials,

    /// Management port (SSH 22, HTTPS 443, ...); driver default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,

    /// Skip TLS verification when talking HTTPS to the switch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_certificate_verification: Option<bool>,
}

impl BareMetalSwitchSpec {
    /// Driver name, applying the default for an unset or empty value
    pub fn driver_or_default(&self) -> &str {
        match self.driver.as_deref() {
            Some(driver) if !driver.is_empty() => driver,
            _ => DEFAULT_SWITCH_DRIVER,
        }
    }
}

/// Reference to the secret carrying switch credentials
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SwitchCredentials {
    /// Authentication scheme
    #[serde(rename = "type", default)]
    pub credential_type: SwitchCredentialType,

    /// Name of the secret in the switch namespace.
    ///
    /// Requires `username` plus `password` or `ssh-privatekey` depending on
    /// the scheme; `enable-secret` is optional.
    pub secret_name: String,
}

/// Authentication scheme used to log in to a switch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SwitchCredentialType {
    /// Username and password
    #[default]
    Password,
    /// Username and SSH private key
    Publickey,
}
