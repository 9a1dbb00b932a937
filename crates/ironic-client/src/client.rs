//! Ironic API client
//!
//! Implements the node and port endpoints of the Ironic bare metal API:
//! `/v1/nodes`, `/v1/ports` and `/v1/ports/detail`.

use crate::error::IronicError;
use crate::ironic_trait::IronicClientTrait;
use crate::models::*;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// HTTP basic auth credentials for Ironic deployments using `http_basic`
#[derive(Debug, Clone)]
pub struct BasicAuth {
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

/// Ironic API client
#[derive(Debug, Clone)]
pub struct IronicClient {
    client: Client,
    base_url: String,
    auth: Option<BasicAuth>,
}

impl IronicClient {
    /// Create a new Ironic client
    ///
    /// # Arguments
    /// * `base_url` - Ironic endpoint (e.g., "http://ironic:6385")
    /// * `auth` - Optional HTTP basic auth credentials
    pub fn new(base_url: String, auth: Option<BasicAuth>) -> Result<Self, IronicError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .client
            .request(method, &url)
            .header("Accept", "application/json")
            .header("X-OpenStack-Ironic-API-Version", API_VERSION);
        match &self.auth {
            Some(auth) => builder.basic_auth(&auth.username, Some(&auth.password)),
            None => builder,
        }
    }

    /// Map an error status to `IronicError`, or decode the body on success.
    async fn parse_response<T: DeserializeOwned>(
        response: Response,
        context: &str,
    ) -> Result<T, IronicError> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            return serde_json::from_str(&text).map_err(|e| {
                IronicError::Api(format!(
                    "error decoding response body for {}: {} - Response (first 500 chars): {}",
                    context,
                    e,
                    text.chars().take(500).collect::<String>()
                ))
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => IronicError::NotFound(format!("{}: {}", context, body)),
            StatusCode::CONFLICT => IronicError::Conflict(format!("{}: {}", context, body)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                IronicError::Authentication(format!("{}: {} - {}", context, status, body))
            }
            StatusCode::BAD_REQUEST => {
                IronicError::InvalidRequest(format!("{}: {}", context, body))
            }
            _ => IronicError::Api(format!("Failed to {}: {} - {}", context, status, body)),
        })
    }

    async fn list_ports(&self, query: &str) -> Result<Vec<Port>, IronicError> {
        let path = format!("/v1/ports/detail?{}", query);
        debug!("Listing Ironic ports: {}", path);

        let response = self.request(reqwest::Method::GET, &path).send().await?;
        let collection: PortCollection =
            Self::parse_response(response, &format!("list ports ({})", query)).await?;
        Ok(collection.ports)
    }
}

#[async_trait::async_trait]
impl IronicClientTrait for IronicClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_node(&self, request: &CreateNodeRequest) -> Result<Node, IronicError> {
        debug!("Creating Ironic node {}", request.name);
        let response = self
            .request(reqwest::Method::POST, "/v1/nodes")
            .json(request)
            .send()
            .await?;
        Self::parse_response(response, &format!("create node {}", request.name)).await
    }

    async fn get_node(&self, ident: &str) -> Result<Node, IronicError> {
        debug!("Fetching Ironic node {}", ident);
        let path = format!("/v1/nodes/{}", urlencoding::encode(ident));
        let response = self.request(reqwest::Method::GET, &path).send().await?;
        Self::parse_response(response, &format!("get node {}", ident)).await
    }

    async fn update_node(&self, ident: &str, patch: &[PatchOperation]) -> Result<Node, IronicError> {
        debug!("Patching Ironic node {} ({} operations)", ident, patch.len());
        let path = format!("/v1/nodes/{}", urlencoding::encode(ident));
        let response = self
            .request(reqwest::Method::PATCH, &path)
            .json(patch)
            .send()
            .await?;
        Self::parse_response(response, &format!("update node {}", ident)).await
    }

    async fn list_node_ports(&self, node_uuid: &str) -> Result<Vec<Port>, IronicError> {
        self.list_ports(&format!("node={}", urlencoding::encode(node_uuid)))
            .await
    }

    async fn list_ports_by_address(&self, address: &str) -> Result<Vec<Port>, IronicError> {
        self.list_ports(&format!("address={}", urlencoding::encode(address)))
            .await
    }

    async fn create_port(&self, request: &CreatePortRequest) -> Result<Port, IronicError> {
        debug!(
            "Creating Ironic port {} for node {} (pxe: {})",
            request.address, request.node_uuid, request.pxe_enabled
        );
        let response = self
            .request(reqwest::Method::POST, "/v1/ports")
            .json(request)
            .send()
            .await?;
        Self::parse_response(response, &format!("create port {}", request.address)).await
    }

    async fn update_port(&self, port_uuid: &str, patch: &[PatchOperation]) -> Result<Port, IronicError> {
        debug!("Patching Ironic port {} ({} operations)", port_uuid, patch.len());
        let path = format!("/v1/ports/{}", urlencoding::encode(port_uuid));
        let response = self
            .request(reqwest::Method::PATCH, &path)
            .json(patch)
            .send()
            .await?;
        Self::parse_response(response, &format!("update port {}", port_uuid)).await
    }
}
