//! HostNetworkAttachment admission webhook.
//!
//! Serves the validating webhook and the liveness/readiness probes over
//! plain HTTP. The API server only calls webhooks over HTTPS, so a TLS
//! sidecar or the service mesh proxy terminates TLS and forwards here.

pub mod guard;
pub mod reference_index;

use crate::error::ControllerError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use crds::HostNetworkAttachment;
use guard::AttachmentGuard;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Path the API server posts HostNetworkAttachment reviews to
pub const VALIDATE_PATH: &str = "/validate-metal3-io-v1alpha1-hostnetworkattachment";

/// Build the webhook router.
pub fn router(guard: Arc<AttachmentGuard>) -> Router {
    Router::new()
        .route(VALIDATE_PATH, post(validate_attachment))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .layer(TraceLayer::new_for_http())
        .with_state(guard)
}

async fn validate_attachment(
    State(guard): State<Arc<AttachmentGuard>>,
    Json(review): Json<AdmissionReview<HostNetworkAttachment>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let req: AdmissionRequest<HostNetworkAttachment> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!("Invalid admission review: {}", e);
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };
    Json(guard.review(&req).into_review())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(guard): State<Arc<AttachmentGuard>>) -> StatusCode {
    if guard.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Serve the webhook on `addr` over plain HTTP until the listener fails.
pub async fn serve(addr: SocketAddr, guard: Arc<AttachmentGuard>) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ControllerError::Webhook(format!("failed to bind {}: {}", addr, e)))?;
    info!("Admission webhook listening on {}", addr);

    axum::serve(listener, router(guard))
        .await
        .map_err(|e| ControllerError::Webhook(format!("server error: {}", e)))
}
