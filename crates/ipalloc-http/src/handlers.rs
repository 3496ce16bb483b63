//! HTTP request handlers for the API.

use crate::AppState;
use crate::validate::{check_device_name, check_ip};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use ipalloc_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";
const UNKNOWN_IP: &str = "<unknown>";

/// JSON returned for any non-2xx response
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorMessage {
    pub error: String,
    pub ip: String,
}

impl ErrorMessage {
    fn new(error: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ip: ip.into(),
        }
    }
}

/// Assignment body accepted by `POST /addresses/assign` and echoed back
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateMessage {
    pub ip: String,
    pub device: String,
}

/// Encode `body` as the response with the given status
fn respond<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], bytes).into_response(),
        Err(e) => {
            tracing::error!("Error writing response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Status code for a store error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::IpInUse { .. } => StatusCode::CONFLICT,
        Error::DeviceNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run a store call, giving up after the configured request timeout
async fn with_timeout<T>(state: &AppState, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(state.request_timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::unavailable(format!(
            "no reply from store within {:?}",
            state.request_timeout
        ))),
    }
}

/// GET /devices/{ip}
pub async fn get_device(State(state): State<Arc<AppState>>, Path(ip): Path<String>) -> Response {
    match with_timeout(&state, state.store.get_device(ip.as_str())).await {
        Ok(device) => respond(StatusCode::OK, &UpdateMessage { ip, device }),
        Err(e) => {
            if !matches!(e, Error::DeviceNotFound(_)) {
                tracing::warn!("Lookup for {} failed: {}", ip, e);
            }
            respond(status_for(&e), &ErrorMessage::new(e.to_string(), ip))
        }
    }
}

/// POST /addresses/assign
pub async fn assign_address(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    // Decoded whatever the Content-Type says
    let message: UpdateMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!("Rejected assign body: {}", e);
            return respond(
                StatusCode::BAD_REQUEST,
                &ErrorMessage::new("Expected post body was missing or malformed", UNKNOWN_IP),
            );
        }
    };

    let ip = match check_ip(&state.address_range, &message.ip) {
        Ok(ip) => ip,
        Err(e) => {
            return respond(StatusCode::BAD_REQUEST, &ErrorMessage::new(e.to_string(), message.ip));
        }
    };

    if let Err(e) = check_device_name(&message.device) {
        return respond(StatusCode::BAD_REQUEST, &ErrorMessage::new(e.to_string(), ip));
    }

    match with_timeout(&state, state.store.update_device(ip.as_str(), message.device.as_str())).await {
        Ok(_) => respond(
            StatusCode::CREATED,
            &UpdateMessage {
                ip,
                device: message.device,
            },
        ),
        Err(e) => {
            if !matches!(e, Error::IpInUse { .. }) {
                tracing::warn!("Assign {} -> {} failed: {}", ip, message.device, e);
            }
            respond(status_for(&e), &ErrorMessage::new(e.to_string(), ip))
        }
    }
}

/// Any method other than the one a route serves
pub async fn method_not_supported(method: Method, uri: Uri) -> Response {
    let ip = uri.path().strip_prefix("/devices/").unwrap_or(UNKNOWN_IP);
    respond(
        StatusCode::BAD_REQUEST,
        &ErrorMessage::new(
            format!("Method={} HTTP Method is not supported", method),
            ip,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::ip_in_use("1.2.3.4", "a")), StatusCode::CONFLICT);
        assert_eq!(status_for(&Error::device_not_found("1.2.3.4")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&Error::unavailable("gone")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&Error::persist("disk")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_message_shape() {
        let body = serde_json::to_value(ErrorMessage::new("boom", "1.2.3.4")).unwrap();
        assert_eq!(body, serde_json::json!({"error": "boom", "ip": "1.2.3.4"}));
    }
}
